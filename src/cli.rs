// Command-line interface

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::consensus::ProofOfWork;
use crate::error::Result;
use crate::storage::ChainStore;
use crate::wallet::{self, Wallets};

#[derive(Parser)]
#[command(name = "tinychain")]
#[command(about = "A tiny persistent proof-of-work blockchain", long_about = None)]
pub struct Cli {
    /// Directory holding the chain database and the wallet file
    #[arg(long, default_value = "./tinychain-data")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a blockchain and send the genesis reward to an address
    Init {
        /// Address receiving the genesis coinbase
        address: String,
    },

    /// Get the balance for an address
    Balance { address: String },

    /// Send coins from an owned address to another address
    Send {
        /// Sender address (must be in the wallet file)
        from: String,
        /// Recipient address
        to: String,
        /// Amount to transfer
        amount: u64,
    },

    /// Print the blocks in the chain, re-validating each proof-of-work
    PrintChain,

    /// Create a new wallet address
    CreateWallet,

    /// List the addresses in the wallet file
    ListAddresses,
}

fn chain_path(data_dir: &Path) -> PathBuf {
    data_dir.join("blocks")
}

fn wallet_path(data_dir: &Path) -> PathBuf {
    data_dir.join("wallets.json")
}

/// Dispatches one parsed command. Every command acquires the store for its
/// own scope; the handle is released on all exit paths.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { address } => init(&cli.data_dir, &address),
        Commands::Balance { address } => balance(&cli.data_dir, &address),
        Commands::Send { from, to, amount } => send(&cli.data_dir, &from, &to, amount),
        Commands::PrintChain => print_chain(&cli.data_dir),
        Commands::CreateWallet => create_wallet(&cli.data_dir),
        Commands::ListAddresses => list_addresses(&cli.data_dir),
    }
}

fn init(data_dir: &Path, address: &str) -> Result<()> {
    let reward_to = wallet::pub_key_hash_of(address)?;
    let chain = ChainStore::initialize(chain_path(data_dir), &reward_to)?;
    println!("Blockchain created, genesis: {}", chain.tip());
    Ok(())
}

fn balance(data_dir: &Path, address: &str) -> Result<()> {
    let pub_key_hash = wallet::pub_key_hash_of(address)?;
    let chain = ChainStore::resume(chain_path(data_dir))?;
    let balance = chain.balance_of(&pub_key_hash)?;
    println!("Balance of {}: {}", address, balance);
    Ok(())
}

fn send(data_dir: &Path, from: &str, to: &str, amount: u64) -> Result<()> {
    let to_hash = wallet::pub_key_hash_of(to)?;

    let wallets = Wallets::load_or_create(wallet_path(data_dir))?;
    let sender = wallets.get_wallet(from)?;

    let mut chain = ChainStore::resume(chain_path(data_dir))?;
    let tx = wallet::build_transfer(&chain, &sender, &to_hash, amount)?;
    let block = chain.append(vec![tx])?;

    println!("Success! Sent {} from {} to {}", amount, from, to);
    println!("Mined block {}", block.hash);
    Ok(())
}

fn print_chain(data_dir: &Path) -> Result<()> {
    let chain = ChainStore::resume(chain_path(data_dir))?;

    let mut iter = chain.iter();
    while let Some(block) = iter.next_block()? {
        println!("Previous hash: {}", block.prev_hash);
        println!("Hash:          {}", block.hash);
        println!("Nonce:         {}", block.nonce);
        println!("Difficulty:    {}", block.difficulty);
        println!("PoW valid:     {}", ProofOfWork::new(&block).validate());
        for tx in &block.transactions {
            println!("{}", tx);
        }
        println!();
    }
    Ok(())
}

fn create_wallet(data_dir: &Path) -> Result<()> {
    let mut wallets = Wallets::load_or_create(wallet_path(data_dir))?;
    let address = wallets.create_wallet()?;
    println!("New address: {}", address);
    Ok(())
}

fn list_addresses(data_dir: &Path) -> Result<()> {
    let wallets = Wallets::load_or_create(wallet_path(data_dir))?;
    for address in wallets.addresses() {
        println!("{}", address);
    }
    Ok(())
}
