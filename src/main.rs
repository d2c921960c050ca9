use clap::Parser;
use tinychain::cli::{self, Cli};

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = cli::run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
