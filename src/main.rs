use berth::adapter::inbound::cli::command::Cli;
use berth::adapter::inbound::cli::{handler, output};
use clap::Parser;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = handler::run(cli).await {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
