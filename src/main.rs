use clap::Parser;

use oddsync::adapter::inbound::cli::command::{Cli, Commands};
use oddsync::adapter::inbound::cli::output::{self, OutputConfig};
use oddsync::adapter::inbound::cli::{check, sports, watch};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    // Both ring and aws-lc may be linked; pick one before any TLS handshake.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    output::configure(OutputConfig::new(cli.json, cli.quiet, cli.verbose));

    let result = match &cli.command {
        Commands::Watch(args) => watch::execute(args).await,
        Commands::Sports(arg) => sports::execute(&arg.config).await,
        Commands::CheckConfig(arg) => check::execute(&arg.config),
    };

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
