mod commands;
mod config;
mod progress;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "medisync",
    version,
    about = "Manage MediSync recording and report storage"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Config file (default: <config dir>/medisync/medisync.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        commands::Command::Init(args) => commands::init::run(args, config).await,
        commands::Command::Mkdir(args) => commands::mkdir::run(args, config).await,
        commands::Command::Upload(args) => commands::upload::run(args, config).await,
        commands::Command::Ls(args) => commands::ls::run(args, config).await,
        commands::Command::Rm(args) => commands::rm::run(args, config).await,
        commands::Command::Report(args) => commands::report::run(args, config).await,
    }
}
