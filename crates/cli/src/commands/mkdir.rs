use std::path::Path;

use anyhow::Result;
use clap::Args;

use crate::config::AppConfig;

#[derive(Args)]
pub struct MkdirArgs {
    /// Logical key, e.g. a patient email
    key: String,

    /// Treat the key as a patient email and create a new visit prefix for it
    #[arg(long)]
    visit: bool,
}

pub async fn run(args: MkdirArgs, config_path: Option<&Path>) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let manager = config.open_manager().await?;

    let prefix = if args.visit {
        manager.create_visit_prefix(&args.key).await?
    } else {
        manager.create_prefix(&args.key).await?
    };
    println!("{prefix}");
    Ok(())
}
