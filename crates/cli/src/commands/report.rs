use std::path::Path;

use anyhow::Result;
use clap::Args;

use medisync_storage::BucketRole;
use medisync_storage::key::normalize_prefix;

use crate::config::AppConfig;

#[derive(Args)]
pub struct ReportArgs {
    /// Visit prefix whose report is printed
    visit: String,

    /// Read another JSON file of the visit instead of summary.json
    #[arg(long)]
    file: Option<String>,
}

pub async fn run(args: ReportArgs, config_path: Option<&Path>) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let manager = config.open_manager().await?;

    let report = match args.file {
        Some(file) => {
            let bucket = manager.bucket(BucketRole::Output)?;
            let key = format!("{}{file}", normalize_prefix(&args.visit)?);
            manager.get_json_object(bucket, &key).await?
        }
        None => manager.get_report(&args.visit).await?,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
