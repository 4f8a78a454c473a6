use std::path::Path;

use anyhow::Result;
use clap::Args;
use futures::TryStreamExt;

use medisync_storage::BucketRole;

use crate::config::AppConfig;

#[derive(Args)]
pub struct LsArgs {
    /// Prefix to list (empty lists the whole bucket)
    #[arg(default_value = "")]
    prefix: String,

    /// Bucket to list: input or output
    #[arg(long, default_value = "input")]
    bucket: String,
}

pub async fn run(args: LsArgs, config_path: Option<&Path>) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let manager = config.open_manager().await?;
    let role: BucketRole = args.bucket.parse()?;
    let bucket = manager.bucket(role)?;

    let mut keys = manager.list_under_prefix(bucket, &args.prefix);
    let mut count = 0u64;
    while let Some(key) = keys.try_next().await? {
        println!("{key}");
        count += 1;
    }
    if count == 0 {
        println!("No objects found.");
    }
    Ok(())
}
