use std::path::Path;

use anyhow::Result;
use clap::Args;
use tracing::info;

use medisync_storage::store::local::LocalStore;
use medisync_storage::{BucketConfig, BucketRole};

use crate::config::{AppConfig, StoreConfig};

#[derive(Args)]
pub struct InitArgs {
    /// Store type: local or s3
    #[arg(long)]
    store: String,

    /// Root directory for the local store
    #[arg(long)]
    path: Option<String>,

    /// S3 region
    #[arg(long, default_value = "us-east-1")]
    region: String,

    /// S3-compatible endpoint URL (omit for AWS)
    #[arg(long)]
    endpoint: Option<String>,

    /// S3 access key (omit to use the environment)
    #[arg(long)]
    access_key: Option<String>,

    /// S3 secret key (omit to use the environment)
    #[arg(long)]
    secret_key: Option<String>,

    /// Bucket for uploaded recordings
    #[arg(long)]
    input_bucket: Option<String>,

    /// Bucket for derived reports
    #[arg(long)]
    output_bucket: Option<String>,

    /// Buckets that receive prefix placeholders (input, output)
    #[arg(long, value_delimiter = ',', default_value = "input")]
    mirror: Vec<String>,
}

pub async fn run(args: InitArgs, config_path: Option<&Path>) -> Result<()> {
    let store = match args.store.as_str() {
        "local" => {
            let path = args
                .path
                .ok_or_else(|| anyhow::anyhow!("--path required for local store"))?;
            LocalStore::init(&path)?;
            StoreConfig::Local { path }
        }
        "s3" => StoreConfig::S3 {
            region: args.region,
            endpoint: args.endpoint,
            access_key: args.access_key,
            secret_key: args.secret_key,
            session_token: None,
        },
        other => anyhow::bail!("unknown store: {other} (supported: local, s3)"),
    };

    let mirror = args
        .mirror
        .iter()
        .map(|role| role.parse::<BucketRole>())
        .collect::<Result<Vec<_>>>()?;
    let buckets = BucketConfig {
        input: args.input_bucket,
        output: args.output_bucket,
        mirror,
    };

    let config = AppConfig { store, buckets };
    let saved = config.save(config_path)?;

    info!(config_path = %saved.display(), "Config saved");
    println!("Config written to {}", saved.display());
    Ok(())
}
