use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use medisync_storage::Payload;

use crate::config::AppConfig;

#[derive(Args)]
pub struct UploadArgs {
    /// Record prefix to upload into
    prefix: String,

    /// Local file to upload
    file: PathBuf,

    /// MIME type (guessed from the extension by default)
    #[arg(long)]
    content_type: Option<String>,

    /// Remove the local file once the upload succeeded
    #[arg(long)]
    remove_source: bool,
}

pub async fn run(args: UploadArgs, config_path: Option<&Path>) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let manager = config.open_manager().await?;

    let payload = Payload::from_path(&args.file, args.content_type.as_deref());
    let key = manager.put_object(&args.prefix, &payload).await?;
    println!("{key}");

    if args.remove_source {
        // A leftover spool file is a leak, not a failed upload.
        match tokio::fs::remove_file(&args.file).await {
            Ok(()) => info!(path = %args.file.display(), "Local file removed"),
            Err(e) => warn!(
                path = %args.file.display(),
                error = %e,
                "failed to remove local file"
            ),
        }
    }
    Ok(())
}
