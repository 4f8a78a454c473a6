use std::path::Path;

use anyhow::Result;
use clap::Args;

use medisync_storage::{BucketRole, DeleteSummary};

use crate::config::AppConfig;
use crate::progress;

#[derive(Args)]
pub struct RmArgs {
    /// Prefix whose objects are deleted
    prefix: String,

    /// Bucket to clear: input, output or all
    #[arg(long, default_value = "input")]
    bucket: String,
}

pub async fn run(args: RmArgs, config_path: Option<&Path>) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let manager = config.open_manager().await?;

    let spinner = progress::delete_spinner(&args.prefix);
    let summaries = if args.bucket.eq_ignore_ascii_case("all") {
        manager.delete_record(&args.prefix).await
    } else {
        let role: BucketRole = args.bucket.parse()?;
        let bucket = manager.bucket(role)?;
        manager
            .delete_under_prefix(bucket, &args.prefix)
            .await
            .map(|summary| vec![summary])
    };
    let summaries = match summaries {
        Ok(summaries) => {
            progress::finish_delete(&spinner, &summaries);
            summaries
        }
        Err(e) => {
            spinner.finish_with_message("failed");
            return Err(e.into());
        }
    };

    print_summaries(&summaries);
    let failed: usize = summaries.iter().map(|s| s.failed.len()).sum();
    if failed > 0 {
        anyhow::bail!("{failed} objects could not be deleted");
    }
    Ok(())
}

fn print_summaries(summaries: &[DeleteSummary]) {
    println!(
        "{:<24} {:<40} {:<8} {:<6} {:<6}",
        "BUCKET", "PREFIX", "DELETED", "PAGES", "FAILED"
    );
    println!("{}", "-".repeat(88));
    for summary in summaries {
        println!(
            "{:<24} {:<40} {:<8} {:<6} {:<6}",
            summary.bucket,
            summary.prefix,
            summary.deleted,
            summary.pages,
            summary.failed.len(),
        );
        for failure in &summary.failed {
            println!("  - {}: {}", failure.key, failure.reason);
        }
    }
}
