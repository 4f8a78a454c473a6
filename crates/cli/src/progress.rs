use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use medisync_storage::DeleteSummary;

/// Spinner shown while a prefix is drained.
pub fn delete_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(format!("Deleting {prefix}..."));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn finish_delete(pb: &ProgressBar, summaries: &[DeleteSummary]) {
    let deleted: usize = summaries.iter().map(|s| s.deleted).sum();
    let pages: usize = summaries.iter().map(|s| s.pages).sum();
    pb.finish_with_message(format!(
        "{deleted} objects deleted across {pages} pages in {} bucket(s)",
        summaries.len()
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_reports_totals_across_buckets() {
        let pb = ProgressBar::hidden();
        let summaries = [
            DeleteSummary {
                bucket: "recordings".into(),
                prefix: "v/".into(),
                deleted: 1200,
                pages: 2,
                failed: Vec::new(),
            },
            DeleteSummary {
                bucket: "reports".into(),
                prefix: "v/".into(),
                deleted: 1,
                pages: 1,
                failed: Vec::new(),
            },
        ];
        finish_delete(&pb, &summaries);
        assert_eq!(pb.message(), "1201 objects deleted across 3 pages in 2 bucket(s)");
        assert!(pb.is_finished());
    }
}
