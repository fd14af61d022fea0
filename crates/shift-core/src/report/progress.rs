//! Progress bar for record iteration
//!
//! A bar is rendered only when progress is enabled (globally or per shift)
//! and the collection is big enough to be worth watching.

use indicatif::{ProgressBar, ProgressStyle};

/// Collections smaller than this never get a progress bar.
pub const MIN_PROGRESS_SIZE: u64 = 5;

/// Create a progress bar for a run, or `None` when disabled or the
/// collection is below the threshold.
pub fn maybe_progress_bar(enabled: bool, size: u64) -> Option<ProgressBar> {
    if !enabled || size < MIN_PROGRESS_SIZE {
        return None;
    }
    Some(create_record_progress(size))
}

/// Create a progress bar sized for record processing
#[allow(clippy::expect_used)]
fn create_record_progress(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
            .expect("Invalid progress bar template")
            .progress_chars("#>-"),
    );
    pb
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_below_threshold_gets_no_bar() {
        assert!(maybe_progress_bar(true, 4).is_none());
        assert!(maybe_progress_bar(true, 0).is_none());
    }

    #[test]
    fn test_disabled_gets_no_bar() {
        assert!(maybe_progress_bar(false, 100).is_none());
    }

    #[test]
    fn test_enabled_at_threshold_gets_bar() {
        let pb = maybe_progress_bar(true, MIN_PROGRESS_SIZE).unwrap();
        assert_eq!(pb.length(), Some(MIN_PROGRESS_SIZE));
    }
}
