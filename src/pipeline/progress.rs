// file: src/pipeline/progress.rs
// description: progress tracking and statistics reporting for batch conversion
// reference: uses indicatif for progress bars and tracks processing metrics

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    pub notebooks_converted: usize,
    pub notebooks_failed: usize,
    pub assets_copied: usize,
    pub duration_secs: u64,
}

impl PipelineStats {
    pub fn notebooks_per_second(&self) -> f64 {
        if self.duration_secs == 0 {
            return 0.0;
        }
        self.notebooks_converted as f64 / self.duration_secs as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.notebooks_converted + self.notebooks_failed;
        if total == 0 {
            return 0.0;
        }
        (self.notebooks_converted as f64 / total as f64) * 100.0
    }
}

pub struct ProgressTracker {
    main_bar: ProgressBar,
    detail_bar: ProgressBar,
    converted: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    assets: Arc<AtomicUsize>,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn with_color(total: usize, colored: bool) -> Self {
        Self::build(MultiProgress::new(), total, colored)
    }

    /// Counts without drawing anything.
    pub fn hidden(total: usize) -> Self {
        Self::build(
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            total,
            false,
        )
    }

    fn build(multi_progress: MultiProgress, total: usize, colored: bool) -> Self {
        let main_bar = create_progress_bar(&multi_progress, total as u64, colored);
        let detail_bar = create_detail_bar(&multi_progress);

        Self {
            main_bar,
            detail_bar,
            converted: Arc::new(AtomicUsize::new(0)),
            failed: Arc::new(AtomicUsize::new(0)),
            assets: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_converted(&self) {
        self.converted.fetch_add(1, Ordering::SeqCst);
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    pub fn add_assets(&self, count: usize) {
        self.assets.fetch_add(count, Ordering::SeqCst);
    }

    pub fn set_message(&self, message: String) {
        self.main_bar.set_message(message);
    }

    pub fn finish(&self) {
        self.main_bar.finish_with_message("Conversion complete");
        self.detail_bar.finish_and_clear();
    }

    pub fn get_stats(&self) -> PipelineStats {
        PipelineStats {
            notebooks_converted: self.converted.load(Ordering::SeqCst),
            notebooks_failed: self.failed.load(Ordering::SeqCst),
            assets_copied: self.assets.load(Ordering::SeqCst),
            duration_secs: self.start_time.elapsed().as_secs(),
        }
    }

    fn update_detail_bar(&self) {
        let message = format!(
            "Converted: {} | Failed: {} | Assets: {}",
            self.converted.load(Ordering::SeqCst),
            self.failed.load(Ordering::SeqCst),
            self.assets.load(Ordering::SeqCst)
        );
        self.detail_bar.set_message(message);
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.finish();
    }
}

fn create_progress_bar(multi_progress: &MultiProgress, total: u64, colored: bool) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(total));
    let style = if colored {
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )
            .map(|style| style.progress_chars("█▓▒░"))
    } else {
        ProgressStyle::default_bar()
            .template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({eta}) {msg}")
            .map(|style| style.progress_chars("=>-"))
    };
    bar.set_style(style.unwrap_or_else(|_| ProgressStyle::default_bar()));
    bar
}

fn create_detail_bar(multi_progress: &MultiProgress) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(0));
    if let Ok(style) = ProgressStyle::default_bar().template("{msg}") {
        bar.set_style(style);
    }
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_stats_calculations() {
        let stats = PipelineStats {
            notebooks_converted: 90,
            notebooks_failed: 10,
            assets_copied: 3,
            duration_secs: 10,
        };

        assert_eq!(stats.notebooks_per_second(), 9.0);
        assert!((stats.success_rate() - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_pipeline_stats_zero_duration() {
        let stats = PipelineStats::default();
        assert_eq!(stats.notebooks_per_second(), 0.0);
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn test_progress_tracker_counts() {
        let tracker = ProgressTracker::hidden(3);

        tracker.inc_converted();
        tracker.add_assets(2);
        tracker.inc_failed();

        let stats = tracker.get_stats();
        assert_eq!(stats.notebooks_converted, 1);
        assert_eq!(stats.notebooks_failed, 1);
        assert_eq!(stats.assets_copied, 2);
    }
}
