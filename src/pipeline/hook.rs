use indicatif::ProgressBar;

/// Receives progress from an [`upload_video`](super::upload::upload_video) call.
///
/// Implement this trait to surface upload progress somewhere other than a
/// terminal progress bar, e.g. a log line per step.
///
/// # Example
///
/// ```rust
/// use ytup::ProgressHook;
///
/// struct LogHook;
///
/// impl ProgressHook for LogHook {
///     fn on_progress(&self, fraction: f64) {
///         println!("Uploaded {}%", (fraction * 100.0) as u32);
///     }
/// }
/// ```
pub trait ProgressHook {
    /// Called after every chunk the server acknowledges with a partial result.
    /// `fraction` is in `0.0..=1.0`.
    fn on_progress(&self, fraction: f64);

    /// Called once with the ID of the created video.
    fn on_complete(&self, _video_id: &str) {}
}

/// A hook that ignores all progress.
pub struct NoopProgress;

impl ProgressHook for NoopProgress {
    fn on_progress(&self, _fraction: f64) {}
}

/// Drives a bar whose length is 100 (percent).
impl ProgressHook for ProgressBar {
    fn on_progress(&self, fraction: f64) {
        self.set_position(percent(fraction));
    }

    fn on_complete(&self, _video_id: &str) {
        self.set_position(100);
        self.finish_with_message("upload complete");
    }
}

/// Whole percentage for a completion fraction, truncated like the console report.
pub fn percent(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * 100.0) as u64
}
