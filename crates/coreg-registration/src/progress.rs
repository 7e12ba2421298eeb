//! Progress tracking, callbacks and cancellation for fits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Progress information for one optimizer iteration.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Current step number.
    pub step: usize,
    /// Total number of steps (if known).
    pub total_steps: Option<usize>,
    /// Title of the running fit.
    pub label: String,
    /// Best cost so far.
    pub cost: f64,
    /// Time elapsed since start.
    pub elapsed: Duration,
    /// Estimated remaining time.
    pub estimated_remaining: Option<Duration>,
    /// Additional metrics.
    pub metrics: Vec<(String, f64)>,
}

impl ProgressInfo {
    /// Create new progress information.
    pub fn new(
        step: usize,
        total_steps: Option<usize>,
        label: impl Into<String>,
        cost: f64,
        elapsed: Duration,
    ) -> Self {
        Self {
            step,
            total_steps,
            label: label.into(),
            cost,
            elapsed,
            estimated_remaining: None,
            metrics: Vec::new(),
        }
    }

    /// Calculate progress percentage.
    pub fn progress_percent(&self) -> Option<f64> {
        self.total_steps
            .filter(|&total| total > 0)
            .map(|total| (self.step as f64 / total as f64) * 100.0)
    }

    /// Calculate estimated remaining time.
    pub fn calculate_remaining(&mut self) {
        if let Some(total) = self.total_steps {
            if self.step > 0 {
                let per_step = self.elapsed.as_secs_f64() / self.step as f64;
                let remaining = total.saturating_sub(self.step);
                self.estimated_remaining = Some(Duration::from_secs_f64(per_step * remaining as f64));
            }
        }
    }

    /// Add a custom metric.
    pub fn add_metric(&mut self, name: impl Into<String>, value: f64) {
        self.metrics.push((name.into(), value));
    }
}

/// Progress callback trait for monitoring fits.
pub trait ProgressCallback: Send + Sync {
    /// Called at each iteration with progress information.
    fn on_progress(&self, info: &ProgressInfo);

    /// Called when a fit starts.
    fn on_start(&self, _label: &str) {}

    /// Called when a fit completes.
    fn on_complete(&self, _info: &ProgressInfo) {}

    /// Called when a fit fails.
    fn on_error(&self, _error: &str) {}
}

/// Minimal `(step, total, label)` progress sink.
pub trait ProgressSink: Send + Sync {
    fn report(&self, step: usize, total: usize, label: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize, &str) + Send + Sync,
{
    fn report(&self, step: usize, total: usize, label: &str) {
        self(step, total, label)
    }
}

/// Adapts a [`ProgressSink`] to the callback interface.
pub struct SinkCallback<S: ProgressSink>(pub S);

impl<S: ProgressSink> ProgressCallback for SinkCallback<S> {
    fn on_progress(&self, info: &ProgressInfo) {
        self.0.report(info.step, info.total_steps.unwrap_or(0), &info.label);
    }
}

/// Console progress callback that logs to tracing.
#[derive(Debug, Clone)]
pub struct ConsoleProgressCallback {
    /// Log interval (steps).
    pub log_interval: usize,
}

impl Default for ConsoleProgressCallback {
    fn default() -> Self {
        Self { log_interval: 25 }
    }
}

impl ConsoleProgressCallback {
    /// Create a new console progress callback.
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
        }
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.step % self.log_interval == 0 || info.total_steps == Some(info.step) {
            let remaining = info
                .estimated_remaining
                .map(|d| format!("{:.2}s", d.as_secs_f64()))
                .unwrap_or_else(|| "N/A".to_string());

            tracing::info!(
                "{} | step {}/{} ({:.1}%) | cost: {:.6} | elapsed: {:.2}s | ETA: {}",
                info.label,
                info.step,
                info.total_steps.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string()),
                info.progress_percent().unwrap_or(0.0),
                info.cost,
                info.elapsed.as_secs_f64(),
                remaining
            );

            for (name, value) in &info.metrics {
                tracing::info!("  {}: {:.6}", name, value);
            }
        }
    }

    fn on_start(&self, label: &str) {
        tracing::info!("{} started", label);
    }

    fn on_complete(&self, info: &ProgressInfo) {
        tracing::info!(
            "{} completed in {:.2}s with final cost: {:.6}",
            info.label,
            info.elapsed.as_secs_f64(),
            info.cost
        );
    }

    fn on_error(&self, error: &str) {
        tracing::error!("Fit failed: {}", error);
    }
}

/// History callback that records all progress information.
#[derive(Debug, Clone, Default)]
pub struct HistoryCallback {
    history: Arc<Mutex<Vec<ProgressInfo>>>,
}

impl HistoryCallback {
    /// Create a new history callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the recorded history.
    pub fn get_history(&self) -> Vec<ProgressInfo> {
        self.history.lock().unwrap().clone()
    }

    /// Clear the history.
    pub fn clear(&self) {
        self.history.lock().unwrap().clear();
    }
}

impl ProgressCallback for HistoryCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        self.history.lock().unwrap().push(info.clone());
    }
}

/// Shared flag to stop a running optimization from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The optimizer stops after the current iteration.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation request.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Progress tracker that manages multiple callbacks.
///
/// A tracker without callbacks is a no-op.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    callbacks: Vec<Arc<dyn ProgressCallback>>,
    start_time: Arc<Mutex<Option<Instant>>>,
    label: Arc<Mutex<String>>,
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a callback.
    pub fn add_callback(&mut self, callback: Arc<dyn ProgressCallback>) {
        self.callbacks.push(callback);
    }

    /// Builder form of [`ProgressTracker::add_callback`].
    pub fn with_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.add_callback(callback);
        self
    }

    /// Forward progress to a plain sink.
    pub fn with_sink<S: ProgressSink + 'static>(self, sink: S) -> Self {
        self.with_callback(Arc::new(SinkCallback(sink)))
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    fn elapsed(&self) -> Duration {
        self.start_time
            .lock()
            .unwrap()
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Start tracking.
    pub fn start(&self, label: &str) {
        *self.start_time.lock().unwrap() = Some(Instant::now());
        *self.label.lock().unwrap() = label.to_string();
        for callback in &self.callbacks {
            callback.on_start(label);
        }
    }

    /// Update progress.
    pub fn update(&self, step: usize, total_steps: Option<usize>, cost: f64) {
        if self.callbacks.is_empty() {
            return;
        }
        let label = self.label.lock().unwrap().clone();
        let mut info = ProgressInfo::new(step, total_steps, label, cost, self.elapsed());
        info.calculate_remaining();
        for callback in &self.callbacks {
            callback.on_progress(&info);
        }
    }

    /// Complete tracking.
    pub fn complete(&self, step: usize, final_cost: f64) {
        let label = self.label.lock().unwrap().clone();
        let info = ProgressInfo::new(step, Some(step), label, final_cost, self.elapsed());
        for callback in &self.callbacks {
            callback.on_complete(&info);
        }
    }

    /// Report error.
    pub fn error(&self, error: &str) {
        for callback in &self.callbacks {
            callback.on_error(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_progress_info() {
        let info = ProgressInfo::new(10, Some(100), "fit", 0.5, Duration::from_secs(10));
        assert_eq!(info.step, 10);
        assert_eq!(info.cost, 0.5);
        assert_eq!(info.progress_percent(), Some(10.0));
    }

    #[test]
    fn test_progress_info_remaining() {
        let mut info = ProgressInfo::new(10, Some(100), "fit", 0.5, Duration::from_secs(10));
        info.calculate_remaining();
        assert!(info.estimated_remaining.is_some());
    }

    #[test]
    fn test_history_callback() {
        let callback = HistoryCallback::new();
        callback.on_progress(&ProgressInfo::new(1, Some(10), "fit", 0.5, Duration::ZERO));
        callback.on_progress(&ProgressInfo::new(2, Some(10), "fit", 0.4, Duration::ZERO));

        let history = callback.get_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].step, 1);
        assert_eq!(history[1].step, 2);
    }

    #[test]
    fn test_tracker_forwards_to_sink() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let tracker = ProgressTracker::new().with_sink(move |step: usize, total: usize, label: &str| {
            assert_eq!(total, 10);
            assert_eq!(label, "sagittal");
            assert!(step <= 10);
            seen.fetch_add(1, Ordering::SeqCst);
        });
        tracker.start("sagittal");
        tracker.update(1, Some(10), 0.5);
        tracker.update(2, Some(10), 0.4);
        tracker.complete(2, 0.3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_empty_tracker_is_noop() {
        let tracker = ProgressTracker::new();
        assert!(tracker.is_empty());
        tracker.start("x");
        tracker.update(1, None, 0.0);
        tracker.complete(1, 0.0);
        tracker.error("nothing listens");
    }

    #[test]
    fn test_cancellation_token_shared() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!token.is_cancelled());
        other.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!other.is_cancelled());
    }
}
