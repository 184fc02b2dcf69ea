use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Companion thread that samples the dispatch (and, for the early-stop
/// form, success) counters every 100 ms and renders a two-line progress
/// display. Disabled entirely outside
/// [`crate::Verbosity::Progress`].
pub(super) struct ProgressReporter {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    pub(super) fn start(
        message: &str,
        progress_counter: &Arc<AtomicUsize>,
        range: usize,
        success: Option<(&Arc<AtomicUsize>, usize)>,
    ) -> Self {
        if crate::verbosity() != crate::Verbosity::Progress {
            return Self {
                stop: Arc::new(AtomicBool::new(true)),
                handle: None,
            };
        }

        let stop = Arc::new(AtomicBool::new(false));
        let progress = Arc::clone(progress_counter);
        let success = success.map(|(c, lim)| (Arc::clone(c), lim));
        let message = message.to_string();
        let stop_clone = Arc::clone(&stop);

        let handle = std::thread::Builder::new()
            .name("nibrary-progress".to_string())
            .spawn(move || {
                while !stop_clone.load(Ordering::Relaxed) {
                    let done = progress.load(Ordering::Relaxed).min(range);
                    let total_pct = if range > 0 { 100.0 * done as f64 / range as f64 } else { 100.0 };
                    if let Some((success, lim)) = &success {
                        let s = success.load(Ordering::Relaxed).min(*lim);
                        let success_pct = if *lim > 0 { 100.0 * s as f64 / *lim as f64 } else { 100.0 };
                        eprintln!("{message}: success {success_pct:5.1}%");
                        eprintln!("{message}: total   {total_pct:5.1}%");
                    } else {
                        eprintln!("{message}: {total_pct:5.1}%");
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
            })
            .expect("failed to spawn progress reporter thread");

        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub(super) fn finish(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
