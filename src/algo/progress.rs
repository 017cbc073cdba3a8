//! Progress reporting for long-running algorithms.
//!
//! A [`Progress`] wraps a callback that algorithms invoke with their
//! current step, total steps, and a description. The default reporter
//! discards all updates, so progress support costs nothing when unused.

/// A progress callback that receives updates during long-running operations.
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    ///
    /// The callback receives the current step (0-based), the total number of
    /// steps, and a description of the current stage.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_progress_reports() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let progress = Progress::new(move |current, total, _| {
            assert!(current <= total);
            seen.fetch_add(1, Ordering::Relaxed);
        });
        progress.report(0, 3, "start");
        progress.report(3, 3, "done");
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }
}
