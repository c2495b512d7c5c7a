//! Monotonic elapsed-time tracking for the current phase.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Tracks how long the current phase has been active.
///
/// Built on the tokio monotonic clock so wall-clock adjustments cannot
/// corrupt minimum-green enforcement, and so tests can drive it
/// deterministically with a paused runtime. `elapsed` may be called from a
/// different task than the one that last called `restart`.
#[derive(Debug)]
pub struct PhaseTimer {
    started_at: Mutex<Instant>,
}

impl PhaseTimer {
    /// Creates a timer whose phase started now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Mutex::new(Instant::now()),
        }
    }

    /// Restarts the timer at the current instant.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn restart(&self) {
        let mut started = self.started_at.lock().expect("phase timer lock poisoned");
        *started = Instant::now();
    }

    /// Elapsed duration since the last restart.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at
            .lock()
            .expect("phase timer lock poisoned")
            .elapsed()
    }

    /// Whole seconds since the last restart.
    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed().as_secs()
    }
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapsed_tracks_paused_clock() {
        let timer = PhaseTimer::new();
        assert_eq!(timer.elapsed_secs(), 0);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(timer.elapsed_secs(), 5);

        tokio::time::advance(Duration::from_millis(999)).await;
        // Whole seconds only
        assert_eq!(timer.elapsed_secs(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_resets_elapsed() {
        let timer = PhaseTimer::new();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(timer.elapsed_secs(), 30);

        timer.restart();
        assert_eq!(timer.elapsed_secs(), 0);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(timer.elapsed_secs(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn readable_from_another_task() {
        let timer = std::sync::Arc::new(PhaseTimer::new());
        tokio::time::advance(Duration::from_secs(7)).await;

        let reader = std::sync::Arc::clone(&timer);
        let elapsed = tokio::spawn(async move { reader.elapsed_secs() })
            .await
            .unwrap();
        assert_eq!(elapsed, 7);
    }
}
