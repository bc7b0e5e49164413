//! Process-local timer index — maps event ids to armed, cancellable timers.
//!
//! Purely an advisory cache of "what this process will fire": the event
//! store stays the durable source of truth, so the index can be rebuilt
//! from a fresh query at any time (which is what makes the sweeper safe to
//! run repeatedly and after restarts). Never persisted; lost on restart.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::AbortHandle;

/// Armed-timer index. Requires a tokio runtime context to arm.
pub struct TimerIndex {
    min_delay: Duration,
    armed: Mutex<HashMap<i64, AbortHandle>>,
}

impl TimerIndex {
    /// Create an index with the given delay floor.
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            armed: Mutex::new(HashMap::new()),
        }
    }

    /// Clamp a raw delay to the floor. Past-due events fire after the floor
    /// rather than immediately, so a restart that finds many overdue rows
    /// does not fire them all in the same instant.
    pub fn clamp_delay(&self, delay: Duration) -> Duration {
        delay.max(self.min_delay)
    }

    /// Arm a timer: run `fire` after `delay` (clamped to the floor).
    /// No-op when the id is already armed — the existing timer is kept, so a
    /// duplicate arm can never lose or double a timer. Returns whether a new
    /// timer was installed.
    pub fn arm<F, Fut>(&self, id: i64, delay: Duration, fire: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut armed = match self.armed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if armed.contains_key(&id) {
            tracing::debug!("Event {id} already armed, keeping existing timer");
            return false;
        }
        let delay = self.clamp_delay(delay);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire().await;
        });
        armed.insert(id, handle.abort_handle());
        tracing::debug!("⏲️ Event {id} armed, fires in {}s", delay.as_secs());
        true
    }

    /// Cancel and remove a timer. Safe on absent ids (no-op). Returns
    /// whether a timer was actually disarmed.
    pub fn disarm(&self, id: i64) -> bool {
        let mut armed = match self.armed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match armed.remove(&id) {
            Some(handle) => {
                handle.abort();
                tracing::debug!("Event {id} disarmed");
                true
            }
            None => false,
        }
    }

    /// Whether a timer is armed for this id.
    pub fn contains(&self, id: i64) -> bool {
        match self.armed.lock() {
            Ok(guard) => guard.contains_key(&id),
            Err(poisoned) => poisoned.into_inner().contains_key(&id),
        }
    }

    /// Ids with an armed timer, for diagnostics.
    pub fn armed_ids(&self) -> Vec<i64> {
        match self.armed.lock() {
            Ok(guard) => guard.keys().copied().collect(),
            Err(poisoned) => poisoned.into_inner().keys().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> usize) {
        let fired = Arc::new(AtomicUsize::new(0));
        let reader = {
            let fired = fired.clone();
            move || fired.load(Ordering::SeqCst)
        };
        (fired, reader)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let index = TimerIndex::new(Duration::ZERO);
        let (fired, count) = counter();
        assert!(index.arm(1, Duration::from_secs(30), move || async move {
            fired.fetch_add(1, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(count(), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_double_arm() {
        let index = TimerIndex::new(Duration::ZERO);
        let (fired, count) = counter();
        let fired2 = fired.clone();

        assert!(index.arm(7, Duration::from_secs(10), move || async move {
            fired.fetch_add(1, Ordering::SeqCst);
        }));
        // Second arm for the same id must keep the first timer.
        assert!(!index.arm(7, Duration::from_secs(1), move || async move {
            fired2.fetch_add(10, Ordering::SeqCst);
        }));
        assert!(index.contains(7));
        assert_eq!(index.armed_ids(), vec![7]);

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_prevents_fire() {
        let index = TimerIndex::new(Duration::ZERO);
        let (fired, count) = counter();
        index.arm(3, Duration::from_secs(5), move || async move {
            fired.fetch_add(1, Ordering::SeqCst);
        });

        assert!(index.disarm(3));
        assert!(!index.contains(3));
        // Disarming an absent id is a no-op.
        assert!(!index.disarm(3));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn past_due_delay_clamped_to_floor() {
        let index = TimerIndex::new(Duration::from_secs(10));
        let (fired, count) = counter();
        index.arm(9, Duration::ZERO, move || async move {
            fired.fetch_add(1, Ordering::SeqCst);
        });

        // Never fires before the floor.
        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(count(), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count(), 1);
    }
}
