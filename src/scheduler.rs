//! Scheduler facade — the public operation set (schedule, cancel, list)
//! plus the reconciliation sweep that keeps the timer index consistent
//! with the store.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::config::{RetryPolicy, SchedulerConfig};
use crate::deliver::Deliverer;
use crate::duration;
use crate::error::{Result, SchedulerError};
use crate::event::{self, DeliveryOutcome, Event};
use crate::store::EventStore;
use crate::timers::TimerIndex;

/// The scheduler. Cheap to clone; all clones share the same store and
/// timer index.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    config: SchedulerConfig,
    store: EventStore,
    timers: TimerIndex,
    deliverer: Deliverer,
}

impl Scheduler {
    /// Build a scheduler around an already-open store.
    pub fn new(store: EventStore, config: SchedulerConfig) -> Self {
        let timers = TimerIndex::new(Duration::from_secs(config.min_delay_secs));
        let deliverer = Deliverer::new(Duration::from_secs(config.delivery_timeout_secs));
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                timers,
                deliverer,
            }),
        }
    }

    /// Convenience: open the store at `path` and build a scheduler on it.
    pub fn open(path: &Path, config: SchedulerConfig) -> Result<Self> {
        Ok(Self::new(EventStore::open(path)?, config))
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Schedule a delivery: parse the relative duration, validate the
    /// payload, persist the event, and arm a timer right away when the fire
    /// time falls inside the near-term horizon (soon-due events must not
    /// wait for the next sweep). Returns the new event id.
    ///
    /// A failed create never arms a timer — there is no partial state.
    pub fn schedule(&self, duration_expr: &str, payload: &[u8]) -> Result<i64> {
        let delay = duration::parse(duration_expr)?;
        let validated = event::validate_payload(payload)?;
        let fire_at = Utc::now()
            + chrono::Duration::from_std(delay)
                .map_err(|e| SchedulerError::InvalidDuration(format!("'{duration_expr}': {e}")))?;

        let body = serde_json::to_string(&validated.body)
            .map_err(|e| SchedulerError::InvalidPayload(e.to_string()))?;
        let created = self
            .inner
            .store
            .create(&body, &validated.destination, fire_at)?;
        let id = created.id;
        tracing::info!(
            "📅 Event {} scheduled for {} → {}",
            id,
            created.fire_at.to_rfc3339(),
            created.destination
        );

        if delay <= Duration::from_secs(self.inner.config.arm_horizon_secs) {
            self.arm_event(created);
        }
        Ok(id)
    }

    /// Cancel a pending event: disarm its timer (if this process armed one)
    /// and delete the row. Reports `NotFound` for unknown ids — success is
    /// only confirmed after the row is verifiably gone. If the delete itself
    /// fails the row survives, and the next sweep re-arms it.
    pub fn cancel(&self, id: i64) -> Result<()> {
        self.inner.timers.disarm(id);
        self.inner.store.delete(id)?;
        tracing::info!("🗑️ Event {id} cancelled");
        Ok(())
    }

    /// Pending events, soonest first.
    pub fn list_pending(&self) -> Result<Vec<Event>> {
        self.inner.store.find_pending()
    }

    /// Every event including terminal ones, for audit.
    pub fn list_all(&self) -> Result<Vec<Event>> {
        self.inner.store.find_all()
    }

    /// Ids armed in this process, for diagnostics. Restarts empty this; use
    /// `list_pending` for the durable view.
    pub fn armed_ids(&self) -> Vec<i64> {
        self.inner.timers.armed_ids()
    }

    /// One reconciliation pass: query the store for events due within the
    /// horizon and arm every id not already armed. Safe to run concurrently
    /// with direct scheduling (arm is presence-checked) and safe to repeat —
    /// the index is rebuilt from the store, never the other way around.
    /// Returns how many timers were newly armed.
    pub fn sweep(&self) -> Result<usize> {
        let horizon = Duration::from_secs(self.inner.config.arm_horizon_secs);
        let due = self.inner.store.find_due_within(Utc::now(), horizon)?;

        let mut armed = 0;
        for event in due {
            if self.inner.timers.contains(event.id) {
                continue;
            }
            if self.arm_event(event) {
                armed += 1;
            }
        }
        if armed > 0 {
            tracing::info!("🔭 Sweep armed {armed} event(s)");
        }
        Ok(armed)
    }

    /// Install a timer for this event. Past-due fire times arm with a zero
    /// delay, which the index clamps up to the configured floor.
    fn arm_event(&self, event: Event) -> bool {
        let delay = (event.fire_at - Utc::now()).to_std().unwrap_or_default();
        let this = self.clone();
        self.inner
            .timers
            .arm(event.id, delay, move || async move { this.fire(event).await })
    }

    /// Runs when an armed timer elapses: attempt delivery, then terminalize
    /// the event on every exit path, then drop the index entry (the timer
    /// already fired, so this is cache cleanup, not cancellation).
    async fn fire(&self, event: Event) {
        tracing::info!("🔔 Event {} fired", event.id);
        let outcome = self.inner.deliverer.deliver(&event).await;

        if outcome == DeliveryOutcome::Failed {
            match self.inner.config.retry {
                // Failures terminalize; retry is a future extension point.
                RetryPolicy::None => {}
            }
        }

        // A cancel may have raced the timer and deleted the row; NotFound
        // here is expected, anything else is worth a warning.
        match self.inner.store.mark_terminal(event.id, outcome) {
            Ok(()) => {}
            Err(SchedulerError::NotFound(_)) => {
                tracing::debug!("Event {} was cancelled while firing", event.id);
            }
            Err(e) => {
                tracing::warn!("⚠️ Failed to record outcome for event {}: {e}", event.id);
            }
        }

        self.inner.timers.disarm(event.id);
    }
}
