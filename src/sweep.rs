//! Reconciliation sweeper — the periodic loop that re-arms due-soon events.
//! Covers timers lost to restarts: the first tick runs immediately, so a
//! freshly started process arms everything due within the horizon before
//! settling into the fixed interval.

use std::time::Duration;

use crate::scheduler::Scheduler;

/// Run the sweep loop forever. Spawn this once per process:
///
/// ```no_run
/// # async fn demo() -> sendlater::Result<()> {
/// use sendlater::{Scheduler, SchedulerConfig};
///
/// let scheduler = Scheduler::open("events.db".as_ref(), SchedulerConfig::default())?;
/// tokio::spawn(sendlater::run_sweeper(scheduler.clone()));
/// # Ok(())
/// # }
/// ```
pub async fn run_sweeper(scheduler: Scheduler) {
    // tokio::time::interval panics on zero.
    let interval_secs = scheduler.config().sweep_interval_secs.max(1);
    tracing::info!(
        "⏰ Sweeper started (every {interval_secs}s, horizon {}s)",
        scheduler.config().arm_horizon_secs
    );

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        // First tick completes immediately: the startup sweep.
        interval.tick().await;
        match scheduler.sweep() {
            Ok(0) => {}
            Ok(armed) => tracing::debug!("Sweep pass armed {armed} event(s)"),
            Err(e) => tracing::warn!("⚠️ Sweep pass failed: {e}"),
        }
    }
}
