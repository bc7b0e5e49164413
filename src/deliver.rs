//! Delivery executor — performs the outbound HTTP POST when a timer fires.
//! One attempt per event, success or failure; the verdict is recorded by the
//! caller via `EventStore::mark_terminal`.

use std::time::Duration;

use crate::event::{DeliveryOutcome, Event};

/// Posts stored payloads to their destinations.
pub struct Deliverer {
    http: reqwest::Client,
    timeout: Duration,
}

impl Deliverer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout,
        }
    }

    /// POST the event's payload as a JSON body to its destination.
    /// Any non-2xx status, transport error, or undecodable stored payload is
    /// a `Failed` outcome. Never retries and never panics — the caller is
    /// long gone, so failure is only visible through the event's status.
    pub async fn deliver(&self, event: &Event) -> DeliveryOutcome {
        let body: serde_json::Value = match serde_json::from_str(&event.payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("⚠️ Event {}: stored payload is not valid JSON: {e}", event.id);
                return DeliveryOutcome::Failed;
            }
        };

        let result = self
            .http
            .post(&event.destination)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!("✅ Delivered event {} to {}", event.id, event.destination);
                DeliveryOutcome::Delivered
            }
            Ok(resp) => {
                tracing::warn!(
                    "⚠️ Event {} delivery to {} returned {}",
                    event.id,
                    event.destination,
                    resp.status()
                );
                DeliveryOutcome::Failed
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ Event {} delivery to {} failed: {e}",
                    event.id,
                    event.destination
                );
                DeliveryOutcome::Failed
            }
        }
    }
}
