//! Error taxonomy for the scheduler.
//!
//! Caller-input errors (`InvalidPayload`, `InvalidDuration`, `NotFound`) are
//! surfaced by facade operations for the command layer to render. `Delivery`
//! never crosses the facade: the executor consumes it by terminalizing the
//! event as Failed.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchedulerError>;

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Payload does not decode to the expected export document shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Duration expression could not be parsed (e.g. "10x").
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// No event with this id (never created, cancelled, or unknown).
    #[error("no event with id {0}")]
    NotFound(i64),

    /// The event store is unreachable or rejected the operation.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Outbound HTTP delivery failed (transport error or non-2xx status).
    #[error("delivery failure: {0}")]
    Delivery(String),
}

impl From<rusqlite::Error> for SchedulerError {
    fn from(e: rusqlite::Error) -> Self {
        SchedulerError::Persistence(e.to_string())
    }
}
