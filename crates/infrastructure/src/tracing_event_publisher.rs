//! Event publisher writing structured tracing records.
//!
//! Stands in for the message-bus transport: each event is serialized and
//! emitted as a structured log line an external shipper can consume.
//! Delivery semantics beyond the process boundary are out of scope here.

use async_trait::async_trait;

use scolaris_application::EventPublisher;
use scolaris_core::{AppError, AppResult};
use scolaris_domain::PlatformEvent;

/// Publisher emitting platform events as tracing records.
#[derive(Clone, Default)]
pub struct TracingEventPublisher;

impl TracingEventPublisher {
    /// Creates a new publisher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: PlatformEvent) -> AppResult<()> {
        let payload = serde_json::to_string(&event)
            .map_err(|error| AppError::Internal(format!("failed to serialize event: {error}")))?;

        tracing::info!(
            event_type = event.event_type(),
            payload,
            "published platform event"
        );
        Ok(())
    }
}
