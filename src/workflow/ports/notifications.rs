//! Notification dispatch port.

use crate::workflow::domain::Notice;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Fire-and-forget notification fan-out.
///
/// Dispatch happens strictly after the state change committed; a failing
/// sink is logged and swallowed by the caller and must never roll back or
/// block the mutation that triggered it. Delivery is at-least-once at
/// best; recipients that need the truth read the task, not the inbox.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers one notice to its recipients.
    ///
    /// The caller has already dropped the sender from the recipient set
    /// and skips notices with no recipients left.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError`] when delivery fails; the caller logs
    /// and discards it.
    async fn notify(&self, notice: &Notice) -> Result<(), NotificationError>;
}

/// Opaque delivery failure reported by a notification sink.
#[derive(Debug, Clone, Error)]
#[error("notification dispatch failed: {0}")]
pub struct NotificationError(Arc<dyn std::error::Error + Send + Sync>);

impl NotificationError {
    /// Wraps a sink-specific delivery error.
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(err))
    }
}
