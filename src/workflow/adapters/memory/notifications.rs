//! Recording notification sink for tests and examples.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::workflow::{
    domain::Notice,
    ports::{NotificationError, NotificationSink},
};

/// Notification sink that records every delivered notice.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotificationSink {
    sent: Arc<RwLock<Vec<Notice>>>,
}

impl RecordingNotificationSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every notice delivered so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Notice> {
        self.sent.read().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Discards all recorded notices.
    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.write() {
            sent.clear();
        }
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn notify(&self, notice: &Notice) -> Result<(), NotificationError> {
        let mut sent = self
            .sent
            .write()
            .map_err(|err| NotificationError::new(std::io::Error::other(err.to_string())))?;
        sent.push(notice.clone());
        Ok(())
    }
}
