//! Receivers for per-object export notifications.

use crate::models::ExportNotification;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, trace};

/// Observer called synchronously once for every exported object, before the
/// next object is processed.
pub trait ExportSink: Send + Sync {
    /// Called after an object's script is written and, for logins, redacted.
    fn notify(&self, notification: &ExportNotification);
}

impl<F> ExportSink for F
where
    F: Fn(&ExportNotification) + Send + Sync,
{
    fn notify(&self, notification: &ExportNotification) {
        self(notification)
    }
}

/// Forwards clones to a channel. A dropped receiver is ignored.
impl ExportSink for UnboundedSender<ExportNotification> {
    fn notify(&self, notification: &ExportNotification) {
        if self.send(notification.clone()).is_err() {
            trace!("Notification receiver dropped");
        }
    }
}

/// Emits each notification as an INFO event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ExportSink for TracingSink {
    fn notify(&self, notification: &ExportNotification) {
        info!(
            server = %notification.server,
            database = notification.database.as_deref().unwrap_or("-"),
            object = %format_args!("{}.{}", notification.object_type, notification.object_name),
            path = %notification.path.display(),
            "Exported"
        );
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    notifications: Mutex<Vec<ExportNotification>>,
}

impl CollectingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the notifications received so far.
    pub fn notifications(&self) -> Vec<ExportNotification> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ExportSink for CollectingSink {
    fn notify(&self, notification: &ExportNotification) {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
    }
}
