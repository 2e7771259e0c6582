use std::sync::Arc;
use tokio::sync::mpsc;
use super::events::AppEvent;

/// Receives application events.
///
/// Handlers registered with the monitor run synchronously on the polling task:
/// they must return promptly or polling stalls.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &AppEvent);
}

impl<F> EventHandler for F
where
    F: Fn(&AppEvent) + Send + Sync,
{
    fn handle(&self, event: &AppEvent) {
        self(event)
    }
}

pub type SharedHandler = Arc<dyn EventHandler>;

/// Deliver an event to a handler
pub fn emit_event(handler: &dyn EventHandler, event: AppEvent) {
    tracing::trace!(event = event.name(), "Emitting event");
    handler.handle(&event);
}

/// Handler that discards everything
pub struct NoopHandler;

impl EventHandler for NoopHandler {
    fn handle(&self, _event: &AppEvent) {}
}

/// Forwards events into a bounded channel without blocking.
///
/// When the receiver lags and the channel is full the event is dropped and logged.
pub struct ChannelHandler {
    tx: mpsc::Sender<AppEvent>,
}

impl ChannelHandler {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AppEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl EventHandler for ChannelHandler {
    fn handle(&self, event: &AppEvent) {
        match self.tx.try_send(event.clone()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                tracing::warn!(event = dropped.name(), "Event channel full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Event channel closed");
            }
        }
    }
}
