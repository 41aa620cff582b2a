//! Component contracts of the event protocol.
//!
//! Every component is wired to the coordinator through these traits only:
//! listeners accept events, emitters hand produced events to an
//! [`EventSink`]. Components never reference each other directly.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::errors::LoadError;
use crate::events::AppEvent;

/// Consumer side of the protocol.
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Accept `event` and return only once all work it triggers is done.
    async fn on_event(&self, event: &AppEvent);
}

/// Producer side of the protocol.
pub trait EventEmitter: Send + Sync {
    /// Register the sink that receives produced events. Last registration wins.
    fn set_emit_event(&self, sink: EventSink);
}

/// Handle that enqueues events into the coordinator's serial inbox.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue an event. Returns false if the receiving side is gone.
    pub fn emit(&self, event: AppEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Storage for an emitter's registered sink.
#[derive(Debug, Default)]
pub struct EmitterSlot {
    sink: Mutex<Option<EventSink>>,
}

impl EmitterSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, sink: EventSink) {
        *self.sink.lock() = Some(sink);
    }

    pub fn is_wired(&self) -> bool {
        self.sink.lock().is_some()
    }

    /// Emit through the registered sink. Returns false when unwired or closed.
    pub fn emit(&self, event: AppEvent) -> bool {
        match self.sink.lock().as_ref() {
            Some(sink) => sink.emit(event),
            None => false,
        }
    }
}

/// Receives status reports for the operation in flight. Not acknowledged.
pub trait ProgressListener: Send + Sync {
    fn on_progress_update(&self, message: &str, progress_percentage: Option<f64>);
    fn on_operation_finished(&self);
}

/// Host notification channel for user-visible load conditions.
pub trait UserNotificationListener: Send + Sync {
    fn on_errors(&self, errors: &[LoadError]);
}
