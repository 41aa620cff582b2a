use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tracelens_core::events::{
    RemoteToolBugreportReceived, RemoteToolTimestampReceived, TracePositionUpdate,
};
use tracelens_core::{
    AppEvent, EmitterSlot, EventEmitter, EventListener, EventSink, Timestamp, TimestampType,
    TraceFile,
};

use crate::errors::BridgeError;

/// Wire message exchanged with the companion tool, one JSON object per line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrossToolMessage {
    Ping,
    Pong,
    Timestamp {
        timestamp_ns: i64,
    },
    Bugreport {
        file_name: String,
        /// Base64-encoded file content.
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp_ns: Option<i64>,
    },
}

/// Bridge to a companion tool. Inbound timestamps and bugreports become app
/// events; outbound, every real-clock position update is reported back.
pub struct CrossToolProtocol {
    emitter: EmitterSlot,
    outbound: mpsc::UnboundedSender<String>,
}

impl CrossToolProtocol {
    pub fn new(outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            emitter: EmitterSlot::new(),
            outbound,
        }
    }

    /// Spawn a task feeding inbound lines into [`Self::handle_message`]
    /// until the channel closes or `shutdown` fires.
    pub fn start(
        self: &Arc<Self>,
        mut inbound: mpsc::UnboundedReceiver<String>,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let protocol = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    line = inbound.recv() => match line {
                        Some(line) => {
                            if let Err(err) = protocol.handle_message(&line) {
                                warn!(error = %err, kind = err.error_kind(), "dropping cross-tool message");
                            }
                        }
                        None => {
                            info!("cross-tool channel closed");
                            break;
                        }
                    },
                }
            }
        })
    }

    /// Decode one inbound line and act on it.
    pub fn handle_message(&self, raw: &str) -> Result<(), BridgeError> {
        let message: CrossToolMessage = serde_json::from_str(raw)?;
        debug!(?message, "cross-tool message received");
        match message {
            CrossToolMessage::Ping => self.send(&CrossToolMessage::Pong)?,
            CrossToolMessage::Pong => {}
            CrossToolMessage::Timestamp { timestamp_ns } => {
                self.emitter.emit(
                    RemoteToolTimestampReceived {
                        timestamp: Timestamp::real(timestamp_ns),
                    }
                    .into(),
                );
            }
            CrossToolMessage::Bugreport {
                file_name,
                content,
                timestamp_ns,
            } => {
                let content = STANDARD.decode(content)?;
                self.emitter.emit(
                    RemoteToolBugreportReceived {
                        bugreport: TraceFile::new(file_name, content),
                        timestamp: timestamp_ns.map(Timestamp::real),
                    }
                    .into(),
                );
            }
        }
        Ok(())
    }

    fn send(&self, message: &CrossToolMessage) -> Result<(), BridgeError> {
        let line = serde_json::to_string(message)?;
        self.outbound
            .send(line)
            .map_err(|_| BridgeError::ChannelClosed)
    }

    fn on_position_update(&self, update: &TracePositionUpdate) {
        let timestamp = update.position.timestamp();
        if timestamp.timestamp_type() != TimestampType::Real {
            debug!(%timestamp, "not forwarding non-real timestamp");
            return;
        }
        let message = CrossToolMessage::Timestamp {
            timestamp_ns: timestamp.value_ns(),
        };
        if let Err(err) = self.send(&message) {
            warn!(error = %err, "failed to forward position to companion tool");
        }
    }
}

#[async_trait]
impl EventListener for CrossToolProtocol {
    async fn on_event(&self, event: &AppEvent) {
        event
            .visit::<TracePositionUpdate, _, _>(move |update| async move {
                self.on_position_update(update);
            })
            .await;
    }
}

impl EventEmitter for CrossToolProtocol {
    fn set_emit_event(&self, sink: EventSink) {
        self.emitter.set(sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tracelens_core::TracePosition;

    fn wired() -> (
        Arc<CrossToolProtocol>,
        mpsc::UnboundedReceiver<String>,
        mpsc::UnboundedReceiver<AppEvent>,
    ) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let protocol = Arc::new(CrossToolProtocol::new(out_tx));
        let (sink, events) = EventSink::channel();
        protocol.set_emit_event(sink);
        (protocol, out_rx, events)
    }

    #[test]
    fn wire_format_is_tagged() {
        let json = serde_json::to_string(&CrossToolMessage::Timestamp { timestamp_ns: 7 }).unwrap();
        assert_eq!(json, r#"{"type":"timestamp","timestamp_ns":7}"#);
        let parsed: CrossToolMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(parsed, CrossToolMessage::Ping);
    }

    #[test]
    fn ping_is_answered() {
        let (protocol, mut out, _events) = wired();
        protocol.handle_message(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(out.try_recv().unwrap(), r#"{"type":"pong"}"#);
    }

    #[test]
    fn timestamp_becomes_event() {
        let (protocol, _out, mut events) = wired();
        protocol
            .handle_message(r#"{"type":"timestamp","timestamp_ns":1700000000000000000}"#)
            .unwrap();
        match events.try_recv().unwrap() {
            AppEvent::RemoteToolTimestampReceived(received) => {
                assert_eq!(received.timestamp, Timestamp::real(1_700_000_000_000_000_000));
            }
            other => panic!("unexpected event: {:?}", other.kind()),
        }
    }

    #[test]
    fn bugreport_becomes_event() {
        let (protocol, _out, mut events) = wired();
        let message = CrossToolMessage::Bugreport {
            file_name: "bugreport.tlbundle".into(),
            content: STANDARD.encode(b"payload"),
            timestamp_ns: Some(42),
        };
        protocol
            .handle_message(&serde_json::to_string(&message).unwrap())
            .unwrap();
        match events.try_recv().unwrap() {
            AppEvent::RemoteToolBugreportReceived(received) => {
                assert_eq!(received.bugreport.name, "bugreport.tlbundle");
                assert_eq!(received.bugreport.content.as_ref(), b"payload");
                assert_eq!(received.timestamp, Some(Timestamp::real(42)));
            }
            other => panic!("unexpected event: {:?}", other.kind()),
        }
    }

    #[test]
    fn malformed_messages_are_rejected() {
        let (protocol, _out, mut events) = wired();
        let err = protocol.handle_message("{").unwrap_err();
        assert_eq!(err.error_kind(), "malformed");

        let err = protocol
            .handle_message(r#"{"type":"bugreport","file_name":"x","content":"!!"}"#)
            .unwrap_err();
        assert_eq!(err.error_kind(), "invalid_content");
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn only_real_positions_are_forwarded() {
        let (protocol, mut out, _events) = wired();
        let real = AppEvent::trace_position_update(TracePosition::from_timestamp(Timestamp::real(5)));
        let elapsed =
            AppEvent::trace_position_update(TracePosition::from_timestamp(Timestamp::elapsed(6)));

        protocol.on_event(&real).await;
        protocol.on_event(&elapsed).await;

        assert_eq!(out.try_recv().unwrap(), r#"{"type":"timestamp","timestamp_ns":5}"#);
        assert!(out.try_recv().is_err());
    }

    #[tokio::test]
    async fn pump_processes_inbound_lines() {
        let (protocol, _out, mut events) = wired();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let handle = protocol.start(in_rx, shutdown.clone());

        in_tx.send("garbage".to_string()).unwrap();
        in_tx
            .send(r#"{"type":"timestamp","timestamp_ns":9}"#.to_string())
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, AppEvent::RemoteToolTimestampReceived(_)));

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn pump_stops_when_inbound_closes() {
        let (protocol, _out, _events) = wired();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();
        let handle = protocol.start(in_rx, CancellationToken::new());
        drop(in_tx);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
