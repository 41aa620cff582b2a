use std::future::Future;

use crate::files::TraceFile;
use crate::position::TracePosition;
use crate::time::Timestamp;
use crate::trace::TraceType;
use crate::view::View;

/// Lifecycle and navigation events exchanged between components.
///
/// The set is closed: every producer and consumer speaks this enum, and
/// each variant wraps a payload struct of the same name so handlers can be
/// written against the narrowed payload (see [`AppEvent::visit`]).
#[derive(Clone, Debug)]
pub enum AppEvent {
    AppInitialized(AppInitialized),
    AppFilesUploaded(AppFilesUploaded),
    AppFilesCollected(AppFilesCollected),
    AppResetRequest(AppResetRequest),
    AppTraceViewRequest(AppTraceViewRequest),
    BuganizerAttachmentsDownloadStart(BuganizerAttachmentsDownloadStart),
    BuganizerAttachmentsDownloaded(BuganizerAttachmentsDownloaded),
    TabbedViewSwitchRequest(TabbedViewSwitchRequest),
    TabbedViewSwitched(TabbedViewSwitched),
    TracePositionUpdate(TracePositionUpdate),
    RemoteToolBugreportReceived(RemoteToolBugreportReceived),
    RemoteToolTimestampReceived(RemoteToolTimestampReceived),
    /// Emitted to the host UI only.
    ViewersLoaded(ViewersLoaded),
    /// Emitted to the host UI only.
    ViewersUnloaded(ViewersUnloaded),
}

#[derive(Clone, Debug, Default)]
pub struct AppInitialized;

#[derive(Clone, Debug)]
pub struct AppFilesUploaded {
    pub files: Vec<TraceFile>,
}

#[derive(Clone, Debug)]
pub struct AppFilesCollected {
    pub files: Vec<TraceFile>,
}

#[derive(Clone, Debug, Default)]
pub struct AppResetRequest;

#[derive(Clone, Debug, Default)]
pub struct AppTraceViewRequest;

#[derive(Clone, Debug, Default)]
pub struct BuganizerAttachmentsDownloadStart;

#[derive(Clone, Debug)]
pub struct BuganizerAttachmentsDownloaded {
    pub files: Vec<TraceFile>,
}

/// Ask the trace view to focus the tab presenting `new_active_trace_type`.
#[derive(Clone, Debug)]
pub struct TabbedViewSwitchRequest {
    pub new_active_trace_type: TraceType,
}

#[derive(Clone, Debug)]
pub struct TabbedViewSwitched {
    pub new_focused_view: View,
}

#[derive(Clone, Debug)]
pub struct TracePositionUpdate {
    pub position: TracePosition,
}

#[derive(Clone, Debug)]
pub struct RemoteToolBugreportReceived {
    pub bugreport: TraceFile,
    pub timestamp: Option<Timestamp>,
}

#[derive(Clone, Debug)]
pub struct RemoteToolTimestampReceived {
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug)]
pub struct ViewersLoaded {
    pub views: Vec<View>,
}

#[derive(Clone, Debug, Default)]
pub struct ViewersUnloaded;

/// A payload type that can be narrowed out of an [`AppEvent`].
pub trait EventPayload: Sized {
    const KIND: EventKind;

    fn narrow(event: &AppEvent) -> Option<&Self>;
}

macro_rules! event_kinds {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Tag of an [`AppEvent`] variant.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum EventKind {
            $($variant,)*
        }

        impl EventKind {
            pub const ALL: &'static [EventKind] = &[$(EventKind::$variant,)*];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }

        impl AppEvent {
            pub fn kind(&self) -> EventKind {
                match self {
                    $(Self::$variant(_) => EventKind::$variant,)*
                }
            }
        }

        $(
            impl EventPayload for $variant {
                const KIND: EventKind = EventKind::$variant;

                fn narrow(event: &AppEvent) -> Option<&Self> {
                    match event {
                        AppEvent::$variant(payload) => Some(payload),
                        _ => None,
                    }
                }
            }

            impl From<$variant> for AppEvent {
                fn from(payload: $variant) -> Self {
                    Self::$variant(payload)
                }
            }
        )*
    };
}

event_kinds! {
    AppInitialized => "app_initialized",
    AppFilesUploaded => "app_files_uploaded",
    AppFilesCollected => "app_files_collected",
    AppResetRequest => "app_reset_request",
    AppTraceViewRequest => "app_trace_view_request",
    BuganizerAttachmentsDownloadStart => "buganizer_attachments_download_start",
    BuganizerAttachmentsDownloaded => "buganizer_attachments_downloaded",
    TabbedViewSwitchRequest => "tabbed_view_switch_request",
    TabbedViewSwitched => "tabbed_view_switched",
    TracePositionUpdate => "trace_position_update",
    RemoteToolBugreportReceived => "remote_tool_bugreport_received",
    RemoteToolTimestampReceived => "remote_tool_timestamp_received",
    ViewersLoaded => "viewers_loaded",
    ViewersUnloaded => "viewers_unloaded",
}

impl AppEvent {
    /// Run `handler` on the narrowed payload iff this event is of kind `P`,
    /// awaiting it to completion. Otherwise a no-op.
    ///
    /// A chain of `visit` calls runs handlers in chain order, whichever kind
    /// matched.
    pub async fn visit<'a, P, F, Fut>(&'a self, handler: F)
    where
        P: EventPayload + 'a,
        F: FnOnce(&'a P) -> Fut,
        Fut: Future<Output = ()>,
    {
        if let Some(payload) = P::narrow(self) {
            handler(payload).await;
        }
    }

    pub fn is(&self, kind: EventKind) -> bool {
        self.kind() == kind
    }

    pub fn trace_position_update(position: TracePosition) -> Self {
        TracePositionUpdate { position }.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn visit_runs_only_matching_kind() {
        let event: AppEvent = RemoteToolTimestampReceived {
            timestamp: Timestamp::real(42),
        }
        .into();
        let store = Mutex::new(Vec::new());
        let seen = &store;

        event
            .visit::<AppResetRequest, _, _>(move |_| async move { seen.lock().unwrap().push(0) })
            .await;
        event
            .visit::<RemoteToolTimestampReceived, _, _>(move |e| async move {
                seen.lock().unwrap().push(e.timestamp.value_ns())
            })
            .await;
        event
            .visit::<ViewersLoaded, _, _>(move |_| async move { seen.lock().unwrap().push(-1) })
            .await;

        assert_eq!(*store.lock().unwrap(), vec![42]);
    }

    #[tokio::test]
    async fn visit_awaits_handler_completion() {
        let event: AppEvent = AppInitialized.into();
        let store = Mutex::new(false);
        let done = &store;
        event
            .visit::<AppInitialized, _, _>(move |_| async move {
                tokio::task::yield_now().await;
                *done.lock().unwrap() = true;
            })
            .await;
        assert!(*store.lock().unwrap());
    }

    #[test]
    fn kind_matches_variant() {
        let event: AppEvent = AppFilesCollected { files: vec![] }.into();
        assert_eq!(event.kind(), EventKind::AppFilesCollected);
        assert!(event.is(EventKind::AppFilesCollected));
        assert!(!event.is(EventKind::AppFilesUploaded));
        assert_eq!(event.kind().as_str(), "app_files_collected");
    }

    #[test]
    fn kind_names_are_unique() {
        let mut names: Vec<&str> = EventKind::ALL.iter().map(EventKind::as_str).collect();
        assert_eq!(names.len(), 14);
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 14);
    }

    #[test]
    fn narrow_rejects_other_kinds() {
        let event: AppEvent = ViewersUnloaded.into();
        assert!(ViewersUnloaded::narrow(&event).is_some());
        assert!(ViewersLoaded::narrow(&event).is_none());
        assert_eq!(<ViewersUnloaded as EventPayload>::KIND, EventKind::ViewersUnloaded);
    }
}
