//! Live event types and the per-kind subscriber table.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::types::{
    LiveServerToolCall, LiveServerToolCallCancellation, ModelTurnContent, StreamingLog,
};

/// Events published by a [`LiveClient`](super::LiveClient).
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    Open,
    Close(CloseEvent),
    Error(ErrorEvent),
    SetupComplete,
    ToolCall(LiveServerToolCall),
    ToolCallCancellation(LiveServerToolCallCancellation),
    Interrupted,
    TurnComplete,
    Content(ModelTurnContent),
    /// Raw bytes of one inline audio part.
    Audio(Vec<u8>),
    Log(StreamingLog),
}

impl LiveEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Open => EventKind::Open,
            Self::Close(_) => EventKind::Close,
            Self::Error(_) => EventKind::Error,
            Self::SetupComplete => EventKind::SetupComplete,
            Self::ToolCall(_) => EventKind::ToolCall,
            Self::ToolCallCancellation(_) => EventKind::ToolCallCancellation,
            Self::Interrupted => EventKind::Interrupted,
            Self::TurnComplete => EventKind::TurnComplete,
            Self::Content(_) => EventKind::Content,
            Self::Audio(_) => EventKind::Audio,
            Self::Log(_) => EventKind::Log,
        }
    }
}

/// Discriminant of [`LiveEvent`], rendered as `setupcomplete`, `toolcall`, ...
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    Open,
    Close,
    Error,
    SetupComplete,
    ToolCall,
    ToolCallCancellation,
    Interrupted,
    TurnComplete,
    Content,
    Audio,
    Log,
}

/// Why a connection ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseEvent {
    /// Websocket close code, when the peer sent one.
    pub code: Option<u16>,
    pub reason: String,
}

impl CloseEvent {
    pub fn new(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Where an [`ErrorEvent`] originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorOrigin {
    /// The connection attempt itself failed.
    Connect,
    /// An established connection reported a failure.
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub origin: ErrorOrigin,
    pub message: String,
}

impl ErrorEvent {
    pub fn new(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            origin,
            message: message.into(),
        }
    }
}

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Listener = Arc<dyn Fn(&LiveEvent) + Send + Sync>;

type ListenerTable = HashMap<EventKind, Vec<(SubscriptionId, Listener)>>;

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    listeners: Mutex<ListenerTable>,
}

impl BusInner {
    fn table(&self) -> MutexGuard<'_, ListenerTable> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut table = self.table();
        let mut removed = false;
        for entries in table.values_mut() {
            let before = entries.len();
            entries.retain(|(entry_id, _)| *entry_id != id);
            removed |= entries.len() != before;
        }
        removed
    }
}

/// Dispatch table mapping each event kind to its current subscribers.
///
/// Emission is synchronous. Listeners are copied out of the table before
/// they run, so a listener may subscribe, unsubscribe or drive the client
/// without deadlocking.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<EventKind, usize> = self
            .inner
            .table()
            .iter()
            .map(|(kind, entries)| (*kind, entries.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

impl EventBus {
    /// An empty subscriber table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for events of `kind`.
    pub fn on<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&LiveEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .table()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn off(&self, id: SubscriptionId) -> bool {
        self.inner.remove(id)
    }

    /// Number of live subscriptions for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner.table().get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` to every subscriber of its kind, in subscription order.
    pub fn emit(&self, event: LiveEvent) {
        let listeners: Vec<Listener> = self
            .inner
            .table()
            .get(&event.kind())
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();
        for listener in listeners {
            listener(&event);
        }
    }

    /// Receive every event as an async stream.
    ///
    /// Subscriptions are removed when the stream is dropped.
    pub fn subscribe(&self) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let ids = EventKind::iter()
            .map(|kind| {
                let tx = tx.clone();
                self.on(kind, move |event| {
                    let _ = tx.send(event.clone());
                })
            })
            .collect();
        EventStream {
            inner: UnboundedReceiverStream::new(rx),
            bus: Arc::downgrade(&self.inner),
            ids,
        }
    }

    /// Subscribe to `open`.
    pub fn on_open<F: Fn() + Send + Sync + 'static>(&self, f: F) -> SubscriptionId {
        self.on(EventKind::Open, move |_| f())
    }

    /// Subscribe to `close`.
    pub fn on_close<F: Fn(&CloseEvent) + Send + Sync + 'static>(&self, f: F) -> SubscriptionId {
        self.on(EventKind::Close, move |event| {
            if let LiveEvent::Close(close) = event {
                f(close)
            }
        })
    }

    /// Subscribe to `error`.
    pub fn on_error<F: Fn(&ErrorEvent) + Send + Sync + 'static>(&self, f: F) -> SubscriptionId {
        self.on(EventKind::Error, move |event| {
            if let LiveEvent::Error(error) = event {
                f(error)
            }
        })
    }

    pub fn on_setup_complete<F: Fn() + Send + Sync + 'static>(&self, f: F) -> SubscriptionId {
        self.on(EventKind::SetupComplete, move |_| f())
    }

    pub fn on_tool_call<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&LiveServerToolCall) + Send + Sync + 'static,
    {
        self.on(EventKind::ToolCall, move |event| {
            if let LiveEvent::ToolCall(call) = event {
                f(call)
            }
        })
    }

    pub fn on_tool_call_cancellation<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&LiveServerToolCallCancellation) + Send + Sync + 'static,
    {
        self.on(EventKind::ToolCallCancellation, move |event| {
            if let LiveEvent::ToolCallCancellation(cancellation) = event {
                f(cancellation)
            }
        })
    }

    pub fn on_interrupted<F: Fn() + Send + Sync + 'static>(&self, f: F) -> SubscriptionId {
        self.on(EventKind::Interrupted, move |_| f())
    }

    pub fn on_turn_complete<F: Fn() + Send + Sync + 'static>(&self, f: F) -> SubscriptionId {
        self.on(EventKind::TurnComplete, move |_| f())
    }

    pub fn on_content<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&ModelTurnContent) + Send + Sync + 'static,
    {
        self.on(EventKind::Content, move |event| {
            if let LiveEvent::Content(content) = event {
                f(content)
            }
        })
    }

    pub fn on_audio<F: Fn(&[u8]) + Send + Sync + 'static>(&self, f: F) -> SubscriptionId {
        self.on(EventKind::Audio, move |event| {
            if let LiveEvent::Audio(bytes) = event {
                f(bytes)
            }
        })
    }

    /// Subscribe to `log` entries.
    pub fn on_log<F: Fn(&StreamingLog) + Send + Sync + 'static>(&self, f: F) -> SubscriptionId {
        self.on(EventKind::Log, move |event| {
            if let LiveEvent::Log(log) = event {
                f(log)
            }
        })
    }
}

/// Stream of every event published on an [`EventBus`].
pub struct EventStream {
    inner: UnboundedReceiverStream<LiveEvent>,
    bus: Weak<BusInner>,
    ids: Vec<SubscriptionId>,
}

impl Stream for EventStream {
    type Item = LiveEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            for id in self.ids.drain(..) {
                bus.remove(id);
            }
        }
    }
}
