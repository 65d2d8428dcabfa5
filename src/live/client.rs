//! Session client: connection state machine and outbound operations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use strum::{Display, EnumString};
use tracing::{debug, error, info, warn};

use super::dispatch::dispatch;
use super::events::{CloseEvent, ErrorEvent, ErrorOrigin, EventBus, LiveEvent};
use super::transport::{LiveCallbacks, LiveSession, LiveTransport};
use crate::error::{LiveError, Result};
use crate::types::{
    Blob, Content, LiveClientContent, LiveClientToolResponse, LiveConnectConfig,
    LiveServerMessage, LogMessage, Part, StreamingLog,
};

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Internal state; the session handle exists only while `Connected`.
///
/// `attempt` identifies the connect call that produced the state, so
/// callbacks from an abandoned connection can be told apart.
enum ConnectionState {
    Disconnected,
    Connecting {
        attempt: u64,
        /// Set once the transport reported `open` for this attempt.
        opened: bool,
    },
    Connected {
        attempt: u64,
        session: Arc<dyn LiveSession>,
    },
}

impl ConnectionState {
    fn status(&self) -> ConnectionStatus {
        match self {
            Self::Disconnected => ConnectionStatus::Disconnected,
            Self::Connecting { .. } => ConnectionStatus::Connecting,
            Self::Connected { .. } => ConnectionStatus::Connected,
        }
    }

    fn attempt(&self) -> Option<u64> {
        match self {
            Self::Disconnected => None,
            Self::Connecting { attempt, .. } | Self::Connected { attempt, .. } => Some(*attempt),
        }
    }
}

#[derive(Default)]
struct SessionParams {
    model: Option<String>,
    config: Option<LiveConnectConfig>,
}

struct ClientInner {
    transport: Arc<dyn LiveTransport>,
    state: Mutex<ConnectionState>,
    params: Mutex<SessionParams>,
    attempts: AtomicU64,
    events: EventBus,
}

impl ClientInner {
    fn state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn params(&self) -> MutexGuard<'_, SessionParams> {
        self.params.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, attempt: u64) -> bool {
        self.state().attempt() == Some(attempt)
    }

    fn log(&self, log_type: &str, message: impl Into<LogMessage>) {
        self.events
            .emit(LiveEvent::Log(StreamingLog::new(log_type, message)));
    }

    /// Move to `Disconnected`, returning the state that was left.
    ///
    /// With `Some(attempt)` only that attempt is ended. Returns `None` when
    /// there was nothing (or nothing current) to end.
    fn end(&self, attempt: Option<u64>) -> Option<ConnectionState> {
        let mut state = self.state();
        let current = state.attempt()?;
        if attempt.is_some_and(|attempt| attempt != current) {
            return None;
        }
        Some(std::mem::replace(&mut *state, ConnectionState::Disconnected))
    }

    fn handle_open(&self, attempt: u64) {
        {
            let mut state = self.state();
            match &mut *state {
                ConnectionState::Connecting {
                    attempt: current,
                    opened,
                } if *current == attempt => *opened = true,
                ConnectionState::Connected {
                    attempt: current, ..
                } if *current == attempt => {}
                _ => {
                    debug!(attempt, "ignoring open from an abandoned connection");
                    return;
                }
            }
        }
        info!("live connection opened");
        self.log("client.open", "Connected");
        self.events.emit(LiveEvent::Open);
    }

    fn handle_message(&self, attempt: u64, message: LiveServerMessage) {
        if !self.is_current(attempt) {
            debug!(attempt, "dropping message from an abandoned connection");
            return;
        }
        for event in dispatch(message) {
            // A listener may have disconnected while this message was being emitted.
            if !self.is_current(attempt) {
                return;
            }
            self.events.emit(event);
        }
    }

    fn handle_error(&self, attempt: u64, message: String) {
        let Some(previous) = self.end(Some(attempt)) else {
            debug!(attempt, %message, "ignoring error from an abandoned connection");
            return;
        };
        if let ConnectionState::Connected { session, .. } = previous {
            session.close();
        }
        error!(%message, "live connection error");
        self.log("server.error", message.clone());
        self.events.emit(LiveEvent::Error(ErrorEvent::new(
            ErrorOrigin::Transport,
            message.clone(),
        )));
        self.emit_server_close(CloseEvent::new(None, message));
    }

    fn handle_close(&self, attempt: u64, event: CloseEvent) {
        if self.end(Some(attempt)).is_none() {
            debug!(attempt, reason = %event.reason, "ignoring close from an abandoned connection");
            return;
        }
        info!(code = ?event.code, reason = %event.reason, "live connection closed");
        self.emit_server_close(event);
    }

    fn emit_server_close(&self, event: CloseEvent) {
        let description = if event.reason.is_empty() {
            "disconnected".to_string()
        } else {
            format!("disconnected with reason: {}", event.reason)
        };
        self.log("server.close", description);
        self.events.emit(LiveEvent::Close(event));
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let ConnectionState::Connected { session, .. } = state {
            session.close();
        }
    }
}

/// Client for one live conversation at a time.
///
/// Cloning is cheap; clones share the same connection and subscribers.
#[derive(Clone)]
pub struct LiveClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for LiveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveClient")
            .field("status", &self.status())
            .field("model", &self.model())
            .finish_non_exhaustive()
    }
}

impl LiveClient {
    /// Client over `transport`, initially disconnected.
    pub fn new(transport: impl LiveTransport + 'static) -> Self {
        Self::with_transport(Arc::new(transport))
    }

    /// Like [`LiveClient::new`] for an already shared transport.
    pub fn with_transport(transport: Arc<dyn LiveTransport>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                state: Mutex::new(ConnectionState::Disconnected),
                params: Mutex::new(SessionParams::default()),
                attempts: AtomicU64::new(0),
                events: EventBus::new(),
            }),
        }
    }

    /// Client backed by the websocket transport.
    #[cfg(feature = "websocket")]
    pub fn from_options(options: crate::config::ClientOptions) -> Self {
        Self::new(super::websocket::WebSocketTransport::new(options))
    }

    /// Current connection state.
    pub fn status(&self) -> ConnectionStatus {
        self.inner.state().status()
    }

    /// Whether a session is established.
    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Model of the most recent connect attempt.
    pub fn model(&self) -> Option<String> {
        self.inner.params().model.clone()
    }

    /// Config of the most recent connect attempt.
    pub fn config(&self) -> Option<LiveConnectConfig> {
        self.inner.params().config.clone()
    }

    /// Subscriber table for this client's events.
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Open a connection for `model`.
    ///
    /// Returns `Ok(false)` without side effects when already connecting or
    /// connected, and `Ok(false)` after emitting an error event when the
    /// transport fails. Only an empty model is reported as `Err`.
    pub async fn connect(
        &self,
        model: impl Into<String>,
        config: LiveConnectConfig,
    ) -> Result<bool> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(LiveError::InvalidArgument("model must not be empty".into()));
        }

        let attempt = {
            let mut state = self.inner.state();
            if !matches!(*state, ConnectionState::Disconnected) {
                info!(status = %state.status(), "already connected or connecting");
                return Ok(false);
            }
            let attempt = self.inner.attempts.fetch_add(1, Ordering::Relaxed) + 1;
            *state = ConnectionState::Connecting {
                attempt,
                opened: false,
            };
            *self.inner.params() = SessionParams {
                model: Some(model.clone()),
                config: Some(config.clone()),
            };
            attempt
        };

        info!(%model, attempt, "connecting to live api");
        let callbacks = callbacks_for(Arc::downgrade(&self.inner), attempt);
        let outcome = self
            .inner
            .transport
            .connect(&model, &config, callbacks)
            .await;

        match outcome {
            Ok(session) => {
                let session: Arc<dyn LiveSession> = Arc::from(session);
                {
                    let mut state = self.inner.state();
                    if matches!(*state, ConnectionState::Connecting { attempt: a, .. } if a == attempt)
                    {
                        *state = ConnectionState::Connected {
                            attempt,
                            session: Arc::clone(&session),
                        };
                        info!(attempt, "live connection established");
                        return Ok(true);
                    }
                }
                debug!(attempt, "connect attempt was abandoned; closing its session");
                session.close();
                Ok(false)
            }
            Err(err) => {
                let Some(previous) = self.inner.end(Some(attempt)) else {
                    debug!(attempt, error = %err, "abandoned connect attempt failed");
                    return Ok(false);
                };
                error!(error = %err, "error connecting to live api");
                let message = format!("Connection failed: {err}");
                self.inner.events.emit(LiveEvent::Error(ErrorEvent::new(
                    ErrorOrigin::Connect,
                    message.clone(),
                )));
                // An attempt that already reported `open` must also report `close`.
                if matches!(previous, ConnectionState::Connecting { opened: true, .. }) {
                    self.inner.emit_server_close(CloseEvent::new(None, message));
                }
                Ok(false)
            }
        }
    }

    /// Close the connection, or abandon an in-flight connect attempt.
    ///
    /// Returns `false` when there was nothing to disconnect.
    pub fn disconnect(&self) -> bool {
        let Some(previous) = self.inner.end(None) else {
            debug!("disconnect requested while already disconnected");
            return false;
        };
        if let ConnectionState::Connected { session, .. } = previous {
            session.close();
        }
        info!("disconnected from live api");
        self.inner.log("client.close", "Disconnected");
        self.inner
            .events
            .emit(LiveEvent::Close(CloseEvent::new(None, "client disconnect")));
        true
    }

    fn session(&self) -> Option<Arc<dyn LiveSession>> {
        match &*self.inner.state() {
            ConnectionState::Connected { session, .. } => Some(Arc::clone(session)),
            _ => None,
        }
    }

    /// Forward base64 media chunks (`audio/pcm`, `image/jpeg`, ...) one by one.
    ///
    /// A no-op when not connected.
    pub fn send_realtime_input(&self, chunks: impl IntoIterator<Item = Blob>) {
        let Some(session) = self.session() else {
            return;
        };
        let mut has_audio = false;
        let mut has_video = false;
        for chunk in chunks {
            if !(has_audio && has_video) {
                has_audio |= chunk.mime_type.contains("audio");
                has_video |= chunk.mime_type.contains("image");
            }
            if let Err(err) = session.send_realtime_input(chunk) {
                warn!(error = %err, "failed to forward realtime input");
            }
        }
        self.inner.log(
            "client.realtimeInput",
            realtime_input_label(has_audio, has_video),
        );
    }

    /// Answer tool calls. Responses without any function results are dropped.
    pub fn send_tool_response(&self, response: LiveClientToolResponse) {
        if response.function_responses.is_empty() {
            return;
        }
        let Some(session) = self.session() else {
            return;
        };
        let payload = LogMessage::payload(&response);
        if let Err(err) = session.send_tool_response(response.function_responses) {
            warn!(error = %err, "failed to forward tool response");
        }
        self.inner.log("client.toolResponse", payload);
    }

    /// Send user content parts as one client turn.
    pub fn send(&self, parts: Vec<Part>, turn_complete: bool) {
        let Some(session) = self.session() else {
            return;
        };
        let content = LiveClientContent {
            turns: vec![Content::user(parts)],
            turn_complete,
        };
        let payload = LogMessage::payload(&content);
        if let Err(err) = session.send_client_content(content.turns, content.turn_complete) {
            warn!(error = %err, "failed to forward client content");
        }
        self.inner.log("client.send", payload);
    }

    /// Send a single text part and complete the turn.
    pub fn send_text(&self, text: impl Into<String>) {
        self.send(vec![Part::text(text)], true);
    }
}

fn realtime_input_label(has_audio: bool, has_video: bool) -> &'static str {
    match (has_audio, has_video) {
        (true, true) => "audio + video",
        (true, false) => "audio",
        (false, true) => "video",
        (false, false) => "unknown",
    }
}

fn callbacks_for(inner: Weak<ClientInner>, attempt: u64) -> LiveCallbacks {
    let (open, message, error) = (inner.clone(), inner.clone(), inner.clone());
    LiveCallbacks::new(
        move || {
            if let Some(inner) = open.upgrade() {
                inner.handle_open(attempt);
            }
        },
        move |msg| {
            if let Some(inner) = message.upgrade() {
                inner.handle_message(attempt, msg);
            }
        },
        move |err| {
            if let Some(inner) = error.upgrade() {
                inner.handle_error(attempt, err);
            }
        },
        move |event| {
            if let Some(inner) = inner.upgrade() {
                inner.handle_close(attempt, event);
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realtime_input_labels() {
        assert_eq!(realtime_input_label(true, true), "audio + video");
        assert_eq!(realtime_input_label(true, false), "audio");
        assert_eq!(realtime_input_label(false, true), "video");
        assert_eq!(realtime_input_label(false, false), "unknown");
    }

    #[test]
    fn status_renders_lowercase() {
        assert_eq!(ConnectionStatus::Connecting.to_string(), "connecting");
    }
}
