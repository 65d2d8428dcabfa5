//! Boundary between the session client and the duplex connection.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::events::CloseEvent;
use crate::error::Result;
use crate::types::{Blob, Content, FunctionResponse, LiveConnectConfig, LiveServerMessage};

/// Opens duplex connections for a [`LiveClient`](super::LiveClient).
#[async_trait]
pub trait LiveTransport: Send + Sync {
    /// Establish a connection and return its handle.
    ///
    /// Resolves once the channel is usable. `callbacks` receive every
    /// lifecycle notification for this connection from then on.
    async fn connect(
        &self,
        model: &str,
        config: &LiveConnectConfig,
        callbacks: LiveCallbacks,
    ) -> Result<Box<dyn LiveSession>>;
}

/// An established connection, exclusively owned by the client.
///
/// Sends are fire-and-forget: an `Ok` means the unit was handed to the
/// connection, not that the server received it.
pub trait LiveSession: Send + Sync {
    fn close(&self);
    fn send_realtime_input(&self, media: Blob) -> Result<()>;
    fn send_tool_response(&self, function_responses: Vec<FunctionResponse>) -> Result<()>;
    fn send_client_content(&self, turns: Vec<Content>, turn_complete: bool) -> Result<()>;
}

type Notify = Arc<dyn Fn() + Send + Sync>;
type OnMessage = Arc<dyn Fn(LiveServerMessage) + Send + Sync>;
type OnError = Arc<dyn Fn(String) + Send + Sync>;
type OnClose = Arc<dyn Fn(CloseEvent) + Send + Sync>;

/// The four lifecycle callbacks handed to [`LiveTransport::connect`].
#[derive(Clone)]
pub struct LiveCallbacks {
    on_open: Notify,
    on_message: OnMessage,
    on_error: OnError,
    on_close: OnClose,
}

impl fmt::Debug for LiveCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveCallbacks").finish_non_exhaustive()
    }
}

impl LiveCallbacks {
    pub fn new(
        on_open: impl Fn() + Send + Sync + 'static,
        on_message: impl Fn(LiveServerMessage) + Send + Sync + 'static,
        on_error: impl Fn(String) + Send + Sync + 'static,
        on_close: impl Fn(CloseEvent) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_open: Arc::new(on_open),
            on_message: Arc::new(on_message),
            on_error: Arc::new(on_error),
            on_close: Arc::new(on_close),
        }
    }

    pub fn open(&self) {
        (self.on_open)()
    }

    pub fn message(&self, message: LiveServerMessage) {
        (self.on_message)(message)
    }

    pub fn error(&self, message: impl Into<String>) {
        (self.on_error)(message.into())
    }

    pub fn close(&self, event: CloseEvent) {
        (self.on_close)(event)
    }
}
