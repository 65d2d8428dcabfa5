//! Controller that remembers model and config across reconnects.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use super::client::LiveClient;
use super::events::SubscriptionId;
use crate::error::{LiveError, Result};
use crate::types::LiveConnectConfig;

/// Model used until [`LiveApi::set_model`] is called.
pub const DEFAULT_MODEL: &str = "models/gemini-2.0-flash-exp";

/// Owns a [`LiveClient`] plus the settings used to (re)connect it.
///
/// `connect` always starts from a clean slate: any existing connection
/// is torn down before the new attempt.
#[derive(Debug)]
pub struct LiveApi {
    client: LiveClient,
    model: String,
    config: Option<LiveConnectConfig>,
    connected: Arc<AtomicBool>,
    subscriptions: Vec<SubscriptionId>,
}

impl LiveApi {
    /// Wrap `client`, starting with [`DEFAULT_MODEL`] and no config.
    pub fn new(client: LiveClient) -> Self {
        let connected = Arc::new(AtomicBool::new(false));
        let on_open = Arc::clone(&connected);
        let on_close = Arc::clone(&connected);
        let subscriptions = vec![
            client
                .events()
                .on_open(move || on_open.store(true, Ordering::SeqCst)),
            client
                .events()
                .on_close(move |_| on_close.store(false, Ordering::SeqCst)),
        ];
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
            config: None,
            connected,
            subscriptions,
        }
    }

    /// The wrapped client, for subscribing and sending.
    pub fn client(&self) -> &LiveClient {
        &self.client
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn config(&self) -> Option<&LiveConnectConfig> {
        self.config.as_ref()
    }

    pub fn set_config(&mut self, config: LiveConnectConfig) {
        self.config = Some(config);
    }

    /// Whether an `open` has been seen since the last `close`.
    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Reconnect with the current model and config.
    pub async fn connect(&self) -> Result<bool> {
        let config = self.config.clone().ok_or(LiveError::ConfigNotSet)?;
        self.client.disconnect();
        info!(model = %self.model, "starting live session");
        self.client.connect(self.model.clone(), config).await
    }

    /// Disconnect the client and clear the connected flag.
    pub fn disconnect(&self) -> bool {
        let disconnected = self.client.disconnect();
        self.connected.store(false, Ordering::SeqCst);
        disconnected
    }
}

impl Drop for LiveApi {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.client.events().off(id);
        }
        self.client.disconnect();
    }
}
