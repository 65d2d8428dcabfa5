//! Live session client over a duplex connection.

pub mod api;
pub mod client;
pub mod dispatch;
pub mod events;
pub mod transport;
#[cfg(feature = "websocket")]
pub mod websocket;

pub use api::{LiveApi, DEFAULT_MODEL};
pub use client::{ConnectionStatus, LiveClient};
pub use events::{
    CloseEvent, ErrorEvent, ErrorOrigin, EventBus, EventKind, EventStream, LiveEvent,
    SubscriptionId,
};
pub use transport::{LiveCallbacks, LiveSession, LiveTransport};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;
