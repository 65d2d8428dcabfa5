//! Convenience re-exports for common use.

pub use crate::config::ClientOptions;
pub use crate::error::{LiveError, Result};
pub use crate::live::{
    ConnectionStatus, EventKind, LiveApi, LiveClient, LiveEvent, LiveTransport,
};
pub use crate::types::{
    Blob, Content, FunctionResponse, LiveClientToolResponse, LiveConnectConfig, Modality, Part,
};
