//! genai-live: session client for the Gemini Live streaming protocol.
//!
//! A [`LiveClient`](live::LiveClient) owns one duplex connection, runs the
//! connection state machine, splits inline PCM audio out of model turns and
//! republishes everything as typed [`LiveEvent`](live::LiveEvent)s.
//!
//! # Quick Start
//!
//! ```no_run
//! use genai_live::prelude::*;
//!
//! # async fn example() -> genai_live::error::Result<()> {
//! let client = LiveClient::from_options(ClientOptions::from_env()?);
//! client.events().on_audio(|pcm| println!("{} bytes of audio", pcm.len()));
//! client.events().on_content(|content| println!("{:?}", content.model_turn));
//!
//! let config = LiveConnectConfig::new().with_response_modalities(&[Modality::Audio]);
//! if client.connect("models/gemini-2.0-flash-exp", config).await? {
//!     client.send_text("Hello!");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod live;
pub mod prelude;
pub mod types;
