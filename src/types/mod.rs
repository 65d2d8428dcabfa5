//! Wire types for the Live protocol.

pub mod client;
pub mod content;
pub mod log;
pub mod server;

pub use client::*;
pub use content::*;
pub use log::*;
pub use server::*;
