//! SDVolume Protocol - Stream Deck host WebSocket messages and client.
//!
//! The host launches the plugin with registration arguments, the plugin
//! connects back over a local WebSocket, registers, and from then on
//! exchanges JSON events tagged by their `"event"` field.

pub mod client;
pub mod error;
pub mod events;
pub mod messages;
pub mod registration;

pub use client::{OutboundSender, PluginClient};
pub use error::{ProtocolError, ProtocolResult};
pub use events::{LayoutPayload, LogPayload, OutboundMessage, RegisterMessage};
pub use messages::{AppearPayload, InboundEvent, PressPayload, RotatePayload};
pub use registration::{HostInfo, Registration, normalize_args};

/// Feedback layout with a title, value text, icon, and indicator bar.
pub const INDICATOR_LAYOUT: &str = "$B1";
