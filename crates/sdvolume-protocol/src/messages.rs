//! Inbound host events (host to plugin).

use sdvolume_core::{Coordinates, DialEvent};
use serde::Deserialize;

/// `controller` value of an action placed on a key.
const KEYPAD_CONTROLLER: &str = "Keypad";

/// Event received from the host.
///
/// Only the events a dial action reacts to are modelled; everything else
/// deserializes to [`InboundEvent::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum InboundEvent {
    /// An action instance became visible
    WillAppear {
        context: String,
        #[serde(default)]
        payload: AppearPayload,
    },
    /// An action instance is no longer visible
    WillDisappear { context: String },
    /// Encoder turned
    DialRotate { context: String, payload: RotatePayload },
    /// Encoder pushed down
    DialDown { context: String },
    /// Encoder released
    DialUp { context: String },
    /// Encoder pushed or released (older hosts)
    DialPress { context: String, payload: PressPayload },
    /// Touch strip tapped
    TouchTap { context: String },
    /// Any event this plugin does not handle
    #[serde(other)]
    Unknown,
}

/// Payload of `willAppear`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AppearPayload {
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    /// `"Encoder"` for dials, `"Keypad"` for keys
    #[serde(default)]
    pub controller: Option<String>,
}

/// Payload of `dialRotate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RotatePayload {
    pub ticks: i32,
}

/// Payload of `dialPress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PressPayload {
    pub pressed: bool,
}

impl AppearPayload {
    /// Whether the instance sits on a key rather than a dial.
    #[must_use]
    pub fn is_keypad(&self) -> bool {
        self.controller.as_deref() == Some(KEYPAD_CONTROLLER)
    }
}

impl InboundEvent {
    /// Context of the action instance the event is addressed to.
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::WillAppear { context, .. }
            | Self::WillDisappear { context }
            | Self::DialRotate { context, .. }
            | Self::DialDown { context }
            | Self::DialUp { context }
            | Self::DialPress { context, .. }
            | Self::TouchTap { context } => Some(context),
            Self::Unknown => None,
        }
    }

    /// Translate into a dial event for its context.
    ///
    /// Appearances on a key have no dial to drive and yield `None`.
    #[must_use]
    pub fn into_dial_event(self) -> Option<(String, DialEvent)> {
        let translated = match self {
            Self::WillAppear { payload, .. } if payload.is_keypad() => return None,
            Self::WillAppear { context, payload } => {
                (context, DialEvent::Activate { coordinates: payload.coordinates })
            }
            Self::WillDisappear { context } => (context, DialEvent::Deactivate),
            Self::DialRotate { context, payload } => {
                (context, DialEvent::Rotate { ticks: payload.ticks })
            }
            Self::DialDown { context } => (context, DialEvent::Press { pressed: true }),
            Self::DialUp { context } => (context, DialEvent::Press { pressed: false }),
            Self::DialPress { context, payload } => {
                (context, DialEvent::Press { pressed: payload.pressed })
            }
            Self::TouchTap { context } => (context, DialEvent::Tap),
            Self::Unknown => return None,
        };
        Some(translated)
    }
}
