//! Dial gestures and lifecycle events.
//!
//! Host messages are translated into these events by the protocol layer, so
//! the plugin only ever reasons about what happened to a dial.

use crate::dial::Coordinates;

/// Something that happened to one dial, identified separately by its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialEvent {
    /// The dial became visible on the control surface
    Activate { coordinates: Option<Coordinates> },
    /// The dial was turned by a signed number of ticks
    Rotate { ticks: i32 },
    /// The dial was pushed (`pressed == true`) or released
    Press { pressed: bool },
    /// The touch strip above the dial was tapped
    Tap,
    /// The dial is no longer visible
    Deactivate,
}

impl DialEvent {
    /// Short name used in log output.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Activate { .. } => "activate",
            Self::Rotate { .. } => "rotate",
            Self::Press { .. } => "press",
            Self::Tap => "tap",
            Self::Deactivate => "deactivate",
        }
    }
}
