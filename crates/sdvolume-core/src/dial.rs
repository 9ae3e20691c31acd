//! Per-dial cached state.

use serde::{Deserialize, Serialize};

/// Grid position of a dial on the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    /// Column index (encoders are numbered left to right)
    pub column: u32,
    /// Row index
    pub row: u32,
}

/// Cached state of one active dial.
///
/// `None` means the value is unknown: the device could not be queried, or
/// has not been queried yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialState {
    /// Host-assigned opaque identifier for this dial
    pub context: String,
    /// Position on the control surface, if the host reported one
    pub coordinates: Option<Coordinates>,
    /// Last known volume level (0 - 100)
    pub level: Option<u8>,
    /// Last known mute flag
    pub muted: Option<bool>,
}

impl DialState {
    /// Create a dial state with unknown level and mute.
    #[must_use]
    pub fn new(context: impl Into<String>, coordinates: Option<Coordinates>) -> Self {
        Self { context: context.into(), coordinates, level: None, muted: None }
    }

    /// The mute flag a toggle gesture should write.
    ///
    /// An unknown mute state counts as not muted, so the first toggle mutes.
    #[must_use]
    pub fn toggled_mute(&self) -> bool {
        !self.muted.unwrap_or(false)
    }
}
