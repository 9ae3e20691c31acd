//! Feedback payload rendered onto the dial's touch display.

use serde::{Deserialize, Serialize};

use crate::dial::DialState;

/// Default title shown above the value.
pub const DEFAULT_TITLE: &str = "System Volume";
/// Default icon while the output is muted.
pub const DEFAULT_MUTED_ICON: &str = "assets/off.svg";
/// Default icon while the output is audible.
pub const DEFAULT_UNMUTED_ICON: &str = "assets/on.svg";

/// Value text for a muted output.
const MUTED_TEXT: &str = "Muted";
/// Value text when the level cannot be read.
const UNKNOWN_TEXT: &str = "Unknown";

/// Indicator bar state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    /// Bar fill (0 - 100)
    pub value: u8,
    /// Whether the bar is drawn as active
    pub enabled: bool,
}

/// Display payload for one dial.
///
/// Serializes to the JSON shape expected by the host's `setFeedback` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub title: String,
    pub value: String,
    pub icon: String,
    pub indicator: Indicator,
}

/// Static parts of the feedback payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackStyle {
    pub title: String,
    pub muted_icon: String,
    pub unmuted_icon: String,
}

impl Default for FeedbackStyle {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            muted_icon: DEFAULT_MUTED_ICON.to_string(),
            unmuted_icon: DEFAULT_UNMUTED_ICON.to_string(),
        }
    }
}

impl Feedback {
    /// Render the payload for a dial's cached state.
    ///
    /// Only a known `muted == true` shows the muted face; an unknown mute
    /// state renders as audible.
    #[must_use]
    pub fn render(state: &DialState, style: &FeedbackStyle) -> Self {
        let level = state.level.unwrap_or(0);

        if state.muted == Some(true) {
            Self {
                title: style.title.clone(),
                value: MUTED_TEXT.to_string(),
                icon: style.muted_icon.clone(),
                indicator: Indicator { value: level, enabled: false },
            }
        } else {
            let value = state.level.map_or_else(|| UNKNOWN_TEXT.to_string(), |l| l.to_string());
            Self {
                title: style.title.clone(),
                value,
                icon: style.unmuted_icon.clone(),
                indicator: Indicator { value: level, enabled: true },
            }
        }
    }
}
