//! SDVolume Core - Volume levels, dial state, and feedback rendering.
//!
//! This crate contains the domain types shared between the device layer,
//! the host protocol, and the plugin binary. Nothing in here talks to the
//! operating system.

pub mod dial;
pub mod event;
pub mod feedback;
pub mod level;

pub use dial::{Coordinates, DialState};
pub use event::DialEvent;
pub use feedback::{Feedback, FeedbackStyle, Indicator};
pub use level::{from_system, to_system};
