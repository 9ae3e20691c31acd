//! SDVolume Device - Default output device volume and mute control.
//!
//! This crate provides:
//! - The [`AudioBackend`] trait, the property interface of the OS audio layer
//! - [`VolumeController`], a stateless facade that resolves the default output
//!   device on every call and converts between levels and device scalars
//! - [`Subscription`], an owned set of change listeners released on drop
//! - Backends: ALSA mixer (via `amixer`) and an in-memory device

pub mod alsa;
pub mod controller;
pub mod error;
pub mod memory;
pub mod property;
pub mod subscription;

pub use alsa::AlsaMixerBackend;
pub use controller::VolumeController;
pub use error::{DeviceError, DeviceResult};
pub use memory::{MemoryBackend, MemoryDevice};
pub use property::{AudioBackend, DeviceId, Listener, ListenerId, Property, PropertyValue};
pub use subscription::Subscription;
