//! Device property model and the backend trait.

use std::fmt;
use std::sync::Arc;

use crate::error::DeviceResult;

/// Opaque handle for an output device.
///
/// Only valid for the operation that resolved it; the default device can
/// change between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device {}", self.0)
    }
}

/// Properties the controller reads, writes, and observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// Output volume, a scalar in `[0.0, 1.0]`
    OutputVolume,
    /// Output mute, a 0/1 switch
    OutputMute,
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutputVolume => f.write_str("output volume"),
            Self::OutputMute => f.write_str("output mute"),
        }
    }
}

/// Raw property value as stored by the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue {
    /// Normalized scalar
    Scalar(f32),
    /// Integer switch (1 = on)
    Switch(u32),
}

/// Identifies one registered listener within a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wrap a backend-assigned listener number.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The backend-assigned listener number.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Change callback. Carries no payload: observers re-query the property.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Property interface of the OS audio layer.
///
/// Implementations must not hold internal locks while invoking listeners,
/// since listeners call straight back into the backend.
#[cfg_attr(test, mockall::automock)]
pub trait AudioBackend: Send + Sync {
    /// Resolve the current default output device.
    ///
    /// # Errors
    /// Returns `DeviceUnavailable` if there is no default output device, or a
    /// system error if the lookup itself fails.
    fn default_output_device(&self) -> DeviceResult<DeviceId>;

    /// Whether the device exposes the property at all.
    fn has_property(&self, device: DeviceId, property: Property) -> bool;

    /// Whether the property can currently be written.
    ///
    /// # Errors
    /// Returns an error if the capability query fails.
    fn is_settable(&self, device: DeviceId, property: Property) -> DeviceResult<bool>;

    /// Read the raw property value.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    fn get_property(&self, device: DeviceId, property: Property) -> DeviceResult<PropertyValue>;

    /// Write the raw property value.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    fn set_property(
        &self,
        device: DeviceId,
        property: Property,
        value: PropertyValue,
    ) -> DeviceResult<()>;

    /// Register a listener invoked whenever the property changes.
    ///
    /// # Errors
    /// Returns an error if the registration fails.
    fn add_listener(
        &self,
        device: DeviceId,
        property: Property,
        listener: Listener,
    ) -> DeviceResult<ListenerId>;

    /// Remove a listener registered with [`AudioBackend::add_listener`].
    ///
    /// # Errors
    /// Returns an error if the listener could not be removed.
    fn remove_listener(
        &self,
        device: DeviceId,
        property: Property,
        id: ListenerId,
    ) -> DeviceResult<()>;
}
