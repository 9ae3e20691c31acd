//! Volume and mute control of the default output device.
//!
//! Every operation resolves the default output device again, so a device
//! switch between two calls is picked up by the second one. Each operation
//! comes in two forms: `try_*` returns the precise [`DeviceError`], the plain
//! form logs it and collapses it to `None` / `false`.

use std::sync::Arc;

use sdvolume_core::level::{from_system, to_system};
use tracing::{debug, info, warn};

use crate::error::{DeviceError, DeviceResult};
use crate::property::{AudioBackend, DeviceId, Listener, Property, PropertyValue};
use crate::subscription::Subscription;

/// Stateless facade over an [`AudioBackend`].
#[derive(Clone)]
pub struct VolumeController {
    backend: Arc<dyn AudioBackend>,
}

impl VolumeController {
    /// Create a controller on top of a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self { backend }
    }

    /// Read the output volume level.
    ///
    /// # Errors
    /// Fails if there is no default device, it has no volume property, or the
    /// query fails.
    pub fn try_get_volume(&self) -> DeviceResult<u8> {
        let device = self.resolve(Property::OutputVolume)?;
        match self.backend.get_property(device, Property::OutputVolume)? {
            PropertyValue::Scalar(raw) => Ok(from_system(raw)),
            other => Err(unexpected_value(Property::OutputVolume, other)),
        }
    }

    /// Write the output volume level, clamped to `[0, 100]`.
    ///
    /// # Errors
    /// Fails if there is no default device, it has no volume property, the
    /// property is not settable, or the write fails.
    pub fn try_set_volume(&self, level: i32) -> DeviceResult<()> {
        let device = self.resolve_settable(Property::OutputVolume)?;
        let scalar = to_system(level);
        self.backend.set_property(device, Property::OutputVolume, PropertyValue::Scalar(scalar))?;
        debug!(%device, level, scalar, "Output volume set");
        Ok(())
    }

    /// Move the output volume by a signed delta.
    ///
    /// The target is passed through unclamped; `try_set_volume` saturates it.
    ///
    /// # Errors
    /// Fails without writing if the current volume cannot be read, otherwise
    /// as [`VolumeController::try_set_volume`].
    pub fn try_change_volume(&self, delta: i32) -> DeviceResult<()> {
        let current = self.try_get_volume()?;
        self.try_set_volume(i32::from(current).saturating_add(delta))
    }

    /// Read the output mute flag.
    ///
    /// # Errors
    /// Fails if there is no default device, it has no mute property, or the
    /// query fails.
    pub fn try_get_mute(&self) -> DeviceResult<bool> {
        let device = self.resolve(Property::OutputMute)?;
        match self.backend.get_property(device, Property::OutputMute)? {
            PropertyValue::Switch(raw) => Ok(raw == 1),
            other => Err(unexpected_value(Property::OutputMute, other)),
        }
    }

    /// Write the output mute flag.
    ///
    /// # Errors
    /// Fails if there is no default device, it has no mute property, the
    /// property is not settable, or the write fails.
    pub fn try_set_mute(&self, muted: bool) -> DeviceResult<()> {
        let device = self.resolve_settable(Property::OutputMute)?;
        self.backend.set_property(
            device,
            Property::OutputMute,
            PropertyValue::Switch(u32::from(muted)),
        )?;
        debug!(%device, muted, "Output mute set");
        Ok(())
    }

    /// Read the output volume level, `None` if unavailable.
    #[must_use]
    pub fn get_volume(&self) -> Option<u8> {
        self.try_get_volume()
            .inspect_err(|e| debug!(error = %e, "Output volume unavailable"))
            .ok()
    }

    /// Write the output volume level. Returns whether the write happened.
    pub fn set_volume(&self, level: i32) -> bool {
        self.try_set_volume(level)
            .inspect_err(|e| warn!(level, error = %e, "Failed to set output volume"))
            .is_ok()
    }

    /// Move the output volume by a signed delta. Returns whether the write
    /// happened.
    pub fn change_volume(&self, delta: i32) -> bool {
        self.try_change_volume(delta)
            .inspect_err(|e| warn!(delta, error = %e, "Failed to change output volume"))
            .is_ok()
    }

    /// Read the output mute flag, `None` if unavailable.
    #[must_use]
    pub fn get_mute(&self) -> Option<bool> {
        self.try_get_mute()
            .inspect_err(|e| debug!(error = %e, "Output mute unavailable"))
            .ok()
    }

    /// Write the output mute flag. Returns whether the write happened.
    pub fn set_mute(&self, muted: bool) -> bool {
        self.try_set_mute(muted)
            .inspect_err(|e| warn!(muted, error = %e, "Failed to set output mute"))
            .is_ok()
    }

    /// Register change callbacks on the current default output device.
    ///
    /// Callbacks carry no value; re-query with [`VolumeController::get_volume`]
    /// or [`VolumeController::get_mute`]. A property the device lacks is
    /// skipped. Dropping the returned [`Subscription`] removes the listeners.
    ///
    /// # Errors
    /// Fails if there is no default device or a registration fails; listeners
    /// registered before the failure are removed again.
    pub fn subscribe<V, M>(&self, on_volume_changed: V, on_mute_changed: M) -> DeviceResult<Subscription>
    where
        V: Fn() + Send + Sync + 'static,
        M: Fn() + Send + Sync + 'static,
    {
        let device = self.backend.default_output_device()?;
        let mut subscription = Subscription::new(Arc::clone(&self.backend), device);

        let on_volume: Listener = Arc::new(on_volume_changed);
        let on_mute: Listener = Arc::new(on_mute_changed);

        for (property, listener) in [(Property::OutputVolume, on_volume), (Property::OutputMute, on_mute)] {
            if !self.backend.has_property(device, property) {
                debug!(%device, %property, "Device lacks property, not listening");
                continue;
            }
            let id = self.backend.add_listener(device, property, listener)?;
            subscription.push(property, id);
        }

        info!(%device, listeners = subscription.len(), "Subscribed to output device changes");
        Ok(subscription)
    }

    /// Resolve the default device and check it has the property.
    fn resolve(&self, property: Property) -> DeviceResult<DeviceId> {
        let device = self.backend.default_output_device()?;
        if !self.backend.has_property(device, property) {
            return Err(DeviceError::PropertyUnsupported(property));
        }
        Ok(device)
    }

    /// Resolve the default device and probe that the property is writable.
    fn resolve_settable(&self, property: Property) -> DeviceResult<DeviceId> {
        let device = self.resolve(property)?;
        if !self.backend.is_settable(device, property)? {
            return Err(DeviceError::NotSettable(property));
        }
        Ok(device)
    }
}

fn unexpected_value(property: Property, value: PropertyValue) -> DeviceError {
    DeviceError::system(-1, format!("unexpected {property} value: {value:?}"))
}
