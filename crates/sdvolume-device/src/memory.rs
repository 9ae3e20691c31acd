//! In-memory output devices.
//!
//! Behaves like an OS audio layer without touching hardware: writes notify
//! listeners when the stored value changes, and external changes can be
//! injected. Used by tests and by the `memory` backend setting.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{DeviceError, DeviceResult};
use crate::property::{AudioBackend, DeviceId, Listener, ListenerId, Property, PropertyValue};

/// One simulated output device.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryDevice {
    volume: Option<f32>,
    mute: Option<u32>,
    volume_settable: bool,
    mute_settable: bool,
}

impl MemoryDevice {
    /// A device with both properties present and writable.
    #[must_use]
    pub fn new(volume: f32, muted: bool) -> Self {
        Self {
            volume: Some(volume.clamp(0.0, 1.0)),
            mute: Some(u32::from(muted)),
            volume_settable: true,
            mute_settable: true,
        }
    }

    /// Remove the volume property.
    #[must_use]
    pub fn without_volume(mut self) -> Self {
        self.volume = None;
        self
    }

    /// Remove the mute property.
    #[must_use]
    pub fn without_mute(mut self) -> Self {
        self.mute = None;
        self
    }

    /// Make the volume property read-only.
    #[must_use]
    pub fn read_only_volume(mut self) -> Self {
        self.volume_settable = false;
        self
    }

    /// Make the mute property read-only.
    #[must_use]
    pub fn read_only_mute(mut self) -> Self {
        self.mute_settable = false;
        self
    }

    fn has(&self, property: Property) -> bool {
        match property {
            Property::OutputVolume => self.volume.is_some(),
            Property::OutputMute => self.mute.is_some(),
        }
    }

    fn settable(&self, property: Property) -> bool {
        match property {
            Property::OutputVolume => self.volume_settable,
            Property::OutputMute => self.mute_settable,
        }
    }

    fn value(&self, property: Property) -> Option<PropertyValue> {
        match property {
            Property::OutputVolume => self.volume.map(PropertyValue::Scalar),
            Property::OutputMute => self.mute.map(PropertyValue::Switch),
        }
    }

    /// Store a value, returning whether it changed.
    fn store(&mut self, property: Property, value: PropertyValue) -> DeviceResult<bool> {
        match (property, value) {
            (Property::OutputVolume, PropertyValue::Scalar(raw)) => {
                let raw = raw.clamp(0.0, 1.0);
                let changed = self.volume != Some(raw);
                self.volume = Some(raw);
                Ok(changed)
            }
            (Property::OutputMute, PropertyValue::Switch(raw)) => {
                let changed = self.mute != Some(raw);
                self.mute = Some(raw);
                Ok(changed)
            }
            (property, value) => {
                Err(DeviceError::system(-1, format!("cannot store {value:?} in {property}")))
            }
        }
    }
}

struct Registration {
    device: DeviceId,
    property: Property,
    listener: Listener,
}

#[derive(Default)]
struct MemoryState {
    default_device: Option<DeviceId>,
    devices: HashMap<DeviceId, MemoryDevice>,
    listeners: HashMap<ListenerId, Registration>,
    failing: bool,
}

/// In-memory [`AudioBackend`].
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    next_listener: AtomicU64,
}

impl MemoryBackend {
    /// Id of the device installed by [`MemoryBackend::with_default_device`].
    pub const DEFAULT_DEVICE: DeviceId = DeviceId(0);

    /// A backend without any output device.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose default output is the given device.
    #[must_use]
    pub fn with_default_device(device: MemoryDevice) -> Self {
        let backend = Self::new();
        backend.add_device(Self::DEFAULT_DEVICE, device);
        backend.set_default_device(Some(Self::DEFAULT_DEVICE));
        backend
    }

    /// Install or replace a device.
    pub fn add_device(&self, id: DeviceId, device: MemoryDevice) {
        self.state.lock().devices.insert(id, device);
    }

    /// Change which device is the default output (`None` for no output).
    pub fn set_default_device(&self, id: Option<DeviceId>) {
        self.state.lock().default_device = id;
    }

    /// Make every query and write fail with a system error.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    /// Change the default device's volume from outside, notifying listeners.
    pub fn simulate_volume_change(&self, raw: f32) {
        self.simulate(Property::OutputVolume, PropertyValue::Scalar(raw));
    }

    /// Change the default device's mute flag from outside, notifying listeners.
    pub fn simulate_mute_change(&self, muted: bool) {
        self.simulate(Property::OutputMute, PropertyValue::Switch(u32::from(muted)));
    }

    /// Raw volume of the default device.
    #[must_use]
    pub fn raw_volume(&self) -> Option<f32> {
        let state = self.state.lock();
        state.default_device.and_then(|id| state.devices.get(&id)).and_then(|d| d.volume)
    }

    /// Raw mute switch of the default device.
    #[must_use]
    pub fn raw_mute(&self) -> Option<u32> {
        let state = self.state.lock();
        state.default_device.and_then(|id| state.devices.get(&id)).and_then(|d| d.mute)
    }

    /// Number of registered listeners across all devices.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    fn simulate(&self, property: Property, value: PropertyValue) {
        let changed = {
            let mut state = self.state.lock();
            let Some(id) = state.default_device else {
                debug!(%property, "No default device, ignoring simulated change");
                return;
            };
            match state.devices.get_mut(&id) {
                Some(device) if device.has(property) => {
                    device.store(property, value).ok().filter(|changed| *changed).map(|_| id)
                }
                _ => None,
            }
        };

        if let Some(id) = changed {
            self.notify(id, property);
        }
    }

    /// Invoke listeners for a property with the state lock released.
    fn notify(&self, device: DeviceId, property: Property) {
        let listeners: Vec<Listener> = self
            .state
            .lock()
            .listeners
            .values()
            .filter(|r| r.device == device && r.property == property)
            .map(|r| Arc::clone(&r.listener))
            .collect();

        debug!(%device, %property, count = listeners.len(), "Notifying listeners");
        for listener in listeners {
            listener();
        }
    }

    fn check_failing(state: &MemoryState) -> DeviceResult<()> {
        if state.failing {
            return Err(DeviceError::system(-1, "injected failure"));
        }
        Ok(())
    }
}

impl AudioBackend for MemoryBackend {
    fn default_output_device(&self) -> DeviceResult<DeviceId> {
        let state = self.state.lock();
        Self::check_failing(&state)?;
        state
            .default_device
            .filter(|id| state.devices.contains_key(id))
            .ok_or(DeviceError::DeviceUnavailable)
    }

    fn has_property(&self, device: DeviceId, property: Property) -> bool {
        self.state.lock().devices.get(&device).is_some_and(|d| d.has(property))
    }

    fn is_settable(&self, device: DeviceId, property: Property) -> DeviceResult<bool> {
        let state = self.state.lock();
        Self::check_failing(&state)?;
        let device = state.devices.get(&device).ok_or(DeviceError::DeviceUnavailable)?;
        if !device.has(property) {
            return Err(DeviceError::PropertyUnsupported(property));
        }
        Ok(device.settable(property))
    }

    fn get_property(&self, device: DeviceId, property: Property) -> DeviceResult<PropertyValue> {
        let state = self.state.lock();
        Self::check_failing(&state)?;
        state
            .devices
            .get(&device)
            .ok_or(DeviceError::DeviceUnavailable)?
            .value(property)
            .ok_or(DeviceError::PropertyUnsupported(property))
    }

    fn set_property(
        &self,
        device: DeviceId,
        property: Property,
        value: PropertyValue,
    ) -> DeviceResult<()> {
        let changed = {
            let mut state = self.state.lock();
            Self::check_failing(&state)?;
            let stored = state.devices.get_mut(&device).ok_or(DeviceError::DeviceUnavailable)?;
            if !stored.has(property) {
                return Err(DeviceError::PropertyUnsupported(property));
            }
            if !stored.settable(property) {
                return Err(DeviceError::NotSettable(property));
            }
            stored.store(property, value)?
        };

        if changed {
            self.notify(device, property);
        }
        Ok(())
    }

    fn add_listener(
        &self,
        device: DeviceId,
        property: Property,
        listener: Listener,
    ) -> DeviceResult<ListenerId> {
        let mut state = self.state.lock();
        Self::check_failing(&state)?;
        if !state.devices.contains_key(&device) {
            return Err(DeviceError::DeviceUnavailable);
        }
        let id = ListenerId::new(self.next_listener.fetch_add(1, Ordering::SeqCst));
        state.listeners.insert(id, Registration { device, property, listener });
        Ok(id)
    }

    fn remove_listener(
        &self,
        _device: DeviceId,
        _property: Property,
        id: ListenerId,
    ) -> DeviceResult<()> {
        self.state
            .lock()
            .listeners
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DeviceError::system(-1, format!("unknown listener {}", id.get())))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use assert_matches::assert_matches;

    use super::*;

    fn counting_listener() -> (Arc<AtomicUsize>, Listener) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let listener: Listener = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (count, listener)
    }

    #[test]
    fn test_empty_backend_has_no_default_device() {
        let backend = MemoryBackend::new();
        assert_matches!(backend.default_output_device(), Err(DeviceError::DeviceUnavailable));
    }

    #[test]
    fn test_default_device_must_exist() {
        let backend = MemoryBackend::new();
        backend.set_default_device(Some(DeviceId(3)));
        assert_matches!(backend.default_output_device(), Err(DeviceError::DeviceUnavailable));
    }

    #[test]
    fn test_failing_backend() {
        let backend = MemoryBackend::with_default_device(MemoryDevice::new(0.5, false));
        backend.set_failing(true);
        assert_matches!(backend.default_output_device(), Err(DeviceError::SystemError { .. }));
        backend.set_failing(false);
        assert_eq!(backend.default_output_device().unwrap(), MemoryBackend::DEFAULT_DEVICE);
    }

    #[test]
    fn test_read_only_property_rejects_write() {
        let backend =
            MemoryBackend::with_default_device(MemoryDevice::new(0.5, false).read_only_volume());
        let device = MemoryBackend::DEFAULT_DEVICE;

        assert!(!backend.is_settable(device, Property::OutputVolume).unwrap());
        assert!(backend.is_settable(device, Property::OutputMute).unwrap());
        assert_matches!(
            backend.set_property(device, Property::OutputVolume, PropertyValue::Scalar(0.1)),
            Err(DeviceError::NotSettable(Property::OutputVolume))
        );
        assert_eq!(backend.raw_volume(), Some(0.5));
    }

    #[test]
    fn test_missing_property() {
        let backend = MemoryBackend::with_default_device(MemoryDevice::new(0.5, false).without_mute());
        let device = MemoryBackend::DEFAULT_DEVICE;

        assert!(!backend.has_property(device, Property::OutputMute));
        assert_matches!(
            backend.get_property(device, Property::OutputMute),
            Err(DeviceError::PropertyUnsupported(Property::OutputMute))
        );
    }

    #[test]
    fn test_write_notifies_only_on_change() {
        let backend = MemoryBackend::with_default_device(MemoryDevice::new(0.5, false));
        let device = MemoryBackend::DEFAULT_DEVICE;
        let (count, listener) = counting_listener();
        backend.add_listener(device, Property::OutputMute, listener).unwrap();

        backend.set_property(device, Property::OutputMute, PropertyValue::Switch(1)).unwrap();
        backend.set_property(device, Property::OutputMute, PropertyValue::Switch(1)).unwrap();
        backend.set_property(device, Property::OutputVolume, PropertyValue::Scalar(0.2)).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_simulated_change_notifies_and_removed_listener_is_silent() {
        let backend = MemoryBackend::with_default_device(MemoryDevice::new(0.5, false));
        let device = MemoryBackend::DEFAULT_DEVICE;
        let (count, listener) = counting_listener();
        let id = backend.add_listener(device, Property::OutputVolume, listener).unwrap();

        backend.simulate_volume_change(0.9);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(backend.raw_volume(), Some(0.9));

        backend.remove_listener(device, Property::OutputVolume, id).unwrap();
        backend.simulate_volume_change(0.1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_query_backend() {
        let backend = Arc::new(MemoryBackend::with_default_device(MemoryDevice::new(0.5, false)));
        let seen = Arc::new(Mutex::new(None));

        let inner = Arc::clone(&backend);
        let sink = Arc::clone(&seen);
        let listener: Listener = Arc::new(move || {
            let value = inner.get_property(MemoryBackend::DEFAULT_DEVICE, Property::OutputMute);
            *sink.lock() = value.ok();
        });
        backend.add_listener(MemoryBackend::DEFAULT_DEVICE, Property::OutputMute, listener).unwrap();

        backend.simulate_mute_change(true);
        assert_eq!(*seen.lock(), Some(PropertyValue::Switch(1)));
    }

    #[test]
    fn test_remove_unknown_listener() {
        let backend = MemoryBackend::with_default_device(MemoryDevice::new(0.5, false));
        assert_matches!(
            backend.remove_listener(
                MemoryBackend::DEFAULT_DEVICE,
                Property::OutputVolume,
                ListenerId::new(99)
            ),
            Err(DeviceError::SystemError { .. })
        );
    }
}
