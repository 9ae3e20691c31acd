//! Owned listener registrations.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::property::{AudioBackend, DeviceId, ListenerId, Property};

/// Listener registrations on one device, removed when dropped.
///
/// A subscription stays bound to the device that was the default output at
/// subscribe time, even if the default changes later.
pub struct Subscription {
    backend: Arc<dyn AudioBackend>,
    device: DeviceId,
    registrations: Vec<(Property, ListenerId)>,
}

impl Subscription {
    pub(crate) fn new(backend: Arc<dyn AudioBackend>, device: DeviceId) -> Self {
        Self { backend, device, registrations: Vec::new() }
    }

    pub(crate) fn push(&mut self, property: Property, id: ListenerId) {
        self.registrations.push((property, id));
    }

    /// The device the listeners are registered on.
    #[must_use]
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Whether a listener is registered for the property.
    #[must_use]
    pub fn watches(&self, property: Property) -> bool {
        self.registrations.iter().any(|(p, _)| *p == property)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether no listener could be registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for (property, id) in self.registrations.drain(..) {
            match self.backend.remove_listener(self.device, property, id) {
                Ok(()) => debug!(device = %self.device, %property, id = id.get(), "Listener removed"),
                Err(e) => warn!(
                    device = %self.device,
                    %property,
                    id = id.get(),
                    error = %e,
                    "Failed to remove listener"
                ),
            }
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("device", &self.device)
            .field("registrations", &self.registrations)
            .finish_non_exhaustive()
    }
}
