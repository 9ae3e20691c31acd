//! Dial state bridge.
//!
//! Keeps one [`DialState`] per visible dial, turns gestures into controller
//! calls, listens for output device changes, and pushes rendered feedback to
//! every active dial.
//!
//! Lock discipline: the instance registry is never held while calling the
//! controller or the sink. Backends may invoke change listeners synchronously
//! from a write, and those listeners take the registry lock.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use sdvolume_core::{Coordinates, DialEvent, DialState, Feedback, FeedbackStyle};
use sdvolume_device::{Subscription, VolumeController};
use sdvolume_protocol::{INDICATOR_LAYOUT, OutboundSender};
use tracing::{debug, info, warn};

/// Destination for rendered dial feedback.
pub trait FeedbackSink: Send + Sync {
    /// Show a payload on one dial.
    fn set_feedback(&self, context: &str, feedback: &Feedback);
    /// Select the touch display layout of one dial.
    fn set_layout(&self, context: &str, layout: &str);
}

impl FeedbackSink for OutboundSender {
    fn set_feedback(&self, context: &str, feedback: &Feedback) {
        if let Err(e) = OutboundSender::set_feedback(self, context, feedback) {
            warn!(context, error = %e, "Failed to queue feedback");
        }
    }

    fn set_layout(&self, context: &str, layout: &str) {
        if let Err(e) = self.set_feedback_layout(context, layout) {
            warn!(context, error = %e, "Failed to queue feedback layout");
        }
    }
}

/// An active dial and the listeners registered on its behalf.
struct DialInstance {
    state: DialState,
    subscription: Option<Subscription>,
}

struct BridgeInner {
    controller: VolumeController,
    sink: Arc<dyn FeedbackSink>,
    style: FeedbackStyle,
    instances: RwLock<HashMap<String, DialInstance>>,
}

/// Shared handle to the dial registry.
#[derive(Clone)]
pub struct DialBridge {
    inner: Arc<BridgeInner>,
}

impl DialBridge {
    #[must_use]
    pub fn new(controller: VolumeController, sink: Arc<dyn FeedbackSink>, style: FeedbackStyle) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                controller,
                sink,
                style,
                instances: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Apply one event to the dial identified by `context`.
    pub fn handle(&self, context: &str, event: DialEvent) {
        debug!(context, event = event.name(), "Dial event");
        match event {
            DialEvent::Activate { coordinates } => self.activate(context, coordinates),
            DialEvent::Rotate { ticks } => self.rotate(context, ticks),
            DialEvent::Press { pressed: true } | DialEvent::Tap => self.toggle_mute(context),
            DialEvent::Press { pressed: false } => {}
            DialEvent::Deactivate => self.deactivate(context),
        }
    }

    /// Start tracking a dial: listen for changes, read the device, and show it.
    ///
    /// The dial is registered before its listeners so a change reported while
    /// activating is applied, not dropped. Re-activating a context replaces
    /// its instance; the old listeners are released before new ones are
    /// registered.
    pub fn activate(&self, context: &str, coordinates: Option<Coordinates>) {
        if let Some(previous) = self.remove(context) {
            debug!(context, "Replacing active dial");
            drop(previous);
        }

        self.inner.instances.write().insert(
            context.to_string(),
            DialInstance { state: DialState::new(context, coordinates), subscription: None },
        );
        self.inner.sink.set_layout(context, INDICATOR_LAYOUT);

        let subscription = self.subscribe(context);
        let listeners = self.attach(context, subscription);

        let controller = &self.inner.controller;
        let level = controller.get_volume();
        let muted = controller.get_mute();
        let Some(state) = self.update(context, |state| {
            state.level = level;
            state.muted = muted;
        }) else {
            return;
        };

        info!(context, level = ?state.level, muted = ?state.muted, listeners, "Dial activated");
        self.broadcast(&state);
    }

    /// Adjust the volume by `ticks` and show the result.
    pub fn rotate(&self, context: &str, ticks: i32) {
        if !self.is_active(context) {
            warn!(context, ticks, "Rotate on inactive dial ignored");
            return;
        }

        let controller = &self.inner.controller;
        if !controller.change_volume(ticks) {
            debug!(context, ticks, "Volume change not applied");
        }

        let level = controller.get_volume();
        let muted = controller.get_mute();
        if let Some(state) = self.update(context, |state| {
            state.level = level;
            state.muted = muted;
        }) {
            self.broadcast(&state);
        }
    }

    /// Flip the cached mute flag (unknown counts as unmuted) and show the result.
    pub fn toggle_mute(&self, context: &str) {
        let Some(current) = self.state(context) else {
            warn!(context, "Mute toggle on inactive dial ignored");
            return;
        };

        let controller = &self.inner.controller;
        let target = current.toggled_mute();
        if !controller.set_mute(target) {
            debug!(context, muted = target, "Mute change not applied");
        }

        let muted = controller.get_mute();
        if let Some(state) = self.update(context, |state| state.muted = muted) {
            self.broadcast(&state);
        }
    }

    /// Stop tracking a dial and release its listeners.
    pub fn deactivate(&self, context: &str) {
        match self.remove(context) {
            Some(instance) => {
                drop(instance);
                info!(context, "Dial deactivated");
            }
            None => debug!(context, "Deactivate for unknown dial"),
        }
    }

    /// Deactivate every dial.
    pub fn clear(&self) {
        let instances: Vec<DialInstance> =
            self.inner.instances.write().drain().map(|(_, instance)| instance).collect();
        debug!(count = instances.len(), "Clearing dials");
        drop(instances);
    }

    /// Cached state of a dial, if it is active.
    #[must_use]
    pub fn state(&self, context: &str) -> Option<DialState> {
        self.inner.instances.read().get(context).map(|instance| instance.state.clone())
    }

    #[must_use]
    pub fn is_active(&self, context: &str) -> bool {
        self.inner.instances.read().contains_key(context)
    }

    /// Number of active dials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.instances.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn refresh_volume(&self, context: &str) {
        if !self.is_active(context) {
            return;
        }
        let level = self.inner.controller.get_volume();
        debug!(context, ?level, "Output volume changed");
        if let Some(state) = self.update(context, |state| state.level = level) {
            self.broadcast(&state);
        }
    }

    fn refresh_mute(&self, context: &str) {
        if !self.is_active(context) {
            return;
        }
        let muted = self.inner.controller.get_mute();
        debug!(context, ?muted, "Output mute changed");
        if let Some(state) = self.update(context, |state| state.muted = muted) {
            self.broadcast(&state);
        }
    }

    /// Register device listeners that refresh `context`.
    fn subscribe(&self, context: &str) -> Option<Subscription> {
        let on_volume = self.listener(context, Self::refresh_volume);
        let on_mute = self.listener(context, Self::refresh_mute);

        match self.inner.controller.subscribe(on_volume, on_mute) {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                warn!(context, error = %e, "Could not listen for output device changes");
                None
            }
        }
    }

    /// Listeners hold the bridge weakly so a dropped bridge is not kept alive.
    fn listener(
        &self,
        context: &str,
        refresh: fn(&Self, &str),
    ) -> impl Fn() + Send + Sync + use<> {
        let inner: Weak<BridgeInner> = Arc::downgrade(&self.inner);
        let context = context.to_string();
        move || {
            if let Some(inner) = inner.upgrade() {
                refresh(&Self { inner }, &context);
            }
        }
    }

    /// Hand a subscription to its dial. Returns the number of listeners kept.
    fn attach(&self, context: &str, subscription: Option<Subscription>) -> usize {
        let mut instances = self.inner.instances.write();
        if let Some(instance) = instances.get_mut(context) {
            instance.subscription = subscription;
            return instance.subscription.as_ref().map_or(0, Subscription::len);
        }
        drop(instances);

        // Dial went away meanwhile; listeners are removed outside the lock
        debug!(context, "Discarding listeners of inactive dial");
        drop(subscription);
        0
    }

    fn update(&self, context: &str, apply: impl FnOnce(&mut DialState)) -> Option<DialState> {
        let mut instances = self.inner.instances.write();
        let Some(instance) = instances.get_mut(context) else {
            debug!(context, "Update for inactive dial ignored");
            return None;
        };
        apply(&mut instance.state);
        Some(instance.state.clone())
    }

    fn remove(&self, context: &str) -> Option<DialInstance> {
        self.inner.instances.write().remove(context)
    }

    /// Render `state` and send it to every active dial.
    fn broadcast(&self, state: &DialState) {
        let feedback = Feedback::render(state, &self.inner.style);
        let contexts: Vec<String> = self.inner.instances.read().keys().cloned().collect();
        for context in &contexts {
            self.inner.sink.set_feedback(context, &feedback);
        }
    }
}
