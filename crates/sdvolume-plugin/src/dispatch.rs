//! Routing of host events to the dial bridge.

use sdvolume_protocol::InboundEvent;
use tracing::debug;

use crate::bridge::DialBridge;

/// Apply one host event. Events without a dial meaning are dropped.
pub fn dispatch(bridge: &DialBridge, event: InboundEvent) {
    let context = event.context().map(str::to_owned);
    match event.into_dial_event() {
        Some((context, dial_event)) => bridge.handle(&context, dial_event),
        None => debug!(?context, "Ignoring host event"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sdvolume_core::FeedbackStyle;
    use sdvolume_device::{MemoryBackend, MemoryDevice, VolumeController};
    use sdvolume_protocol::{OutboundMessage, OutboundSender};

    use super::*;

    fn event(json: &str) -> InboundEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_host_session() {
        let backend = Arc::new(MemoryBackend::with_default_device(MemoryDevice::new(0.2, false)));
        let (sender, mut rx) = OutboundSender::unbounded();
        let bridge = DialBridge::new(
            VolumeController::new(backend.clone()),
            Arc::new(sender),
            FeedbackStyle::default(),
        );

        dispatch(
            &bridge,
            event(r#"{"event":"willAppear","context":"c1","payload":{"coordinates":{"column":0,"row":0}}}"#),
        );
        assert_eq!(rx.try_recv().unwrap(), OutboundMessage::set_feedback_layout("c1", "$B1"));
        assert!(rx.try_recv().is_ok());

        dispatch(&bridge, event(r#"{"event":"dialRotate","context":"c1","payload":{"ticks":3}}"#));
        assert_eq!(backend.raw_volume().map(sdvolume_core::from_system), Some(23));

        dispatch(&bridge, event(r#"{"event":"touchTap","context":"c1","payload":{}}"#));
        assert_eq!(backend.raw_mute(), Some(1));

        dispatch(&bridge, event(r#"{"event":"systemDidWakeUp"}"#));
        assert!(bridge.is_active("c1"));

        dispatch(
            &bridge,
            event(r#"{"event":"willAppear","context":"k1","payload":{"controller":"Keypad"}}"#),
        );
        assert!(!bridge.is_active("k1"));

        dispatch(&bridge, event(r#"{"event":"willDisappear","context":"c1","payload":{}}"#));
        assert!(bridge.is_empty());
        assert_eq!(backend.listener_count(), 0);
    }
}
