//! Outbound messages (plugin to host).

use sdvolume_core::Feedback;
use serde::{Deserialize, Serialize};

/// First message on the socket, identifying the plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterMessage {
    /// Value of the `-registerEvent` launch argument
    pub event: String,
    /// Value of the `-pluginUUID` launch argument
    pub uuid: String,
}

/// Message sent to the host after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum OutboundMessage {
    /// Update the touch display of one action instance
    SetFeedback { context: String, payload: Feedback },
    /// Select the touch display layout of one action instance
    SetFeedbackLayout { context: String, payload: LayoutPayload },
    /// Write a line to the host's plugin log
    LogMessage { payload: LogPayload },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutPayload {
    pub layout: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPayload {
    pub message: String,
}

impl OutboundMessage {
    #[must_use]
    pub fn set_feedback(context: impl Into<String>, feedback: Feedback) -> Self {
        Self::SetFeedback { context: context.into(), payload: feedback }
    }

    #[must_use]
    pub fn set_feedback_layout(context: impl Into<String>, layout: impl Into<String>) -> Self {
        Self::SetFeedbackLayout {
            context: context.into(),
            payload: LayoutPayload { layout: layout.into() },
        }
    }

    #[must_use]
    pub fn log_message(message: impl Into<String>) -> Self {
        Self::LogMessage { payload: LogPayload { message: message.into() } }
    }
}

#[cfg(test)]
mod tests {
    use sdvolume_core::Indicator;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_set_feedback_shape() {
        let feedback = Feedback {
            title: "System Volume".to_string(),
            value: "42".to_string(),
            icon: "assets/on.svg".to_string(),
            indicator: Indicator { value: 42, enabled: true },
        };

        let value = serde_json::to_value(OutboundMessage::set_feedback("ctx", feedback)).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "setFeedback",
                "context": "ctx",
                "payload": {
                    "title": "System Volume",
                    "value": "42",
                    "icon": "assets/on.svg",
                    "indicator": { "value": 42, "enabled": true }
                }
            })
        );
    }

    #[test]
    fn test_layout_and_log_shape() {
        let layout = serde_json::to_value(OutboundMessage::set_feedback_layout("ctx", "$B1")).unwrap();
        assert_eq!(
            layout,
            json!({ "event": "setFeedbackLayout", "context": "ctx", "payload": { "layout": "$B1" } })
        );

        let log = serde_json::to_value(OutboundMessage::log_message("hello")).unwrap();
        assert_eq!(log, json!({ "event": "logMessage", "payload": { "message": "hello" } }));
    }

    #[test]
    fn test_register_shape() {
        let register = RegisterMessage { event: "registerPlugin".to_string(), uuid: "ABC".to_string() };
        assert_eq!(
            serde_json::to_value(register).unwrap(),
            json!({ "event": "registerPlugin", "uuid": "ABC" })
        );
    }
}
