//! Host WebSocket client.

use futures::{SinkExt, StreamExt};
use sdvolume_core::Feedback;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::{ProtocolError, ProtocolResult};
use crate::events::OutboundMessage;
use crate::messages::InboundEvent;
use crate::registration::Registration;

/// Cloneable handle for queueing messages to the host.
///
/// Sending never blocks; messages are written by the connection's writer
/// task in the order they were queued.
#[derive(Debug, Clone)]
pub struct OutboundSender {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl OutboundSender {
    /// A sender paired with the receiving end of its queue.
    #[must_use]
    pub fn unbounded() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a message.
    ///
    /// # Errors
    /// Returns [`ProtocolError::ChannelClosed`] once the connection is gone.
    pub fn send(&self, message: OutboundMessage) -> ProtocolResult<()> {
        self.tx.send(message).map_err(|_| ProtocolError::ChannelClosed)
    }

    /// Queue a `setFeedback` for one context.
    ///
    /// # Errors
    /// Returns [`ProtocolError::ChannelClosed`] once the connection is gone.
    pub fn set_feedback(&self, context: &str, feedback: &Feedback) -> ProtocolResult<()> {
        self.send(OutboundMessage::set_feedback(context, feedback.clone()))
    }

    /// Queue a `setFeedbackLayout` for one context.
    ///
    /// # Errors
    /// Returns [`ProtocolError::ChannelClosed`] once the connection is gone.
    pub fn set_feedback_layout(&self, context: &str, layout: &str) -> ProtocolResult<()> {
        self.send(OutboundMessage::set_feedback_layout(context, layout))
    }

    /// Queue a line for the host's plugin log.
    ///
    /// # Errors
    /// Returns [`ProtocolError::ChannelClosed`] once the connection is gone.
    pub fn log_message(&self, message: impl Into<String>) -> ProtocolResult<()> {
        self.send(OutboundMessage::log_message(message))
    }
}

/// Connection to the host.
#[derive(Debug)]
pub struct PluginClient {
    sender: OutboundSender,
    event_rx: mpsc::Receiver<InboundEvent>,
}

impl PluginClient {
    /// Connect to the host and register the plugin.
    ///
    /// # Errors
    /// Returns an error if the registration is invalid, the connection fails,
    /// or the registration message cannot be sent.
    pub async fn connect(registration: &Registration) -> ProtocolResult<Self> {
        registration.validate()?;

        let url = registration.url();
        let (stream, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
        let (mut sink, mut source) = stream.split();

        let register = serde_json::to_string(&registration.register_message())?;
        sink.send(Message::Text(register)).await?;
        info!(%url, uuid = %registration.plugin_uuid, "Registered with host");

        let (event_tx, event_rx) = mpsc::channel(64);
        let (sender, mut outbound_rx) = OutboundSender::unbounded();

        // Spawn writer task
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        error!(error = %e, "Failed to serialize outbound message");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(json)).await {
                    error!(error = %e, "Write error");
                    break;
                }
            }
            let _ = sink.close().await;
            debug!("Writer task finished");
        });

        // Spawn reader task
        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<InboundEvent>(&text) {
                        Ok(event) => {
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "Unparseable host message"),
                    },
                    Ok(Message::Close(_)) => {
                        debug!("Host closed connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "Read error");
                        break;
                    }
                }
            }
            debug!("Reader task finished");
        });

        Ok(Self { sender, event_rx })
    }

    /// Handle for sending messages to the host.
    #[must_use]
    pub fn sender(&self) -> OutboundSender {
        self.sender.clone()
    }

    /// Get the event receiver for incoming events.
    ///
    /// Yields `None` once the host has closed the connection.
    pub fn events(&mut self) -> &mut mpsc::Receiver<InboundEvent> {
        &mut self.event_rx
    }
}
