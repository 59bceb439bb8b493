use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::protocol::{decode_envelope, decode_payload, OutboundMessage, ProtocolError};
use super::transport::{Transport, TransportError, TransportEvent};

#[derive(Debug, Error)]
pub(crate) enum ChannelError {
    #[error("no connection to the server")]
    Offline,
    #[error("connection is not open; dropped '{message_type}'")]
    NotReady { message_type: &'static str },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// State the channel dispatches into.
pub(crate) trait ChannelContext {
    fn on_open(&mut self) {}
    fn on_close(&mut self, _reason: &str) {}
    /// Messages queued by handlers, sent after each dispatch batch.
    fn drain_outbound(&mut self) -> Vec<OutboundMessage>;
}

type Handler<C> = Box<dyn Fn(&mut C, Value) -> Result<(), ProtocolError>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ChannelStats {
    pub(crate) inbound: u64,
    pub(crate) outbound: u64,
    pub(crate) dropped: u64,
}

/// One persistent connection with at most one handler per message type.
pub(crate) struct NetworkChannel<C> {
    transport: Option<Box<dyn Transport>>,
    handlers: HashMap<&'static str, Handler<C>>,
    ready: bool,
    stats: ChannelStats,
    events: Vec<TransportEvent>,
}

impl<C: ChannelContext> NetworkChannel<C> {
    pub(crate) fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport: Some(transport),
            handlers: HashMap::new(),
            ready: false,
            stats: ChannelStats::default(),
            events: Vec::new(),
        }
    }

    /// A channel with no connection; sends fail with `ChannelError::Offline`.
    pub(crate) fn offline() -> Self {
        Self {
            transport: None,
            handlers: HashMap::new(),
            ready: false,
            stats: ChannelStats::default(),
            events: Vec::new(),
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.ready
    }

    pub(crate) fn is_offline(&self) -> bool {
        self.transport.is_none()
    }

    pub(crate) fn stats(&self) -> ChannelStats {
        self.stats
    }

    /// Registers the handler for `message_type`, replacing any previous one.
    pub(crate) fn on<T, F>(&mut self, message_type: &'static str, handler: F)
    where
        T: DeserializeOwned + 'static,
        F: Fn(&mut C, T) + 'static,
    {
        let wrapped: Handler<C> = Box::new(move |ctx, data| {
            let payload = decode_payload::<T>(message_type, data)?;
            handler(ctx, payload);
            Ok(())
        });
        if self.handlers.insert(message_type, wrapped).is_some() {
            debug!(message_type, "message_handler_replaced");
        }
    }

    /// Drains the transport and runs handlers to completion, in arrival order.
    /// Returns the number of messages handled.
    pub(crate) fn poll(&mut self, ctx: &mut C) -> usize {
        let Some(transport) = self.transport.as_mut() else {
            return 0;
        };
        self.events.clear();
        transport.poll(&mut self.events);

        let mut handled = 0usize;
        let events = std::mem::take(&mut self.events);
        for event in &events {
            match event {
                TransportEvent::Opened => {
                    self.ready = true;
                    info!("connection_opened");
                    ctx.on_open();
                }
                TransportEvent::Line(line) => {
                    if self.dispatch(ctx, line) {
                        handled += 1;
                    }
                }
                TransportEvent::Closed { reason } => {
                    self.ready = false;
                    warn!(reason = reason.as_str(), "connection_closed");
                    ctx.on_close(reason);
                }
            }
            self.send_all(ctx.drain_outbound());
        }
        self.events = events;
        handled
    }

    /// Decodes one frame and runs its handler. Unknown types and malformed
    /// frames are dropped.
    pub(crate) fn dispatch(&mut self, ctx: &mut C, line: &str) -> bool {
        self.stats.inbound += 1;
        let envelope = match decode_envelope(line) {
            Ok(envelope) => envelope,
            Err(error) => {
                debug!(error = %error, "message_dropped");
                return false;
            }
        };
        let Some(handler) = self.handlers.get(envelope.message_type.as_str()) else {
            debug!(
                message_type = envelope.message_type.as_str(),
                "message_type_unhandled"
            );
            return false;
        };
        match handler(ctx, envelope.data) {
            Ok(()) => true,
            Err(error) => {
                debug!(error = %error, "message_dropped");
                false
            }
        }
    }

    pub(crate) fn send(&mut self, message: &OutboundMessage) -> Result<(), ChannelError> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(ChannelError::Offline);
        };
        if !self.ready {
            return Err(ChannelError::NotReady {
                message_type: message.message_type(),
            });
        }
        let line = message.encode()?;
        transport.send_line(&line)?;
        self.stats.outbound += 1;
        Ok(())
    }

    /// Sends queued messages; failures are logged and the message dropped.
    pub(crate) fn send_all(&mut self, messages: Vec<OutboundMessage>) {
        for message in messages {
            if let Err(error) = self.send(&message) {
                self.stats.dropped += 1;
                match error {
                    ChannelError::Offline | ChannelError::NotReady { .. } => {
                        debug!(message_type = message.message_type(), error = %error, "message_not_sent");
                    }
                    _ => warn!(message_type = message.message_type(), error = %error, "message_send_failed"),
                }
            }
        }
    }

    pub(crate) fn close(&mut self) {
        if let Some(transport) = self.transport.as_mut() {
            transport.close();
        }
        self.ready = false;
    }
}
