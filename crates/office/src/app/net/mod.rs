mod channel;
mod protocol;
mod sync;
mod transport;

pub(crate) use channel::{ChannelContext, NetworkChannel};
pub(crate) use protocol::OutboundMessage;
pub(crate) use sync::register_handlers;
pub(crate) use transport::TcpLineTransport;

#[cfg(test)]
pub(crate) use transport::memory;
