mod media;
mod negotiation;

pub(crate) use media::UnavailableMedia;
pub(crate) use negotiation::{CallNegotiator, CallNotice, CallState};

#[cfg(test)]
pub(crate) use media::{scripted, MediaStream, PeerEvent, SessionId};
