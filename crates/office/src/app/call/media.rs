use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::app::world::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum DeviceError {
    #[error("media capture permission denied")]
    Denied,
    #[error("no media capture device available")]
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum PeerError {
    #[error("peer media sessions are not available on this host")]
    Unavailable,
    #[error("unknown media session {0:?}")]
    UnknownSession(SessionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SessionId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TrackKind {
    Audio,
    Video,
}

/// Handle to a capture or remote track. Clones share the stopped flag.
#[derive(Debug, Clone)]
pub(crate) struct MediaTrack {
    kind: TrackKind,
    stopped: Arc<AtomicBool>,
}

impl MediaTrack {
    pub(crate) fn new(kind: TrackKind) -> Self {
        Self {
            kind,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn kind(&self) -> TrackKind {
        self.kind
    }

    pub(crate) fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MediaStream {
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub(crate) fn new(tracks: Vec<MediaTrack>) -> Self {
        Self { tracks }
    }

    pub(crate) fn audio_video() -> Self {
        Self::new(vec![
            MediaTrack::new(TrackKind::Audio),
            MediaTrack::new(TrackKind::Video),
        ])
    }

    pub(crate) fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub(crate) fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    pub(crate) fn all_stopped(&self) -> bool {
        self.tracks.iter().all(MediaTrack::is_stopped)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum PeerEvent {
    /// The peer asked to open a session with us.
    IncomingCall { session: SessionId, from: PlayerId },
    /// A session produced the remote stream.
    Stream {
        session: SessionId,
        stream: MediaStream,
    },
    Closed { session: SessionId },
}

/// Peer-to-peer media sessions, addressed by player id.
pub(crate) trait PeerLink {
    fn call(&mut self, peer: PlayerId, local: &MediaStream) -> Result<SessionId, PeerError>;
    fn answer(&mut self, session: SessionId, local: &MediaStream) -> Result<(), PeerError>;
    fn close(&mut self, session: SessionId);
    fn poll(&mut self, events: &mut Vec<PeerEvent>);
}

/// Local capture devices.
pub(crate) trait MediaDevices {
    fn acquire(&mut self) -> Result<MediaStream, DeviceError>;
}

/// Host binding for builds without a media stack: capture is unavailable
/// and no session ever opens.
#[derive(Debug, Default)]
pub(crate) struct UnavailableMedia;

impl MediaDevices for UnavailableMedia {
    fn acquire(&mut self) -> Result<MediaStream, DeviceError> {
        Err(DeviceError::Unavailable)
    }
}

impl PeerLink for UnavailableMedia {
    fn call(&mut self, _peer: PlayerId, _local: &MediaStream) -> Result<SessionId, PeerError> {
        Err(PeerError::Unavailable)
    }

    fn answer(&mut self, _session: SessionId, _local: &MediaStream) -> Result<(), PeerError> {
        Err(PeerError::Unavailable)
    }

    fn close(&mut self, _session: SessionId) {}

    fn poll(&mut self, _events: &mut Vec<PeerEvent>) {}
}

#[cfg(test)]
pub(crate) mod scripted {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;

    #[derive(Debug, Default)]
    struct PeerScript {
        next_session: u64,
        calls: Vec<(PlayerId, SessionId)>,
        answered: Vec<SessionId>,
        closed: Vec<SessionId>,
        pending: VecDeque<PeerEvent>,
        fail_calls: bool,
        fail_answers: bool,
    }

    /// Scripted peer link; clones share state.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct ScriptedPeer {
        script: Rc<RefCell<PeerScript>>,
    }

    impl ScriptedPeer {
        pub(crate) fn push(&self, event: PeerEvent) {
            self.script.borrow_mut().pending.push_back(event);
        }

        pub(crate) fn fail_calls(&self) {
            self.script.borrow_mut().fail_calls = true;
        }

        pub(crate) fn fail_answers(&self) {
            self.script.borrow_mut().fail_answers = true;
        }

        pub(crate) fn calls(&self) -> Vec<(PlayerId, SessionId)> {
            self.script.borrow().calls.clone()
        }

        pub(crate) fn answered(&self) -> Vec<SessionId> {
            self.script.borrow().answered.clone()
        }

        pub(crate) fn closed(&self) -> Vec<SessionId> {
            self.script.borrow().closed.clone()
        }
    }

    impl PeerLink for ScriptedPeer {
        fn call(&mut self, peer: PlayerId, _local: &MediaStream) -> Result<SessionId, PeerError> {
            let mut script = self.script.borrow_mut();
            if script.fail_calls {
                return Err(PeerError::Unavailable);
            }
            script.next_session += 1;
            let session = SessionId(script.next_session);
            script.calls.push((peer, session));
            Ok(session)
        }

        fn answer(&mut self, session: SessionId, _local: &MediaStream) -> Result<(), PeerError> {
            let mut script = self.script.borrow_mut();
            if script.fail_answers {
                return Err(PeerError::Unavailable);
            }
            script.answered.push(session);
            Ok(())
        }

        fn close(&mut self, session: SessionId) {
            self.script.borrow_mut().closed.push(session);
        }

        fn poll(&mut self, events: &mut Vec<PeerEvent>) {
            events.extend(self.script.borrow_mut().pending.drain(..));
        }
    }

    /// Capture devices that hand out streams the test can inspect.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct ScriptedDevices {
        issued: Rc<RefCell<Vec<MediaStream>>>,
        denied: Rc<RefCell<bool>>,
    }

    impl ScriptedDevices {
        pub(crate) fn deny(&self) {
            *self.denied.borrow_mut() = true;
        }

        pub(crate) fn issued(&self) -> Vec<MediaStream> {
            self.issued.borrow().clone()
        }
    }

    impl MediaDevices for ScriptedDevices {
        fn acquire(&mut self) -> Result<MediaStream, DeviceError> {
            if *self.denied.borrow() {
                return Err(DeviceError::Denied);
            }
            let stream = MediaStream::audio_video();
            self.issued.borrow_mut().push(stream.clone());
            Ok(stream)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopping_a_stream_stops_every_clone_of_its_tracks() {
        let stream = MediaStream::audio_video();
        let held_elsewhere = stream.clone();

        stream.stop_all();

        assert!(held_elsewhere.all_stopped());
        assert_eq!(held_elsewhere.tracks()[1].kind(), TrackKind::Video);
    }

    #[test]
    fn unavailable_host_refuses_capture_and_sessions() {
        let mut media = UnavailableMedia;
        assert_eq!(media.acquire().err(), Some(DeviceError::Unavailable));
        assert_eq!(
            media.call(PlayerId(1), &MediaStream::default()).err(),
            Some(PeerError::Unavailable)
        );
    }
}
