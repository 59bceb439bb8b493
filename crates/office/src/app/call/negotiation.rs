use std::time::Duration;

use tracing::{debug, info, warn};

use super::media::{MediaDevices, MediaStream, PeerEvent, PeerLink, SessionId};
use crate::app::net::OutboundMessage;
use crate::app::world::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallState {
    Idle,
    /// We asked `target`; waiting for their answer.
    ConsentRequested { target: PlayerId, deadline: Duration },
    /// `caller` asked us; `accepted` once the user said yes and we are
    /// waiting for their media session.
    ConsentPending {
        caller: PlayerId,
        accepted: bool,
        deadline: Duration,
    },
    /// Both sides agreed and a media session is open, no remote stream yet.
    Consented {
        peer: PlayerId,
        session: SessionId,
        deadline: Duration,
    },
    Active { peer: PlayerId, session: SessionId },
}

/// User-facing outcomes, drained by the HUD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CallNotice {
    Requested(PlayerId),
    Incoming(PlayerId),
    Declined(PlayerId),
    Busy(PlayerId),
    TimedOut,
    DeviceFailed(String),
    Connected(PlayerId),
    Ended,
}

/// Consent handshake over the game channel, then one media session.
///
/// Every transition back to `Idle` goes through `teardown`, which stops
/// all local and remote tracks and closes every open session.
pub(crate) struct CallNegotiator {
    state: CallState,
    local_consent: bool,
    remote_consent: bool,
    connections: Vec<SessionId>,
    local_stream: Option<MediaStream>,
    remote_stream: Option<MediaStream>,
    clock: Duration,
    timeout: Duration,
    peer: Box<dyn PeerLink>,
    devices: Box<dyn MediaDevices>,
    notices: Vec<CallNotice>,
    peer_events: Vec<PeerEvent>,
}

impl CallNegotiator {
    pub(crate) fn new(
        peer: Box<dyn PeerLink>,
        devices: Box<dyn MediaDevices>,
        timeout: Duration,
    ) -> Self {
        Self {
            state: CallState::Idle,
            local_consent: false,
            remote_consent: false,
            connections: Vec::new(),
            local_stream: None,
            remote_stream: None,
            clock: Duration::ZERO,
            timeout,
            peer,
            devices,
            notices: Vec::new(),
            peer_events: Vec::new(),
        }
    }

    pub(crate) fn state(&self) -> CallState {
        self.state
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.state == CallState::Idle
    }

    pub(crate) fn on_call(&self) -> bool {
        matches!(self.state, CallState::Active { .. })
    }

    pub(crate) fn remote_stream(&self) -> Option<&MediaStream> {
        self.remote_stream.as_ref()
    }

    pub(crate) fn connections(&self) -> &[SessionId] {
        &self.connections
    }

    pub(crate) fn local_consent(&self) -> bool {
        self.local_consent
    }

    pub(crate) fn remote_consent(&self) -> bool {
        self.remote_consent
    }

    pub(crate) fn take_notices(&mut self) -> Vec<CallNotice> {
        std::mem::take(&mut self.notices)
    }

    /// Asks `target` for consent. Ignored unless idle with a callable target.
    pub(crate) fn request_call(
        &mut self,
        target: Option<PlayerId>,
        outbox: &mut Vec<OutboundMessage>,
    ) -> bool {
        let Some(target) = target else {
            debug!("call_request_without_target");
            return false;
        };
        if !self.is_idle() {
            debug!(state = ?self.state, "call_request_while_busy");
            return false;
        }
        outbox.push(OutboundMessage::CallConsentReq { id: target });
        self.state = CallState::ConsentRequested {
            target,
            deadline: self.clock + self.timeout,
        };
        self.notices.push(CallNotice::Requested(target));
        info!(target = %target, "call_consent_requested");
        true
    }

    /// Inbound `callConsentReq`. A request while not idle is answered `false`.
    pub(crate) fn receive_request(&mut self, caller: PlayerId, outbox: &mut Vec<OutboundMessage>) {
        if !self.is_idle() {
            outbox.push(OutboundMessage::CallConsentAns {
                id: caller,
                answer: false,
            });
            self.notices.push(CallNotice::Busy(caller));
            info!(caller = %caller, state = ?self.state, "call_request_rejected_busy");
            return;
        }
        self.remote_consent = true;
        self.state = CallState::ConsentPending {
            caller,
            accepted: false,
            deadline: self.clock + self.timeout,
        };
        self.notices.push(CallNotice::Incoming(caller));
        info!(caller = %caller, "call_consent_pending");
    }

    pub(crate) fn accept(&mut self, outbox: &mut Vec<OutboundMessage>) -> bool {
        let CallState::ConsentPending {
            caller,
            accepted: false,
            ..
        } = self.state
        else {
            return false;
        };
        outbox.push(OutboundMessage::CallConsentAns {
            id: caller,
            answer: true,
        });
        self.local_consent = true;
        self.state = CallState::ConsentPending {
            caller,
            accepted: true,
            deadline: self.clock + self.timeout,
        };
        info!(caller = %caller, "call_consent_given");
        true
    }

    pub(crate) fn reject(&mut self, outbox: &mut Vec<OutboundMessage>) -> bool {
        let CallState::ConsentPending {
            caller,
            accepted: false,
            ..
        } = self.state
        else {
            return false;
        };
        outbox.push(OutboundMessage::CallConsentAns {
            id: caller,
            answer: false,
        });
        info!(caller = %caller, "call_consent_refused");
        self.teardown();
        true
    }

    /// Inbound `callConsentAns`. Only an answer from the player we asked counts.
    pub(crate) fn receive_answer(&mut self, from: PlayerId, answer: bool) {
        let CallState::ConsentRequested { target, .. } = self.state else {
            debug!(from = %from, answer, state = ?self.state, "call_answer_ignored");
            return;
        };
        if target != from {
            debug!(from = %from, target = %target, "call_answer_from_other_player");
            return;
        }
        if !answer {
            info!(target = %target, "call_declined");
            self.notices.push(CallNotice::Declined(target));
            self.teardown();
            return;
        }

        self.remote_consent = true;
        let Some(local) = self.acquire_capture() else {
            return;
        };
        match self.peer.call(target, &local) {
            Ok(session) => {
                self.connections.push(session);
                self.state = CallState::Consented {
                    peer: target,
                    session,
                    deadline: self.clock + self.timeout,
                };
                info!(target = %target, session = session.0, "call_session_started");
            }
            Err(error) => {
                warn!(target = %target, error = %error, "call_session_start_failed");
                self.notices.push(CallNotice::DeviceFailed(error.to_string()));
                self.teardown();
            }
        }
    }

    /// Hangs up or cancels whatever is in progress.
    pub(crate) fn hang_up(&mut self, outbox: &mut Vec<OutboundMessage>) -> bool {
        match self.state {
            CallState::Idle => false,
            CallState::ConsentPending {
                accepted: false, ..
            } => self.reject(outbox),
            _ => {
                info!(state = ?self.state, "call_hung_up");
                self.notices.push(CallNotice::Ended);
                self.teardown();
                true
            }
        }
    }

    /// Advances the negotiation clock and drains peer events.
    pub(crate) fn tick(&mut self, delta: Duration, outbox: &mut Vec<OutboundMessage>) {
        self.clock += delta;

        let mut events = std::mem::take(&mut self.peer_events);
        self.peer.poll(&mut events);
        for event in events.drain(..) {
            self.handle_peer_event(event);
        }
        self.peer_events = events;

        let deadline = match self.state {
            CallState::ConsentRequested { deadline, .. }
            | CallState::ConsentPending { deadline, .. }
            | CallState::Consented { deadline, .. } => deadline,
            CallState::Idle | CallState::Active { .. } => return,
        };
        if self.clock < deadline {
            return;
        }
        if let CallState::ConsentPending {
            caller,
            accepted: false,
            ..
        } = self.state
        {
            outbox.push(OutboundMessage::CallConsentAns {
                id: caller,
                answer: false,
            });
        }
        info!(state = ?self.state, "call_negotiation_timed_out");
        self.notices.push(CallNotice::TimedOut);
        self.teardown();
    }

    pub(crate) fn handle_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::IncomingCall { session, from } => self.answer_incoming(session, from),
            PeerEvent::Stream { session, stream } => {
                let CallState::Consented { peer, session: expected, .. } = self.state else {
                    debug!(session = session.0, "peer_stream_unexpected");
                    stream.stop_all();
                    return;
                };
                if expected != session {
                    debug!(session = session.0, "peer_stream_for_other_session");
                    stream.stop_all();
                    return;
                }
                self.remote_stream = Some(stream);
                self.state = CallState::Active { peer, session };
                self.notices.push(CallNotice::Connected(peer));
                info!(peer = %peer, session = session.0, "call_active");
            }
            PeerEvent::Closed { session } => {
                if !self.connections.contains(&session) {
                    debug!(session = session.0, "peer_close_for_unknown_session");
                    return;
                }
                self.connections.retain(|open| *open != session);
                info!(session = session.0, "call_closed_by_peer");
                self.notices.push(CallNotice::Ended);
                self.teardown();
            }
        }
    }

    /// Releases everything on exit.
    pub(crate) fn shutdown(&mut self) {
        if !self.is_idle() || self.local_stream.is_some() {
            self.teardown();
        }
    }

    fn answer_incoming(&mut self, session: SessionId, from: PlayerId) {
        let expected = matches!(
            self.state,
            CallState::ConsentPending { caller, accepted: true, .. } if caller == from
        );
        if !expected || !self.local_consent || !self.remote_consent {
            debug!(from = %from, session = session.0, "peer_call_without_consent");
            self.peer.close(session);
            return;
        }
        // One-shot: a replayed session request must not be answered again.
        self.local_consent = false;

        let Some(local) = self.acquire_capture() else {
            self.peer.close(session);
            return;
        };
        self.connections.push(session);
        match self.peer.answer(session, &local) {
            Ok(()) => {
                self.state = CallState::Consented {
                    peer: from,
                    session,
                    deadline: self.clock + self.timeout,
                };
                info!(caller = %from, session = session.0, "call_session_answered");
            }
            Err(error) => {
                warn!(caller = %from, error = %error, "call_session_answer_failed");
                self.notices.push(CallNotice::DeviceFailed(error.to_string()));
                self.teardown();
            }
        }
    }

    fn acquire_capture(&mut self) -> Option<MediaStream> {
        match self.devices.acquire() {
            Ok(stream) => {
                self.local_stream = Some(stream.clone());
                Some(stream)
            }
            Err(error) => {
                warn!(error = %error, "media_capture_failed");
                self.notices.push(CallNotice::DeviceFailed(error.to_string()));
                self.teardown();
                None
            }
        }
    }

    fn teardown(&mut self) {
        if let Some(local) = self.local_stream.take() {
            local.stop_all();
        }
        if let Some(remote) = self.remote_stream.take() {
            remote.stop_all();
        }
        for session in self.connections.drain(..) {
            self.peer.close(session);
        }
        self.local_consent = false;
        self.remote_consent = false;
        if self.state != CallState::Idle {
            debug!(from = ?self.state, "call_state_idle");
        }
        self.state = CallState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::super::media::scripted::{ScriptedDevices, ScriptedPeer};
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(30);
    const TICK: Duration = Duration::from_millis(16);

    struct Harness {
        negotiator: CallNegotiator,
        peer: ScriptedPeer,
        devices: ScriptedDevices,
        outbox: Vec<OutboundMessage>,
    }

    fn harness() -> Harness {
        let peer = ScriptedPeer::default();
        let devices = ScriptedDevices::default();
        Harness {
            negotiator: CallNegotiator::new(
                Box::new(peer.clone()),
                Box::new(devices.clone()),
                TIMEOUT,
            ),
            peer,
            devices,
            outbox: Vec::new(),
        }
    }

    fn active_outbound_call(h: &mut Harness) -> SessionId {
        h.negotiator.request_call(Some(PlayerId(2)), &mut h.outbox);
        h.negotiator.receive_answer(PlayerId(2), true);
        let (_, session) = h.peer.calls()[0];
        h.peer.push(PeerEvent::Stream {
            session,
            stream: MediaStream::audio_video(),
        });
        h.negotiator.tick(TICK, &mut h.outbox);
        session
    }

    #[test]
    fn request_requires_a_target() {
        let mut h = harness();
        assert!(!h.negotiator.request_call(None, &mut h.outbox));
        assert!(h.outbox.is_empty());

        assert!(h.negotiator.request_call(Some(PlayerId(2)), &mut h.outbox));
        assert_eq!(
            h.outbox,
            vec![OutboundMessage::CallConsentReq { id: PlayerId(2) }]
        );
        assert!(matches!(
            h.negotiator.state(),
            CallState::ConsentRequested { target: PlayerId(2), .. }
        ));
    }

    #[test]
    fn negative_answer_from_idle_never_consents() {
        let mut h = harness();
        h.negotiator.receive_answer(PlayerId(2), false);
        assert_eq!(h.negotiator.state(), CallState::Idle);

        h.negotiator.receive_answer(PlayerId(2), true);
        assert_eq!(h.negotiator.state(), CallState::Idle);
        assert!(h.peer.calls().is_empty());
        assert!(h.devices.issued().is_empty());
    }

    #[test]
    fn declined_request_returns_to_idle() {
        let mut h = harness();
        h.negotiator.request_call(Some(PlayerId(2)), &mut h.outbox);
        h.negotiator.receive_answer(PlayerId(2), false);

        assert_eq!(h.negotiator.state(), CallState::Idle);
        assert!(h
            .negotiator
            .take_notices()
            .contains(&CallNotice::Declined(PlayerId(2))));
    }

    #[test]
    fn answer_from_a_different_player_is_ignored() {
        let mut h = harness();
        h.negotiator.request_call(Some(PlayerId(2)), &mut h.outbox);
        h.negotiator.receive_answer(PlayerId(3), true);

        assert!(matches!(
            h.negotiator.state(),
            CallState::ConsentRequested { .. }
        ));
    }

    #[test]
    fn accepted_request_captures_media_and_opens_session() {
        let mut h = harness();
        h.negotiator.request_call(Some(PlayerId(2)), &mut h.outbox);
        h.negotiator.receive_answer(PlayerId(2), true);

        assert_eq!(h.devices.issued().len(), 1);
        let calls = h.peer.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, PlayerId(2));
        assert!(matches!(
            h.negotiator.state(),
            CallState::Consented { peer: PlayerId(2), .. }
        ));
    }

    #[test]
    fn remote_stream_activates_call() {
        let mut h = harness();
        active_outbound_call(&mut h);

        assert!(h.negotiator.on_call());
        assert!(h.negotiator.remote_stream().is_some());
    }

    #[test]
    fn local_hang_up_from_active_releases_everything() {
        let mut h = harness();
        let session = active_outbound_call(&mut h);
        let remote = h.negotiator.remote_stream().cloned().expect("remote stream");

        assert!(h.negotiator.hang_up(&mut h.outbox));

        assert_eq!(h.negotiator.state(), CallState::Idle);
        assert!(h.negotiator.remote_stream().is_none());
        assert!(h.negotiator.connections().is_empty());
        assert!(remote.all_stopped());
        assert!(h.devices.issued().iter().all(MediaStream::all_stopped));
        assert_eq!(h.peer.closed(), vec![session]);
    }

    #[test]
    fn remote_close_from_active_releases_everything() {
        let mut h = harness();
        let session = active_outbound_call(&mut h);
        let remote = h.negotiator.remote_stream().cloned().expect("remote stream");

        h.peer.push(PeerEvent::Closed { session });
        h.negotiator.tick(TICK, &mut h.outbox);

        assert_eq!(h.negotiator.state(), CallState::Idle);
        assert!(h.negotiator.remote_stream().is_none());
        assert!(remote.all_stopped());
        assert!(h.devices.issued().iter().all(MediaStream::all_stopped));
        assert!(!h.negotiator.local_consent());
        assert!(!h.negotiator.remote_consent());
    }

    #[test]
    fn denied_capture_returns_to_idle_instead_of_sticking() {
        let mut h = harness();
        h.devices.deny();
        h.negotiator.request_call(Some(PlayerId(2)), &mut h.outbox);
        h.negotiator.receive_answer(PlayerId(2), true);

        assert_eq!(h.negotiator.state(), CallState::Idle);
        assert!(h.peer.calls().is_empty());
        assert!(matches!(
            h.negotiator.take_notices().last(),
            Some(CallNotice::DeviceFailed(_))
        ));
    }

    #[test]
    fn failed_session_start_releases_capture() {
        let mut h = harness();
        h.peer.fail_calls();
        h.negotiator.request_call(Some(PlayerId(2)), &mut h.outbox);
        h.negotiator.receive_answer(PlayerId(2), true);

        assert_eq!(h.negotiator.state(), CallState::Idle);
        assert!(h.devices.issued().iter().all(MediaStream::all_stopped));
    }

    #[test]
    fn callee_accepts_then_answers_peer_session_once() {
        let mut h = harness();
        h.negotiator.receive_request(PlayerId(5), &mut h.outbox);
        assert!(h.negotiator.accept(&mut h.outbox));
        assert_eq!(
            h.outbox,
            vec![OutboundMessage::CallConsentAns {
                id: PlayerId(5),
                answer: true
            }]
        );
        assert!(h.negotiator.local_consent());

        h.peer.push(PeerEvent::IncomingCall {
            session: SessionId(40),
            from: PlayerId(5),
        });
        h.peer.push(PeerEvent::IncomingCall {
            session: SessionId(41),
            from: PlayerId(5),
        });
        h.negotiator.tick(TICK, &mut h.outbox);

        assert!(!h.negotiator.local_consent());
        assert_eq!(h.peer.answered(), vec![SessionId(40)]);
        assert_eq!(h.peer.closed(), vec![SessionId(41)]);
        assert!(matches!(
            h.negotiator.state(),
            CallState::Consented { peer: PlayerId(5), session: SessionId(40), .. }
        ));
    }

    fn accepted_incoming_session(h: &mut Harness, session: SessionId) {
        h.negotiator.receive_request(PlayerId(5), &mut h.outbox);
        assert!(h.negotiator.accept(&mut h.outbox));
        h.peer.push(PeerEvent::IncomingCall {
            session,
            from: PlayerId(5),
        });
        h.negotiator.tick(TICK, &mut h.outbox);
    }

    #[test]
    fn callee_denied_capture_closes_session_and_returns_to_idle() {
        let mut h = harness();
        h.devices.deny();
        accepted_incoming_session(&mut h, SessionId(12));

        assert_eq!(h.negotiator.state(), CallState::Idle);
        assert_eq!(h.peer.closed(), vec![SessionId(12)]);
        assert!(h.peer.answered().is_empty());
        assert!(h.negotiator.connections().is_empty());
        assert!(!h.negotiator.local_consent());
        assert!(!h.negotiator.remote_consent());
        assert!(matches!(
            h.negotiator.take_notices().last(),
            Some(CallNotice::DeviceFailed(_))
        ));
    }

    #[test]
    fn callee_failed_answer_releases_capture_and_session() {
        let mut h = harness();
        h.peer.fail_answers();
        accepted_incoming_session(&mut h, SessionId(13));

        assert_eq!(h.negotiator.state(), CallState::Idle);
        assert_eq!(h.peer.closed(), vec![SessionId(13)]);
        assert!(h.negotiator.connections().is_empty());
        assert!(!h.negotiator.local_consent());
        assert!(!h.negotiator.remote_consent());
        let issued = h.devices.issued();
        assert_eq!(issued.len(), 1);
        assert!(issued.iter().all(MediaStream::all_stopped));
        assert!(matches!(
            h.negotiator.take_notices().last(),
            Some(CallNotice::DeviceFailed(_))
        ));
    }

    #[test]
    fn callee_reject_sends_negative_answer() {
        let mut h = harness();
        h.negotiator.receive_request(PlayerId(5), &mut h.outbox);
        assert!(h.negotiator.reject(&mut h.outbox));

        assert_eq!(
            h.outbox,
            vec![OutboundMessage::CallConsentAns {
                id: PlayerId(5),
                answer: false
            }]
        );
        assert_eq!(h.negotiator.state(), CallState::Idle);
    }

    #[test]
    fn peer_session_without_consent_is_closed() {
        let mut h = harness();
        h.negotiator.receive_request(PlayerId(5), &mut h.outbox);
        h.peer.push(PeerEvent::IncomingCall {
            session: SessionId(9),
            from: PlayerId(5),
        });
        h.negotiator.tick(TICK, &mut h.outbox);

        assert!(h.peer.answered().is_empty());
        assert_eq!(h.peer.closed(), vec![SessionId(9)]);
        assert!(h.devices.issued().is_empty());
    }

    #[test]
    fn second_request_while_busy_is_refused() {
        let mut h = harness();
        h.negotiator.request_call(Some(PlayerId(2)), &mut h.outbox);
        h.outbox.clear();

        h.negotiator.receive_request(PlayerId(7), &mut h.outbox);

        assert_eq!(
            h.outbox,
            vec![OutboundMessage::CallConsentAns {
                id: PlayerId(7),
                answer: false
            }]
        );
        assert!(matches!(
            h.negotiator.state(),
            CallState::ConsentRequested { target: PlayerId(2), .. }
        ));
    }

    #[test]
    fn unanswered_request_times_out() {
        let mut h = harness();
        h.negotiator.request_call(Some(PlayerId(2)), &mut h.outbox);

        h.negotiator.tick(TIMEOUT - TICK, &mut h.outbox);
        assert!(!h.negotiator.is_idle());

        h.negotiator.tick(TICK, &mut h.outbox);
        assert!(h.negotiator.is_idle());
        assert!(h.negotiator.take_notices().contains(&CallNotice::TimedOut));
    }

    #[test]
    fn ignored_prompt_times_out_with_negative_answer() {
        let mut h = harness();
        h.negotiator.receive_request(PlayerId(5), &mut h.outbox);
        h.negotiator.tick(TIMEOUT, &mut h.outbox);

        assert!(h.negotiator.is_idle());
        assert_eq!(
            h.outbox,
            vec![OutboundMessage::CallConsentAns {
                id: PlayerId(5),
                answer: false
            }]
        );
    }
}
