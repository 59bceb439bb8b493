use std::time::Duration;

use engine::{InputAction, InputSnapshot};
use tracing::{debug, info};

use super::call::{CallNegotiator, CallNotice};
use super::chat::{ChatInput, ChatLog};
use super::net::{ChannelContext, OutboundMessage};
use super::notifications::Notifications;
use super::world::{SharedState, WorldTree};

/// Client state the network handlers and the fixed step both mutate.
pub(crate) struct ClientState {
    pub(crate) world: WorldTree,
    pub(crate) shared: SharedState,
    pub(crate) chat: ChatLog,
    pub(crate) chat_input: ChatInput,
    pub(crate) notifications: Notifications,
    pub(crate) calls: CallNegotiator,
    pub(crate) outbox: Vec<OutboundMessage>,
    jwt: String,
    room_id: String,
    position_init_sent: bool,
    room_requested: bool,
}

impl ClientState {
    pub(crate) fn new(
        world: WorldTree,
        calls: CallNegotiator,
        jwt: String,
        room_id: String,
    ) -> Self {
        Self {
            world,
            shared: SharedState::default(),
            chat: ChatLog::default(),
            chat_input: ChatInput::default(),
            notifications: Notifications::default(),
            calls,
            outbox: Vec::new(),
            jwt,
            room_id,
            position_init_sent: false,
            room_requested: false,
        }
    }

    pub(crate) fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Queues the room join after the server accepted our token. Sent once.
    pub(crate) fn on_authenticated(&mut self) {
        self.shared.authenticated = true;
        if self.room_requested {
            return;
        }
        self.room_requested = true;
        self.outbox.push(OutboundMessage::Room {
            room_id: self.room_id.clone(),
        });
        info!(room_id = self.room_id.as_str(), "room_join_requested");
    }

    /// One fixed step of everything that is not network dispatch.
    pub(crate) fn tick(&mut self, fixed_dt: Duration, input: &InputSnapshot) {
        if let Some(message) = self.chat_input.handle(input) {
            self.outbox.push(OutboundMessage::Chat { message });
        }
        if !self.chat_input.is_active() {
            self.handle_call_keys(input);
        }

        self.calls.tick(fixed_dt, &mut self.outbox);
        for notice in self.calls.take_notices() {
            self.notifications.push(describe_notice(&notice));
        }
        self.notifications.tick(fixed_dt);

        let delta_ms = fixed_dt.as_secs_f32() * 1000.0;
        let changes = self.world.step(
            delta_ms,
            input,
            self.chat_input.is_active(),
            &mut self.outbox,
            &mut self.shared,
        );
        for target in changes {
            match target {
                Some(id) => debug!(player_id = %id, "call_target_in_range"),
                None => debug!("call_target_cleared"),
            }
        }
    }

    fn handle_call_keys(&mut self, input: &InputSnapshot) {
        if input.pressed(InputAction::Call) {
            self.calls
                .request_call(self.shared.call_target(), &mut self.outbox);
        }
        if input.pressed(InputAction::Accept) {
            self.calls.accept(&mut self.outbox);
        }
        if input.pressed(InputAction::Reject) {
            self.calls.reject(&mut self.outbox);
        }
        if input.pressed(InputAction::HangUp) {
            self.calls.hang_up(&mut self.outbox);
        }
    }
}

impl ChannelContext for ClientState {
    fn on_open(&mut self) {
        self.shared.connection_ready = true;
        if self.position_init_sent {
            debug!("position_init_already_sent");
            return;
        }
        self.position_init_sent = true;
        self.outbox.push(OutboundMessage::Auth {
            jwt: self.jwt.clone(),
        });
        self.outbox.push(OutboundMessage::PositionInit {
            position: self.world.hero_position(),
        });
    }

    fn on_close(&mut self, reason: &str) {
        self.shared.connection_ready = false;
        self.shared.authenticated = false;
        // Nothing will update the remote players any more.
        let dropped = self.world.clear_remotes();
        self.shared.set_call_target(None);
        info!(dropped, "remote_players_cleared");
        self.notifications.push(format!("disconnected: {reason}"));
    }

    fn drain_outbound(&mut self) -> Vec<OutboundMessage> {
        std::mem::take(&mut self.outbox)
    }
}

fn describe_notice(notice: &CallNotice) -> String {
    match notice {
        CallNotice::Requested(id) => format!("calling {id}"),
        CallNotice::Incoming(id) => format!("{id} wants to call"),
        CallNotice::Declined(id) => format!("{id} declined"),
        CallNotice::Busy(id) => format!("missed call from {id}"),
        CallNotice::TimedOut => "call timed out".to_string(),
        CallNotice::DeviceFailed(reason) => format!("call failed: {reason}"),
        CallNotice::Connected(id) => format!("on call with {id}"),
        CallNotice::Ended => "call ended".to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::client;
    use super::*;
    use crate::app::world::PlayerId;

    const TICK: Duration = Duration::from_millis(16);

    #[test]
    fn open_queues_auth_then_position_init_once() {
        let mut client = client();

        client.state.on_open();
        client.state.on_open();

        let sent = client.state.drain_outbound();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0],
            OutboundMessage::Auth {
                jwt: "token".to_string()
            }
        );
        assert!(matches!(sent[1], OutboundMessage::PositionInit { .. }));
    }

    #[test]
    fn room_is_requested_once_after_auth() {
        let mut client = client();
        client.state.on_authenticated();
        client.state.on_authenticated();

        assert_eq!(
            client.state.drain_outbound(),
            vec![OutboundMessage::Room {
                room_id: "standup".to_string()
            }]
        );
        assert!(client.state.shared.authenticated);
    }

    #[test]
    fn submitted_chat_is_queued() {
        let mut client = client();
        let enter = InputSnapshot::empty().with_pressed(InputAction::Chat);
        client.state.tick(TICK, &enter);
        client
            .state
            .tick(TICK, &InputSnapshot::empty().with_typed_text("hi all"));
        client.state.tick(TICK, &enter);

        assert_eq!(
            client.state.drain_outbound(),
            vec![OutboundMessage::Chat {
                message: "hi all".to_string()
            }]
        );
    }

    #[test]
    fn call_key_needs_a_target_in_range() {
        let mut client = client();
        let call = InputSnapshot::empty().with_pressed(InputAction::Call);

        client.state.tick(TICK, &call);
        assert!(client.state.calls.is_idle());

        let hero = client.state.world.hero_position();
        client.state.world.add_remote(PlayerId(4), hero, None);
        client.state.tick(TICK, &InputSnapshot::empty());
        client.state.tick(TICK, &call);

        assert_eq!(
            client.state.drain_outbound(),
            vec![OutboundMessage::CallConsentReq { id: PlayerId(4) }]
        );
    }

    #[test]
    fn call_keys_are_ignored_while_typing() {
        let mut client = client();
        let hero = client.state.world.hero_position();
        client.state.world.add_remote(PlayerId(4), hero, None);
        client.state.tick(TICK, &InputSnapshot::empty());

        client
            .state
            .tick(TICK, &InputSnapshot::empty().with_pressed(InputAction::Chat));
        client
            .state
            .tick(TICK, &InputSnapshot::empty().with_pressed(InputAction::Call));

        assert!(client.state.calls.is_idle());
    }

    #[test]
    fn disconnect_drops_remote_players_and_the_call_target() {
        let mut client = client();
        client.state.on_open();
        let hero = client.state.world.hero_position();
        client.state.world.add_remote(PlayerId(4), hero, None);
        client.state.tick(TICK, &InputSnapshot::empty());
        assert_eq!(client.state.shared.call_target(), Some(PlayerId(4)));

        client.state.on_close("server closed");

        assert_eq!(client.state.world.registry().len(), 0);
        assert_eq!(client.state.shared.call_target(), None);
        assert!(!client.state.shared.connection_ready);
        assert_eq!(
            client.state.notifications.texts().collect::<Vec<_>>(),
            vec!["disconnected: server closed"]
        );
    }

    #[test]
    fn call_notices_become_notifications() {
        let mut client = client();
        client
            .state
            .calls
            .receive_request(PlayerId(8), &mut client.state.outbox);
        client.state.tick(TICK, &InputSnapshot::empty());

        assert_eq!(
            client.state.notifications.texts().collect::<Vec<_>>(),
            vec!["8 wants to call"]
        );
    }
}
