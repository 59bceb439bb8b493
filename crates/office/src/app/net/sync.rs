use tracing::{info, warn};

use super::channel::NetworkChannel;
use super::protocol::{
    AuthResultPayload, CallAnswerPayload, CallRequestPayload, ChatPayload, ErrorPayload,
    IdPayload, PlayerInfo, PlayerLeftPayload, PlayersPayload, PositionInitPayload,
    RemotePositionPayload, ADD_PLAYER, AUTH, CALL_CONSENT_ANS, CALL_CONSENT_REQ, CHAT, ERROR, ID,
    PLAYERS, PLAYER_LEFT, POSITION_INIT, REMOTE_POSITION,
};
use crate::app::client::ClientState;

/// Installs the handler for every message type the client understands.
pub(crate) fn register_handlers(channel: &mut NetworkChannel<ClientState>) {
    channel.on(ID, |state: &mut ClientState, payload: IdPayload| {
        state.shared.local_id = Some(payload.id);
        // A player list that arrived before our id may have listed us.
        if state.world.remove_remote(payload.id) {
            warn!(player_id = %payload.id, "local_player_removed_from_remotes");
            if state.shared.call_target() == Some(payload.id) {
                state.shared.set_call_target(None);
            }
        }
        info!(player_id = %payload.id, "local_id_assigned");
    });

    channel.on(
        POSITION_INIT,
        |state: &mut ClientState, payload: PositionInitPayload| {
            state.world.teleport_hero(payload.cell());
        },
    );

    channel.on(PLAYERS, |state: &mut ClientState, payload: PlayersPayload| {
        let listed = payload.players.len();
        for player in payload.players {
            add_remote(state, player);
        }
        info!(
            listed,
            known = state.world.registry().len(),
            "player_list_received"
        );
    });

    channel.on(ADD_PLAYER, |state: &mut ClientState, player: PlayerInfo| {
        add_remote(state, player);
    });

    channel.on(
        REMOTE_POSITION,
        |state: &mut ClientState, payload: RemotePositionPayload| {
            state
                .world
                .set_remote_destination(payload.id, payload.position);
        },
    );

    channel.on(
        PLAYER_LEFT,
        |state: &mut ClientState, payload: PlayerLeftPayload| {
            state.world.remove_remote(payload.id);
        },
    );

    channel.on(CHAT, |state: &mut ClientState, payload: ChatPayload| {
        let (sender, text) = payload.into_parts();
        state.chat.push(sender, text);
    });

    channel.on(AUTH, |state: &mut ClientState, payload: AuthResultPayload| {
        if payload.authenticated {
            info!("auth_accepted");
            state.on_authenticated();
        } else {
            warn!("auth_rejected");
            state.shared.authenticated = false;
            state.notifications.push("authentication rejected");
        }
    });

    channel.on(ERROR, |state: &mut ClientState, payload: ErrorPayload| {
        warn!(error = payload.error.as_str(), "server_error");
        state.notifications.push(payload.error);
    });

    channel.on(
        CALL_CONSENT_REQ,
        |state: &mut ClientState, payload: CallRequestPayload| {
            state.calls.receive_request(payload.id, &mut state.outbox);
        },
    );

    channel.on(
        CALL_CONSENT_ANS,
        |state: &mut ClientState, payload: CallAnswerPayload| {
            state.calls.receive_answer(payload.id, payload.answer);
        },
    );
}

/// Adds a remote player unless it is us or already known.
fn add_remote(state: &mut ClientState, player: PlayerInfo) {
    if state.shared.local_id == Some(player.id) {
        return;
    }
    state
        .world
        .add_remote(player.id, player.position, player.name.as_deref());
}
