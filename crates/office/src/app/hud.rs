use engine::app::rendering::{text_width_px, LINE_ADVANCE};
use engine::{Canvas, PixelRect, Rgba};

use super::call::CallState;
use super::client::ClientState;

const TEXT: Rgba = [255, 255, 255, 255];
const MUTED: Rgba = [170, 170, 190, 255];
const ACCENT: Rgba = [255, 220, 90, 255];
const PANEL: Rgba = [0, 0, 0, 140];
const MARGIN: i32 = 2;
const CHAT_LINES: usize = 4;

/// Screen-space overlay: connection status, call prompts, chat and notices.
pub(crate) fn draw_hud(canvas: &mut dyn Canvas, state: &ClientState) {
    let (width, height) = canvas.size();
    let width = width as i32;
    let height = height as i32;

    let status = if !state.shared.connection_ready {
        "offline"
    } else if state.shared.authenticated {
        "online"
    } else {
        "connecting"
    };
    canvas.draw_text(
        MARGIN,
        MARGIN,
        &format!("{status} {} {}", state.room_id(), state.world.registry().len()),
        MUTED,
    );

    if let Some(line) = call_line(state) {
        let x = (width - text_width_px(&line)) / 2;
        canvas.fill_rect(
            PixelRect::new(x - 1, MARGIN - 1, (text_width_px(&line) + 2) as u32, LINE_ADVANCE as u32),
            PANEL,
        );
        canvas.draw_text(x, MARGIN, &line, ACCENT);
    }

    if let CallState::Active { peer, .. } = state.calls.state() {
        if state.calls.remote_stream().is_some() {
            let tile = PixelRect::new(width - 66, height - 50, 64, 48);
            canvas.fill_rect(tile, PANEL);
            canvas.draw_text(tile.x + MARGIN, tile.y + MARGIN, &peer.to_string(), TEXT);
        }
    }

    for (row, text) in state.notifications.texts().enumerate() {
        let x = width - MARGIN - text_width_px(text);
        canvas.draw_text(x, MARGIN + row as i32 * LINE_ADVANCE, text, TEXT);
    }

    draw_chat(canvas, state, height);
}

fn call_line(state: &ClientState) -> Option<String> {
    match state.calls.state() {
        CallState::Idle => state
            .shared
            .call_target()
            .map(|target| format!("c: call {target}")),
        CallState::ConsentRequested { target, .. } => Some(format!("calling {target}")),
        CallState::ConsentPending {
            caller,
            accepted: false,
            ..
        } => Some(format!("{caller} calls  y/n")),
        CallState::ConsentPending { .. } | CallState::Consented { .. } => {
            Some("connecting call".to_string())
        }
        CallState::Active { peer, .. } => Some(format!("with {peer}  h: hang up")),
    }
}

fn draw_chat(canvas: &mut dyn Canvas, state: &ClientState, height: i32) {
    let mut y = height - MARGIN - LINE_ADVANCE;
    if state.chat_input.is_active() {
        canvas.draw_text(MARGIN, y, &format!("> {}_", state.chat_input.buffer()), ACCENT);
        y -= LINE_ADVANCE;
    }
    let lines: Vec<String> = state
        .chat
        .recent(CHAT_LINES)
        .map(|entry| match &entry.sender {
            Some(sender) => format!("{sender}: {}", entry.text),
            None => entry.text.clone(),
        })
        .collect();
    for line in lines.iter().rev() {
        canvas.draw_text(MARGIN, y, line, TEXT);
        y -= LINE_ADVANCE;
    }
}
