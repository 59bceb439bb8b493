use std::time::{Duration, Instant};

use engine::{Canvas, InputSnapshot, MetricsHandle, Scene, SceneCommand};
use tracing::info;

use super::client::ClientState;
use super::hud::draw_hud;
use super::net::{register_handlers, NetworkChannel};

const BACKGROUND: [u8; 4] = [24, 20, 37, 255];
const NETWORK_METRICS_INTERVAL: Duration = Duration::from_secs(10);

/// The office room: network dispatch, then the world step, then sends.
pub(crate) struct OfficeScene {
    state: ClientState,
    channel: NetworkChannel<ClientState>,
    loop_metrics: MetricsHandle,
    last_metrics_log: Instant,
}

impl OfficeScene {
    pub(crate) fn new(state: ClientState, mut channel: NetworkChannel<ClientState>) -> Self {
        register_handlers(&mut channel);
        Self {
            state,
            channel,
            loop_metrics: MetricsHandle::default(),
            last_metrics_log: Instant::now(),
        }
    }

    /// Reads loop fps/tps from the handle the runner publishes to.
    pub(crate) fn with_loop_metrics(mut self, loop_metrics: MetricsHandle) -> Self {
        self.loop_metrics = loop_metrics;
        self
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &ClientState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut ClientState {
        &mut self.state
    }

    fn maybe_log_network_metrics(&mut self) {
        if self.last_metrics_log.elapsed() < NETWORK_METRICS_INTERVAL {
            return;
        }
        self.last_metrics_log = Instant::now();
        let stats = self.channel.stats();
        let loop_stats = self.loop_metrics.snapshot();
        info!(
            inbound = stats.inbound,
            outbound = stats.outbound,
            dropped = stats.dropped,
            ready = self.channel.is_ready(),
            remote_players = self.state.world.registry().len(),
            tps = loop_stats.tps,
            "network_metrics"
        );
    }
}

impl Scene for OfficeScene {
    fn load(&mut self) {
        info!(
            room_id = self.state.room_id(),
            offline = self.channel.is_offline(),
            "scene_loaded"
        );
    }

    fn update(&mut self, fixed_dt: Duration, input: &InputSnapshot) -> SceneCommand {
        // Handlers run to completion before the tick reads remote state.
        self.channel.poll(&mut self.state);
        self.state.tick(fixed_dt, input);
        let outbound = std::mem::take(&mut self.state.outbox);
        self.channel.send_all(outbound);
        self.maybe_log_network_metrics();

        if input.quit_requested() {
            SceneCommand::Quit
        } else {
            SceneCommand::None
        }
    }

    fn render(&mut self, canvas: &mut dyn Canvas) {
        canvas.clear(BACKGROUND);
        self.state.world.draw(canvas);
        draw_hud(canvas, &self.state);
    }

    fn unload(&mut self) {
        // The media session and the connection are independent; close both.
        self.state.calls.shutdown();
        self.channel.close();
        info!("scene_unloaded");
    }

    fn debug_title(&self) -> Option<String> {
        let loop_stats = self.loop_metrics.snapshot();
        Some(format!(
            "Office | {} | players: {} | {:.0} fps{}",
            self.state.room_id(),
            self.state.world.registry().len(),
            loop_stats.fps,
            if self.state.calls.on_call() { " | on call" } else { "" }
        ))
    }
}
