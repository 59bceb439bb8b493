use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use super::input::ActionStates;
use super::metrics::MetricsAccumulator;
use super::rendering::{Canvas, FrameBuffer, Renderer};
use super::{
    HeldDirections, InputAction, InputSnapshot, MetricsHandle, Scene, SceneCommand,
};

pub const SLOW_FRAME_ENV_VAR: &str = "OFFICE_SLOW_FRAME_MS";

const CLEAR_COLOR: [u8; 4] = [0, 0, 0, 255];

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub buffer_width: u32,
    pub buffer_height: u32,
    pub target_tps: u32,
    /// Optional cap on a single frame's delta. Off by default so the number
    /// of updates depends only on elapsed time.
    pub max_frame_delta: Option<Duration>,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Office".to_string(),
            window_width: 1280,
            window_height: 720,
            buffer_width: 320,
            buffer_height: 180,
            target_tps: 60,
            max_frame_delta: None,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Receives the callbacks of [`FixedStepLoop::advance`].
pub trait FrameDriver {
    fn update(&mut self, time_step: Duration);
    fn render(&mut self);
}

/// Fixed-timestep accumulator decoupled from the paint rate.
///
/// Each paint callback adds the real time since the previous one to an
/// accumulator, runs `update(time_step)` while at least one step is owed,
/// then renders exactly once. Leftover time carries into the next frame.
#[derive(Debug, Clone)]
pub struct FixedStepLoop {
    time_step: Duration,
    max_frame_delta: Option<Duration>,
    accumulated: Duration,
    last_frame: Option<Instant>,
    running: bool,
    frame_scheduled: bool,
}

impl FixedStepLoop {
    pub fn new(target_tps: u32, max_frame_delta: Option<Duration>) -> Self {
        let target_tps = u64::from(target_tps.max(1));
        Self {
            time_step: Duration::from_nanos(1_000_000_000 / target_tps),
            max_frame_delta: max_frame_delta.filter(|delta| !delta.is_zero()),
            accumulated: Duration::ZERO,
            last_frame: None,
            running: false,
            frame_scheduled: false,
        }
    }

    pub fn time_step(&self) -> Duration {
        self.time_step
    }

    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether a paint callback is pending. Hosts request a redraw only while this is set.
    pub fn frame_scheduled(&self) -> bool {
        self.frame_scheduled
    }

    pub fn start(&mut self, now: Instant) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_frame = Some(now);
        self.frame_scheduled = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.frame_scheduled = false;
    }

    /// Runs one paint callback. Returns the number of updates performed.
    pub fn advance(&mut self, now: Instant, driver: &mut dyn FrameDriver) -> u32 {
        if !self.running || !self.frame_scheduled {
            return 0;
        }
        self.frame_scheduled = false;

        let last = self.last_frame.unwrap_or(now);
        let mut delta = now.saturating_duration_since(last);
        if let Some(max) = self.max_frame_delta {
            delta = delta.min(max);
        }
        self.last_frame = Some(now);
        self.accumulated = self.accumulated.saturating_add(delta);

        let mut ticks = 0u32;
        while self.accumulated >= self.time_step {
            driver.update(self.time_step);
            self.accumulated -= self.time_step;
            ticks = ticks.saturating_add(1);
        }
        driver.render();

        self.frame_scheduled = self.running;
        ticks
    }
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<(), AppError> {
    run_app_with_metrics(config, scene, MetricsHandle::default())
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    mut scene: Box<dyn Scene>,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(
        Arc::clone(&window),
        config.buffer_width,
        config.buffer_height,
    )
    .map_err(AppError::CreateRenderer)?;
    let mut frame = FrameBuffer::new(config.buffer_width, config.buffer_height);

    event_loop.set_control_flow(ControlFlow::Poll);

    let metrics_log_interval = if config.metrics_log_interval.is_zero() {
        Duration::from_secs(1)
    } else {
        config.metrics_log_interval
    };
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let mut fixed_loop = FixedStepLoop::new(config.target_tps, config.max_frame_delta);
    let mut input_collector = InputCollector::default();

    scene.load();
    info!(
        target_tps = config.target_tps,
        time_step_us = fixed_loop.time_step().as_micros() as u64,
        buffer_width = config.buffer_width,
        buffer_height = config.buffer_height,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        "loop_config"
    );

    let started = Instant::now();
    fixed_loop.start(started);
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval, started);
    let mut last_frame_instant = started;
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    fixed_loop.stop();
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::Focused(false) => input_collector.release_all(),
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_key(
                        event.physical_key,
                        event.state,
                        event.text.as_deref(),
                    );
                }
                WindowEvent::RedrawRequested => {
                    if slow_frame_delay > Duration::ZERO {
                        // Debug perturbation only.
                        thread::sleep(slow_frame_delay);
                    }

                    let now = Instant::now();
                    let frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let mut driver = SceneDriver {
                        scene: scene.as_mut(),
                        input: &mut input_collector,
                        frame: &mut frame,
                        quit_requested: false,
                    };
                    let ticks = fixed_loop.advance(now, &mut driver);
                    let quit_requested = driver.quit_requested;

                    if let Err(error) = renderer.present(&frame) {
                        warn!(error = %error, "renderer_present_failed");
                        window_target.exit();
                    }
                    if quit_requested {
                        info!(reason = "scene_quit", "shutdown_requested");
                        fixed_loop.stop();
                        window_target.exit();
                    }

                    let next_title = scene.debug_title();
                    if next_title != last_applied_title {
                        window.set_title(next_title.as_deref().unwrap_or(&config.window_title));
                        last_applied_title = next_title;
                    }

                    metrics_accumulator.record_frame(frame_dt, ticks);
                    if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                        metrics_handle.publish(snapshot);
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            worst_frame_ms = snapshot.worst_frame_ms,
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                if fixed_loop.frame_scheduled() {
                    window.request_redraw();
                }
            }
            Event::LoopExiting => {
                fixed_loop.stop();
                scene.unload();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

struct SceneDriver<'a> {
    scene: &'a mut dyn Scene,
    input: &'a mut InputCollector,
    frame: &'a mut FrameBuffer,
    quit_requested: bool,
}

impl FrameDriver for SceneDriver<'_> {
    fn update(&mut self, time_step: Duration) {
        let snapshot = self.input.snapshot_for_tick();
        if self.scene.update(time_step, &snapshot) == SceneCommand::Quit {
            self.quit_requested = true;
        }
    }

    fn render(&mut self) {
        self.frame.clear(CLEAR_COLOR);
        self.scene.render(self.frame);
    }
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    held: HeldDirections,
    action_states: ActionStates,
    pressed_edges: ActionStates,
    typed_text: String,
    backspaces: u32,
}

impl InputCollector {
    fn handle_key(&mut self, key: PhysicalKey, state: ElementState, text: Option<&str>) {
        let is_pressed = state == ElementState::Pressed;
        if let Some(action) = action_for_key(key) {
            if is_pressed && !self.action_states.is_down(action) {
                self.pressed_edges.set(action, true);
            }
            self.action_states.set(action, is_pressed);
            if let Some(direction) = action.direction() {
                if is_pressed {
                    self.held.press(direction);
                } else {
                    self.held.release(direction);
                }
            }
            if action == InputAction::Quit && is_pressed {
                self.quit_requested = true;
            }
        }

        if !is_pressed {
            return;
        }
        if key == PhysicalKey::Code(KeyCode::Backspace) {
            self.backspaces = self.backspaces.saturating_add(1);
            return;
        }
        if let Some(text) = text {
            self.typed_text
                .extend(text.chars().filter(|ch| !ch.is_control()));
        }
    }

    fn release_all(&mut self) {
        self.held.clear();
        self.action_states = ActionStates::default();
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(
            self.quit_requested,
            self.held.direction(),
            self.action_states,
            self.pressed_edges,
            std::mem::take(&mut self.typed_text),
            self.backspaces,
        );
        self.pressed_edges = ActionStates::default();
        self.backspaces = 0;
        snapshot
    }
}

fn action_for_key(key: PhysicalKey) -> Option<InputAction> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    match code {
        KeyCode::KeyW | KeyCode::ArrowUp => Some(InputAction::MoveUp),
        KeyCode::KeyS | KeyCode::ArrowDown => Some(InputAction::MoveDown),
        KeyCode::KeyA | KeyCode::ArrowLeft => Some(InputAction::MoveLeft),
        KeyCode::KeyD | KeyCode::ArrowRight => Some(InputAction::MoveRight),
        KeyCode::KeyC => Some(InputAction::Call),
        KeyCode::KeyY => Some(InputAction::Accept),
        KeyCode::KeyN => Some(InputAction::Reject),
        KeyCode::KeyH => Some(InputAction::HangUp),
        KeyCode::Enter | KeyCode::NumpadEnter => Some(InputAction::Chat),
        KeyCode::Escape => Some(InputAction::Quit),
        _ => None,
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}
