use std::mem;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::content::{load_tile_world, ContentLoadError};
use crate::{resolve_app_paths, StartupError};

use super::input::ActionStates;
use super::metrics::MetricsAccumulator;
use super::{
    InputAction, InputEvent, InputSnapshot, KeyPress, PixelPos, Renderer, Scene, SceneWorld,
    Viewport,
};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    /// Overrides the map resolved from the project root.
    pub map_path: Option<PathBuf>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Codemere".to_string(),
            window_width: 1280,
            window_height: 768,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            map_path: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load tile world: {0}")]
    Content(#[from] ContentLoadError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, mut scene: Box<dyn Scene>) -> Result<(), AppError> {
    let map_path = match config.map_path.clone() {
        Some(path) => path,
        None => resolve_app_paths()?.map_path,
    };
    info!(map = %map_path.display(), "startup");
    let tile_world = load_tile_world(&map_path)?;

    let mut world = SceneWorld::new(tile_world);
    scene.load(&mut world);
    info!(entity_count = world.entity_count(), "scene_loaded");

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
    let window_id = window.id();
    let viewport = Viewport {
        width: config.window_width.max(1),
        height: config.window_height.max(1),
    };
    let mut renderer = Renderer::new(Arc::clone(&window), viewport).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let mut input_collector = InputCollector::new(viewport.width, viewport.height);

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent {
                window_id: event_window,
                event,
            } if event_window == window_id => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let cursor = renderer.window_pos_to_pixel(position.x as f32, position.y as f32);
                    input_collector.set_cursor_position_px(cursor);
                }
                WindowEvent::CursorLeft { .. } => {
                    input_collector.set_cursor_position_px(None);
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    input_collector.handle_mouse_input(button, state);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_key(
                        event.physical_key,
                        event.text.as_deref(),
                        event.repeat,
                        event.state,
                    );
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    accumulator =
                        accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));
                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let input_snapshot = input_collector.snapshot_for_tick();
                        scene.update(fixed_dt_seconds, &input_snapshot, &mut world);
                        metrics_accumulator.record_tick();
                    }
                    accumulator = step_plan.remaining_accumulator;

                    if step_plan.dropped_backlog > Duration::ZERO {
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    if let Err(error) = renderer.render_world(&world) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }

                    let next_title = scene.debug_title();
                    if next_title != last_applied_title {
                        window.set_title(next_title.as_deref().unwrap_or(&config.window_title));
                        last_applied_title = next_title;
                    }

                    metrics_accumulator.record_frame(raw_frame_dt);
                    if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            entity_count = world.entity_count(),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                renderer.request_redraw();
            }
            Event::LoopExiting => {
                scene.unload(&mut world);
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Collects window input between ticks. Held movement keys are sampled;
/// key presses and clicks are queued and drained by the next tick.
#[derive(Debug, Default)]
struct InputCollector {
    action_states: ActionStates,
    pending_events: Vec<InputEvent>,
    cursor_position_px: Option<PixelPos>,
    left_mouse_is_down: bool,
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    fn handle_key(
        &mut self,
        physical_key: PhysicalKey,
        text: Option<&str>,
        repeat: bool,
        state: ElementState,
    ) {
        let is_pressed = state == ElementState::Pressed;
        self.update_action_state_from_physical_key(physical_key, is_pressed);
        if !is_pressed {
            return;
        }
        let text = text
            .filter(|text| !text.is_empty() && !text.chars().any(char::is_control))
            .map(str::to_string);
        self.pending_events.push(InputEvent::Key {
            key: key_press_from_physical(physical_key),
            text,
            repeat,
        });
    }

    fn update_action_state_from_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        let action = match key {
            PhysicalKey::Code(KeyCode::KeyW | KeyCode::ArrowUp) => InputAction::MoveUp,
            PhysicalKey::Code(KeyCode::KeyS | KeyCode::ArrowDown) => InputAction::MoveDown,
            PhysicalKey::Code(KeyCode::KeyA | KeyCode::ArrowLeft) => InputAction::MoveLeft,
            PhysicalKey::Code(KeyCode::KeyD | KeyCode::ArrowRight) => InputAction::MoveRight,
            _ => return,
        };
        self.action_states.set(action, is_pressed);
    }

    fn set_cursor_position_px(&mut self, position: Option<PixelPos>) {
        self.cursor_position_px = position;
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        match state {
            ElementState::Pressed => {
                if !self.left_mouse_is_down {
                    if let Some(position_px) = self.cursor_position_px {
                        self.pending_events.push(InputEvent::Click { position_px });
                    }
                }
                self.left_mouse_is_down = true;
            }
            ElementState::Released => self.left_mouse_is_down = false,
        }
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        InputSnapshot::new(
            self.action_states,
            mem::take(&mut self.pending_events),
            self.cursor_position_px,
            self.window_width,
            self.window_height,
        )
    }
}

fn key_press_from_physical(key: PhysicalKey) -> KeyPress {
    let PhysicalKey::Code(code) = key else {
        return KeyPress::Other;
    };
    match code {
        KeyCode::Enter | KeyCode::NumpadEnter => KeyPress::Enter,
        KeyCode::Backspace => KeyPress::Backspace,
        KeyCode::Escape => KeyPress::Escape,
        KeyCode::Space => KeyPress::Space,
        KeyCode::ArrowLeft => KeyPress::ArrowLeft,
        KeyCode::ArrowRight => KeyPress::ArrowRight,
        KeyCode::ArrowUp => KeyPress::ArrowUp,
        KeyCode::ArrowDown => KeyPress::ArrowDown,
        KeyCode::F5 => KeyPress::F5,
        KeyCode::F6 => KeyPress::F6,
        _ => KeyPress::Other,
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        mem::replace(&mut accumulator, Duration::ZERO)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
