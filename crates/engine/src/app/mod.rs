mod input;
mod loop_runner;
mod metrics;
mod movement;
mod rendering;
mod scene;
mod text_buffer;
mod tilemap;

pub use input::{InputAction, InputEvent, KeyPress};
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use metrics::LoopMetricsSnapshot;
pub use movement::{clamp_to_map, resolve_movement, MoveIntent};
pub use rendering::{
    compute_camera_offset, draw_text_clipped, text_width_px, world_to_screen_px, FrameMut,
    Renderer, Viewport, GLYPH_ADVANCE_PX, LINE_ADVANCE_PX, TEXT_SCALE,
};
pub use scene::{
    Camera2D, Entity, EntityId, InputSnapshot, PixelPos, PixelRect, Scene, SceneWorld, UiElement,
};
pub use text_buffer::{TextBuffer, MAX_LINE_CHARS};
pub use tilemap::{LayerKind, TileLayer, TileMap, TileWorld, TilemapError};
