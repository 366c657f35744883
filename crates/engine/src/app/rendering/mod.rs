mod draw;
mod renderer;
mod text;
mod transform;

pub use draw::FrameMut;
pub use renderer::Renderer;
pub use text::{draw_text_clipped, text_width_px, GLYPH_ADVANCE_PX, LINE_ADVANCE_PX, TEXT_SCALE};
pub use transform::{compute_camera_offset, world_to_screen_px, Viewport};
