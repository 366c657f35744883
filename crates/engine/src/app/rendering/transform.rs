use crate::app::{Camera2D, PixelPos};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Viewport offset that centers `anchor` (an entity of `anchor_size`) and
/// never shows past the map edges. An axis where the map is smaller than
/// the viewport is pinned to 0.
pub fn compute_camera_offset(
    anchor: PixelPos,
    anchor_size: (u32, u32),
    viewport: Viewport,
    map_pixel_size: (u32, u32),
) -> PixelPos {
    let centered_x = anchor.x - viewport.width as i32 / 2 + anchor_size.0 as i32 / 2;
    let centered_y = anchor.y - viewport.height as i32 / 2 + anchor_size.1 as i32 / 2;
    PixelPos {
        x: clamp_axis(centered_x, map_pixel_size.0, viewport.width),
        y: clamp_axis(centered_y, map_pixel_size.1, viewport.height),
    }
}

fn clamp_axis(centered: i32, map_extent: u32, viewport_extent: u32) -> i32 {
    if map_extent < viewport_extent {
        return 0;
    }
    let max_offset = (map_extent - viewport_extent).min(i32::MAX as u32) as i32;
    centered.clamp(0, max_offset)
}

pub fn world_to_screen_px(world: PixelPos, camera: &Camera2D) -> (i32, i32) {
    (
        world.x - camera.offset_px.x,
        world.y - camera.offset_px.y,
    )
}
