use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture, TextureError};
use winit::window::Window;

use crate::app::{Camera2D, Entity, PixelPos, PixelRect, SceneWorld, TileMap, UiElement};

use super::draw::FrameMut;
use super::text::draw_text_clipped;
use super::{world_to_screen_px, Viewport};

const CLEAR_COLOR: [u8; 4] = [18, 20, 26, 255];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TileRectInclusive {
    x_min: u32,
    x_max: u32,
    y_min: u32,
    y_max: u32,
}

/// Pixel frame-buffer renderer. The frame buffer keeps the logical viewport
/// size; window resizes only rescale the surface.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>, viewport: Viewport) -> Result<Self, Error> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width, size.height, Arc::clone(&window));
        let pixels = Pixels::new(viewport.width, viewport.height, surface)?;
        Ok(Self {
            window,
            pixels,
            viewport,
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)
    }

    /// Maps a physical window position to frame-buffer pixels, or `None`
    /// when it lands in the letterbox outside the frame.
    pub fn window_pos_to_pixel(&self, x: f32, y: f32) -> Option<PixelPos> {
        self.pixels
            .window_pos_to_pixel((x, y))
            .ok()
            .map(|(px, py)| PixelPos {
                x: px as i32,
                y: py as i32,
            })
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    pub fn render_world(&mut self, world: &SceneWorld) -> Result<(), Error> {
        let Viewport { width, height } = self.viewport;
        let mut frame = FrameMut::new(self.pixels.frame_mut(), width, height);
        draw_scene(&mut frame, world);
        self.pixels.render()
    }
}

/// Draws tiles, then entities, then UI, into `frame`.
pub(crate) fn draw_scene(frame: &mut FrameMut<'_>, world: &SceneWorld) {
    frame.clear(CLEAR_COLOR);
    let viewport = Viewport {
        width: frame.width(),
        height: frame.height(),
    };
    draw_tile_layers(frame, world, viewport);
    for entity in world.entities() {
        draw_entity(frame, world.camera(), entity);
    }
    for element in world.ui() {
        draw_ui_element(frame, element);
    }
}

fn draw_tile_layers(frame: &mut FrameMut<'_>, world: &SceneWorld, viewport: Viewport) {
    let tile_world = world.tile_world();
    let map = tile_world.map();
    let camera = world.camera();
    let Some(visible) = visible_tile_rect(map, camera, viewport) else {
        return;
    };

    for (layer_index, layer) in map.layers().iter().enumerate() {
        if layer.tile_data().is_none() {
            continue;
        }
        for ty in visible.y_min..=visible.y_max {
            for tx in visible.x_min..=visible.x_max {
                let gid = map.tile_at(layer_index, tx as i32, ty as i32);
                if gid == 0 {
                    continue;
                }
                let Some(tileset) = tile_world.tilesets().resolve(gid) else {
                    continue;
                };
                let Some(origin) = tileset.source_origin_px(gid) else {
                    continue;
                };
                let world_pos = PixelPos {
                    x: (tx * map.tile_width()) as i32,
                    y: (ty * map.tile_height()) as i32,
                };
                frame.blit_rgba(
                    &tileset.image.rgba,
                    tileset.image.width,
                    origin,
                    (tileset.tile_width, tileset.tile_height),
                    world_to_screen_px(world_pos, camera),
                );
            }
        }
    }
}

fn visible_tile_rect(
    map: &TileMap,
    camera: &Camera2D,
    viewport: Viewport,
) -> Option<TileRectInclusive> {
    let tile_w = map.tile_width() as i32;
    let tile_h = map.tile_height() as i32;
    let left = camera.offset_px.x;
    let top = camera.offset_px.y;
    let right = left + viewport.width as i32 - 1;
    let bottom = top + viewport.height as i32 - 1;

    let x_min = left.div_euclid(tile_w).max(0);
    let y_min = top.div_euclid(tile_h).max(0);
    let x_max = right.div_euclid(tile_w).min(map.width_tiles() as i32 - 1);
    let y_max = bottom.div_euclid(tile_h).min(map.height_tiles() as i32 - 1);

    if x_min > x_max || y_min > y_max {
        return None;
    }
    Some(TileRectInclusive {
        x_min: x_min as u32,
        x_max: x_max as u32,
        y_min: y_min as u32,
        y_max: y_max as u32,
    })
}

fn draw_entity(frame: &mut FrameMut<'_>, camera: &Camera2D, entity: &Entity) {
    let (x, y) = world_to_screen_px(entity.position, camera);
    let rect = PixelRect::new(x, y, entity.size_px.0 as i32, entity.size_px.1 as i32);
    frame.fill_rect(rect, entity.color);
}

fn draw_ui_element(frame: &mut FrameMut<'_>, element: &UiElement) {
    match element {
        UiElement::Rect { rect, fill, border } => {
            if let Some(fill) = fill {
                frame.fill_rect(*rect, *fill);
            }
            if let Some((color, thickness)) = border {
                frame.stroke_rect(*rect, *color, *thickness);
            }
        }
        UiElement::Text {
            position,
            text,
            color,
        } => draw_text_clipped(frame, position.x, position.y, text, *color),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{TileLayer, TileWorld};
    use crate::content::{Tileset, TilesetImage, TilesetRegistry};
    use std::path::PathBuf;

    const RED: [u8; 4] = [200, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 200, 255];

    fn pixel(buffer: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * width + x) * 4) as usize;
        [buffer[i], buffer[i + 1], buffer[i + 2], buffer[i + 3]]
    }

    /// 2x1 tileset of 4px tiles: gid 1 red, gid 2 blue with a transparent
    /// top-left pixel.
    fn two_tile_tileset() -> Tileset {
        let mut rgba = Vec::new();
        for y in 0..4 {
            for x in 0..8 {
                let mut color = if x < 4 { RED } else { BLUE };
                if x == 4 && y == 0 {
                    color = [0, 0, 0, 0];
                }
                rgba.extend_from_slice(&color);
            }
        }
        Tileset {
            first_gid: 1,
            columns: 2,
            tile_width: 4,
            tile_height: 4,
            image: TilesetImage {
                width: 8,
                height: 4,
                rgba,
            },
            source_path: PathBuf::from("fixture.tsx"),
        }
    }

    fn world(ground: Vec<u32>) -> SceneWorld {
        let map = TileMap::new(
            (4, 4),
            (4, 2),
            vec![TileLayer::tiles("ground", ground), TileLayer::object("spawns")],
        )
        .expect("map");
        let registry = TilesetRegistry::new(vec![two_tile_tileset()], Default::default());
        SceneWorld::new(TileWorld::new(map, registry))
    }

    fn render(world: &SceneWorld, width: u32, height: u32) -> Vec<u8> {
        let mut buffer = vec![0u8; (width * height * 4) as usize];
        draw_scene(&mut FrameMut::new(&mut buffer, width, height), world);
        buffer
    }

    #[test]
    fn tiles_blit_from_resolved_tileset_cells() {
        let world = world(vec![1, 2, 0, 9, 2, 1, 1, 1]);
        let buffer = render(&world, 16, 8);

        assert_eq!(pixel(&buffer, 16, 1, 1), RED);
        assert_eq!(pixel(&buffer, 16, 5, 1), BLUE);
        // Transparent source pixel keeps the clear color.
        assert_eq!(pixel(&buffer, 16, 4, 0), CLEAR_COLOR);
        // Empty gid and a gid past the tileset image are skipped.
        assert_eq!(pixel(&buffer, 16, 9, 1), CLEAR_COLOR);
        assert_eq!(pixel(&buffer, 16, 13, 1), CLEAR_COLOR);
        assert_eq!(pixel(&buffer, 16, 1, 5), BLUE);
    }

    #[test]
    fn camera_offset_shifts_tiles_on_screen() {
        let mut world = world(vec![1, 2, 1, 1, 1, 1, 1, 1]);
        world.camera_mut().offset_px = PixelPos { x: 4, y: 0 };
        let buffer = render(&world, 8, 8);
        assert_eq!(pixel(&buffer, 8, 1, 1), BLUE);
        assert_eq!(pixel(&buffer, 8, 5, 1), RED);
    }

    #[test]
    fn entities_and_ui_draw_over_tiles() {
        let mut world = world(vec![1; 8]);
        world.spawn(PixelPos { x: 4, y: 0 }, (2, 2), [0, 255, 0, 255], "player");
        world.set_ui(vec![UiElement::Rect {
            rect: PixelRect::new(0, 6, 16, 2),
            fill: Some([255, 255, 255, 255]),
            border: None,
        }]);
        let buffer = render(&world, 16, 8);
        assert_eq!(pixel(&buffer, 16, 5, 1), [0, 255, 0, 255]);
        assert_eq!(pixel(&buffer, 16, 0, 7), [255, 255, 255, 255]);
        assert_eq!(pixel(&buffer, 16, 0, 0), RED);
    }

    #[test]
    fn visible_rect_is_culled_to_viewport() {
        let map = TileMap::new((32, 32), (64, 40), Vec::new()).expect("map");
        let camera = Camera2D {
            offset_px: PixelPos { x: 100, y: 40 },
        };
        let rect = visible_tile_rect(
            &map,
            &camera,
            Viewport {
                width: 1280,
                height: 768,
            },
        )
        .expect("visible");
        assert_eq!(
            rect,
            TileRectInclusive {
                x_min: 3,
                x_max: 43,
                y_min: 1,
                y_max: 25,
            }
        );
    }

    #[test]
    fn visible_rect_is_clamped_to_small_maps() {
        let map = TileMap::new((32, 32), (10, 5), Vec::new()).expect("map");
        let rect = visible_tile_rect(
            &map,
            &Camera2D::default(),
            Viewport {
                width: 1280,
                height: 768,
            },
        )
        .expect("visible");
        assert_eq!((rect.x_max, rect.y_max), (9, 4));
    }
}
