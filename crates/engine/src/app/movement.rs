use super::{InputAction, InputSnapshot, PixelPos, TileWorld};

/// Held directions for one tick. Opposite directions cancel out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveIntent {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl MoveIntent {
    pub fn from_snapshot(input: &InputSnapshot) -> Self {
        Self {
            left: input.is_down(InputAction::MoveLeft),
            right: input.is_down(InputAction::MoveRight),
            up: input.is_down(InputAction::MoveUp),
            down: input.is_down(InputAction::MoveDown),
        }
    }

    pub fn is_idle(&self) -> bool {
        !(self.left || self.right || self.up || self.down)
    }
}

/// Applies one tick of movement.
///
/// Directions are applied independently, so a diagonal step moves
/// `speed_px` on both axes (not normalized). If the candidate position is
/// collidable the whole step is discarded; there is no per-axis sliding.
/// The result is then clamped so the entity box stays on the map.
pub fn resolve_movement(
    world: &TileWorld,
    current: PixelPos,
    intent: MoveIntent,
    speed_px: i32,
    entity_size: (u32, u32),
) -> PixelPos {
    let mut candidate = current;
    if intent.left {
        candidate.x -= speed_px;
    }
    if intent.right {
        candidate.x += speed_px;
    }
    if intent.up {
        candidate.y -= speed_px;
    }
    if intent.down {
        candidate.y += speed_px;
    }

    if world.is_collidable(candidate.x, candidate.y) {
        candidate = current;
    }

    clamp_to_map(candidate, entity_size, world.map().pixel_size())
}

/// Keeps the entity box inside `[0, map - size]`. When the entity is larger
/// than the map the axis collapses to 0.
pub fn clamp_to_map(position: PixelPos, entity_size: (u32, u32), map_pixel_size: (u32, u32)) -> PixelPos {
    PixelPos {
        x: clamp_axis(position.x, entity_size.0, map_pixel_size.0),
        y: clamp_axis(position.y, entity_size.1, map_pixel_size.1),
    }
}

fn clamp_axis(value: i32, entity_extent: u32, map_extent: u32) -> i32 {
    let limit = map_extent as i64 - entity_extent as i64;
    (value as i64).min(limit).max(0) as i32
}
