use super::input::{ActionStates, InputAction, InputEvent};
use super::tilemap::TileWorld;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PixelPos {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, point: PixelPos) -> bool {
        point.x >= self.x
            && point.y >= self.y
            && point.x < self.x + self.width
            && point.y < self.y + self.height
    }
}

/// Top-left of the visible region in world pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Camera2D {
    pub offset_px: PixelPos,
}

#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    actions: ActionStates,
    events: Vec<InputEvent>,
    cursor_position_px: Option<PixelPos>,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        actions: ActionStates,
        events: Vec<InputEvent>,
        cursor_position_px: Option<PixelPos>,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            actions,
            events,
            cursor_position_px,
            window_width,
            window_height,
        }
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    pub fn cursor_position_px(&self) -> Option<PixelPos> {
        self.cursor_position_px
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_event(mut self, event: InputEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<PixelPos>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub position: PixelPos,
    pub size_px: (u32, u32),
    pub color: [u8; 4],
    pub debug_name: &'static str,
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Screen-space draw command, rebuilt by the scene every tick and drawn on
/// top of the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiElement {
    Rect {
        rect: PixelRect,
        fill: Option<[u8; 4]>,
        border: Option<([u8; 4], i32)>,
    },
    Text {
        position: PixelPos,
        text: String,
        color: [u8; 4],
    },
}

/// Everything the loop owns between ticks: the loaded tile world, the
/// camera, entities and the current UI draw list.
#[derive(Debug)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    camera: Camera2D,
    tile_world: TileWorld,
    ui: Vec<UiElement>,
}

impl SceneWorld {
    pub fn new(tile_world: TileWorld) -> Self {
        Self {
            allocator: EntityIdAllocator::default(),
            entities: Vec::new(),
            camera: Camera2D::default(),
            tile_world,
            ui: Vec::new(),
        }
    }

    pub fn spawn(
        &mut self,
        position: PixelPos,
        size_px: (u32, u32),
        color: [u8; 4],
        debug_name: &'static str,
    ) -> EntityId {
        let id = self.allocator.allocate();
        self.entities.push(Entity {
            id,
            position,
            size_px,
            color,
            debug_name,
        });
        id
    }

    pub fn clear_entities(&mut self) {
        self.entities.clear();
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }

    pub fn tile_world(&self) -> &TileWorld {
        &self.tile_world
    }

    pub fn ui(&self) -> &[UiElement] {
        &self.ui
    }

    pub fn set_ui(&mut self, ui: Vec<UiElement>) {
        self.ui = ui;
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot, world: &mut SceneWorld);
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{KeyPress, TileMap};
    use crate::content::TilesetRegistry;

    fn empty_world() -> SceneWorld {
        let map = TileMap::new((16, 16), (4, 4), Vec::new()).expect("map");
        SceneWorld::new(TileWorld::new(map, TilesetRegistry::default()))
    }

    #[test]
    fn allocator_never_reuses_ids() {
        let mut allocator = EntityIdAllocator::default();
        let first = allocator.allocate();
        let second = allocator.allocate();
        let third = allocator.allocate();

        assert_eq!(first.0, 0);
        assert_eq!(second.0, 1);
        assert_eq!(third.0, 2);
    }

    #[test]
    fn spawn_and_find_entity_round_trip() {
        let mut world = empty_world();
        let id = world.spawn(PixelPos { x: 3, y: 4 }, (16, 16), [0, 255, 0, 255], "player");
        assert_eq!(world.entity_count(), 1);

        world.find_entity_mut(id).expect("entity").position.x = 10;
        assert_eq!(world.find_entity(id).expect("entity").position, PixelPos { x: 10, y: 4 });

        world.clear_entities();
        assert!(world.find_entity(id).is_none());
    }

    #[test]
    fn pixel_rect_contains_is_half_open() {
        let rect = PixelRect::new(10, 20, 5, 5);
        assert!(rect.contains(PixelPos { x: 10, y: 20 }));
        assert!(rect.contains(PixelPos { x: 14, y: 24 }));
        assert!(!rect.contains(PixelPos { x: 15, y: 20 }));
        assert!(!rect.contains(PixelPos { x: 10, y: 25 }));
        assert!(!rect.contains(PixelPos { x: 9, y: 21 }));
    }

    #[test]
    fn snapshot_builder_preserves_event_order() {
        let snapshot = InputSnapshot::empty()
            .with_event(InputEvent::text("a"))
            .with_event(InputEvent::key(KeyPress::Enter))
            .with_event(InputEvent::click(1, 2))
            .with_window_size((1280, 768));

        assert_eq!(snapshot.window_size(), (1280, 768));
        assert_eq!(
            snapshot.events(),
            &[
                InputEvent::text("a"),
                InputEvent::key(KeyPress::Enter),
                InputEvent::click(1, 2),
            ]
        );
    }

    #[test]
    fn space_text_event_maps_to_space_key() {
        assert_eq!(
            InputEvent::text(" "),
            InputEvent::Key {
                key: KeyPress::Space,
                text: Some(" ".to_string()),
                repeat: false,
            }
        );
    }
}
