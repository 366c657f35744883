use thiserror::Error;

use crate::content::TilesetRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerKind {
    /// Row-major global tile ids. May be shorter than the nominal grid.
    Tile(Vec<u32>),
    /// Declarative layers (object groups, image layers). Never drawn as tiles
    /// and never collide.
    Object,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayer {
    pub name: String,
    pub kind: LayerKind,
}

impl TileLayer {
    pub fn tiles(name: impl Into<String>, data: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            kind: LayerKind::Tile(data),
        }
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: LayerKind::Object,
        }
    }

    pub fn tile_data(&self) -> Option<&[u32]> {
        match &self.kind {
            LayerKind::Tile(data) => Some(data),
            LayerKind::Object => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TilemapError {
    #[error("map dimension '{field}' must be greater than zero")]
    ZeroDimension { field: &'static str },
}

/// Decoded level grid. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMap {
    tile_width: u32,
    tile_height: u32,
    width_tiles: u32,
    height_tiles: u32,
    layers: Vec<TileLayer>,
}

impl TileMap {
    pub fn new(
        tile_size: (u32, u32),
        size_tiles: (u32, u32),
        layers: Vec<TileLayer>,
    ) -> Result<Self, TilemapError> {
        for (field, value) in [
            ("tile_width", tile_size.0),
            ("tile_height", tile_size.1),
            ("width_tiles", size_tiles.0),
            ("height_tiles", size_tiles.1),
        ] {
            if value == 0 {
                return Err(TilemapError::ZeroDimension { field });
            }
        }
        Ok(Self {
            tile_width: tile_size.0,
            tile_height: tile_size.1,
            width_tiles: size_tiles.0,
            height_tiles: size_tiles.1,
            layers,
        })
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn width_tiles(&self) -> u32 {
        self.width_tiles
    }

    pub fn height_tiles(&self) -> u32 {
        self.height_tiles
    }

    pub fn layers(&self) -> &[TileLayer] {
        &self.layers
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width_tiles.saturating_mul(self.tile_width),
            self.height_tiles.saturating_mul(self.tile_height),
        )
    }

    pub fn index_of(&self, tile_x: i32, tile_y: i32) -> Option<usize> {
        if tile_x < 0 || tile_y < 0 {
            return None;
        }
        let (x, y) = (tile_x as u32, tile_y as u32);
        if x >= self.width_tiles || y >= self.height_tiles {
            return None;
        }
        Some(y as usize * self.width_tiles as usize + x as usize)
    }

    /// Global id at a cell of a layer. `0` for empty cells, object layers,
    /// cells outside the grid and indices past a short layer's data.
    pub fn tile_at(&self, layer_index: usize, tile_x: i32, tile_y: i32) -> u32 {
        let Some(index) = self.index_of(tile_x, tile_y) else {
            return 0;
        };
        self.layers
            .get(layer_index)
            .and_then(TileLayer::tile_data)
            .and_then(|data| data.get(index).copied())
            .unwrap_or(0)
    }

    pub fn pixel_to_tile(&self, px: i32, py: i32) -> (i32, i32) {
        (
            px.div_euclid(self.tile_width as i32),
            py.div_euclid(self.tile_height as i32),
        )
    }
}

/// Map plus the tileset registry it references.
#[derive(Debug, Clone)]
pub struct TileWorld {
    map: TileMap,
    tilesets: TilesetRegistry,
}

impl TileWorld {
    pub fn new(map: TileMap, tilesets: TilesetRegistry) -> Self {
        Self { map, tilesets }
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn tilesets(&self) -> &TilesetRegistry {
        &self.tilesets
    }

    /// True when any tile layer holds a collidable id at the cell containing
    /// the pixel. Pixels outside the map never collide.
    pub fn is_collidable(&self, px: i32, py: i32) -> bool {
        let (tile_x, tile_y) = self.map.pixel_to_tile(px, py);
        let Some(index) = self.map.index_of(tile_x, tile_y) else {
            return false;
        };
        self.map
            .layers()
            .iter()
            .filter_map(TileLayer::tile_data)
            .filter_map(|data| data.get(index).copied())
            .any(|gid| self.tilesets.is_collidable_gid(gid))
    }
}
