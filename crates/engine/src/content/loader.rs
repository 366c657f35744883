use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::app::{TileLayer, TileMap, TileWorld};

use super::error::{ContentErrorCode, ContentLoadError};
use super::map_source::{parse_map_source, LayerSource, TILE_LAYER_TYPE};
use super::tileset::{load_tileset, CollidableSet, TilesetRegistry};

/// Loads a map, its tilesets and their images. Any failure is fatal.
pub fn load_tile_world(map_path: &Path) -> Result<TileWorld, ContentLoadError> {
    let raw = fs::read_to_string(map_path).map_err(|source| {
        ContentLoadError::new(
            ContentErrorCode::ReadFile,
            format!("failed to read map: {source}"),
            map_path,
        )
    })?;
    let source = parse_map_source(map_path, &raw)?;
    let tile_size = (source.tilewidth, source.tileheight);

    let base_dir = map_path.parent().unwrap_or_else(|| Path::new("."));
    let mut tilesets = Vec::with_capacity(source.tilesets.len());
    let mut collidable_gids = Vec::new();
    for reference in &source.tilesets {
        let tileset_path = base_dir.join(&reference.source);
        let loaded = load_tileset(&tileset_path, reference.firstgid, tile_size)?;
        debug!(
            path = %tileset_path.display(),
            first_gid = reference.firstgid,
            columns = loaded.tileset.columns,
            collidable = loaded.collidable_gids.len(),
            "tileset_loaded"
        );
        collidable_gids.extend(loaded.collidable_gids);
        tilesets.push(loaded.tileset);
    }

    let layers: Vec<TileLayer> = source.layers.into_iter().map(layer_from_source).collect();
    let map = TileMap::new(tile_size, (source.width, source.height), layers).map_err(|error| {
        ContentLoadError::new(ContentErrorCode::InvalidValue, error.to_string(), map_path)
    })?;

    let collidable: CollidableSet = collidable_gids.into_iter().collect();
    info!(
        path = %map_path.display(),
        width_tiles = map.width_tiles(),
        height_tiles = map.height_tiles(),
        layers = map.layers().len(),
        tilesets = tilesets.len(),
        collidable = collidable.len(),
        "tile_world_loaded"
    );

    Ok(TileWorld::new(map, TilesetRegistry::new(tilesets, collidable)))
}

fn layer_from_source(layer: LayerSource) -> TileLayer {
    if layer.kind == TILE_LAYER_TYPE {
        TileLayer::tiles(layer.name, layer.data)
    } else {
        TileLayer::object(layer.name)
    }
}
