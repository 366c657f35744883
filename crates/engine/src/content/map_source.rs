use std::path::Path;

use serde::Deserialize;

use super::error::{ContentErrorCode, ContentLoadError};

pub(crate) const TILE_LAYER_TYPE: &str = "tilelayer";

/// On-disk shape of a Tiled JSON map. Only the fields the world needs.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MapSource {
    pub tilewidth: u32,
    pub tileheight: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub tilesets: Vec<TilesetRefSource>,
    #[serde(default)]
    pub layers: Vec<LayerSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TilesetRefSource {
    pub firstgid: u32,
    pub source: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LayerSource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data: Vec<u32>,
}

pub(crate) fn parse_map_source(file_path: &Path, raw: &str) -> Result<MapSource, ContentLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let source = serde_path_to_error::deserialize::<_, MapSource>(&mut deserializer).map_err(
        |error| {
            let path = error.path().to_string();
            let inner = error.into_inner();
            let message = if path.is_empty() || path == "." {
                format!("parse map json: {inner}")
            } else {
                format!("parse map json at {path}: {inner}")
            };
            ContentLoadError::new(ContentErrorCode::JsonMalformed, message, file_path)
                .at(inner.line(), inner.column())
        },
    )?;

    for (field, value) in [
        ("tilewidth", source.tilewidth),
        ("tileheight", source.tileheight),
        ("width", source.width),
        ("height", source.height),
    ] {
        if value == 0 {
            return Err(ContentLoadError::new(
                ContentErrorCode::InvalidValue,
                format!("map field '{field}' must be greater than zero"),
                file_path,
            ));
        }
    }

    Ok(source)
}
