mod error;
mod loader;
mod map_source;
mod tileset;

pub use error::{ContentErrorCode, ContentLoadError, SourceLocation};
pub use loader::load_tile_world;
pub use tileset::{CollidableSet, Tileset, TilesetImage, TilesetRegistry};
