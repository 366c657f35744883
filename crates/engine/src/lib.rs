use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;

pub use app::{
    clamp_to_map, compute_camera_offset, draw_text_clipped, resolve_movement, run_app,
    text_width_px, world_to_screen_px, AppError, Camera2D, Entity, EntityId, FrameMut,
    InputAction, InputEvent, InputSnapshot, KeyPress, LayerKind, LoopConfig, LoopMetricsSnapshot,
    MoveIntent, PixelPos, PixelRect, Renderer, Scene, SceneWorld, TextBuffer, TileLayer, TileMap,
    TileWorld, TilemapError, UiElement, Viewport, GLYPH_ADVANCE_PX, LINE_ADVANCE_PX,
    MAX_LINE_CHARS, TEXT_SCALE,
};
pub use content::{
    load_tile_world, CollidableSet, ContentErrorCode, ContentLoadError, SourceLocation, Tileset,
    TilesetImage, TilesetRegistry,
};

pub const ROOT_ENV_VAR: &str = "CODEMERE_ROOT";
pub const MAP_ENV_VAR: &str = "CODEMERE_MAP";
const DEFAULT_MAP_RELATIVE_PATH: &str = "map/codemere.tmj";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub map_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "CODEMERE_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/codemere\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let assets_dir = root.join("assets");
    let map_path = resolve_map_path(&root, &assets_dir)?;

    Ok(AppPaths {
        root,
        assets_dir,
        map_path,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

/// `CODEMERE_MAP` may be absolute or relative to the project root.
fn resolve_map_path(root: &Path, assets_dir: &Path) -> Result<PathBuf, StartupError> {
    match env::var(MAP_ENV_VAR) {
        Ok(value) => Ok(map_override_path(root, Path::new(value.trim()))),
        Err(env::VarError::NotPresent) => Ok(assets_dir.join(DEFAULT_MAP_RELATIVE_PATH)),
        Err(source) => Err(StartupError::EnvVar {
            var: MAP_ENV_VAR,
            source,
        }),
    }
}

fn map_override_path(root: &Path, raw: &Path) -> PathBuf {
    if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        root.join(raw)
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let cwd = env::current_dir().expect("cwd");
        assert!(!is_repo_marker(&cwd.join("definitely_not_a_marker")));
    }

    #[test]
    fn repo_marker_accepts_cargo_toml_with_assets() {
        let temp = tempfile::TempDir::new().expect("temp");
        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("write");
        fs::create_dir_all(temp.path().join("assets")).expect("mkdir");
        assert!(is_repo_marker(temp.path()));
    }

    #[test]
    fn relative_map_override_resolves_against_root() {
        let root = Path::new("/srv/codemere");
        assert_eq!(
            map_override_path(root, Path::new("assets/map/alt.tmj")),
            PathBuf::from("/srv/codemere/assets/map/alt.tmj")
        );
    }

    #[test]
    fn absolute_map_override_is_kept() {
        let root = Path::new("/srv/codemere");
        let absolute = env::temp_dir().join("alt.tmj");
        assert_eq!(map_override_path(root, &absolute), absolute);
    }
}
