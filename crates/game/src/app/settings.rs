use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

pub(crate) const SETTINGS_RELATIVE_PATH: &str = "config/settings.json";

/// Tunables read from `assets/config/settings.json`. Every field is
/// optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameSettings {
    pub(crate) player_speed_px: i32,
    pub(crate) exit_nudge_px: i32,
    pub(crate) player_spawn_tile: [i32; 2],
    pub(crate) script_step_budget: u64,
    pub(crate) cursor_blink_ticks: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            player_speed_px: 5,
            exit_nudge_px: 20,
            player_spawn_tile: [58, 4],
            script_step_budget: 10_000,
            cursor_blink_ticks: 30,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings {path} at {field}: {message}")]
    Parse {
        path: PathBuf,
        field: String,
        message: String,
    },
    #[error("invalid settings {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// A missing file yields the defaults; anything unreadable or malformed is
/// an error.
pub(crate) fn load_settings(path: &Path) -> Result<GameSettings, SettingsError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "settings_defaulted");
            return Ok(GameSettings::default());
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let settings = parse_settings(path, &raw)?;
    info!(
        path = %path.display(),
        player_speed_px = settings.player_speed_px,
        script_step_budget = settings.script_step_budget,
        "settings_loaded"
    );
    Ok(settings)
}

fn parse_settings(path: &Path, raw: &str) -> Result<GameSettings, SettingsError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let settings: GameSettings = serde_path_to_error::deserialize(&mut deserializer).map_err(
        |error| {
            let field = error.path().to_string();
            SettingsError::Parse {
                path: path.to_path_buf(),
                field,
                message: error.into_inner().to_string(),
            }
        },
    )?;
    validate(path, &settings)?;
    Ok(settings)
}

fn validate(path: &Path, settings: &GameSettings) -> Result<(), SettingsError> {
    let invalid = |message: &str| SettingsError::Invalid {
        path: path.to_path_buf(),
        message: message.to_string(),
    };
    if settings.player_speed_px <= 0 {
        return Err(invalid("player_speed_px must be greater than zero"));
    }
    if settings.exit_nudge_px < 0 {
        return Err(invalid("exit_nudge_px must not be negative"));
    }
    if settings.player_spawn_tile.iter().any(|axis| *axis < 0) {
        return Err(invalid("player_spawn_tile must not be negative"));
    }
    if settings.script_step_budget == 0 {
        return Err(invalid("script_step_budget must be greater than zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_settings(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("settings.json");
        fs::write(&path, content).expect("write");
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().expect("temp");
        let settings = load_settings(&dir.path().join("absent.json")).expect("settings");
        assert_eq!(settings, GameSettings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().expect("temp");
        let path = write_settings(&dir, r#"{ "player_speed_px": 8 }"#);
        let settings = load_settings(&path).expect("settings");
        assert_eq!(settings.player_speed_px, 8);
        assert_eq!(settings.exit_nudge_px, 20);
        assert_eq!(settings.player_spawn_tile, [58, 4]);
    }

    #[test]
    fn type_errors_name_the_field_path() {
        let dir = TempDir::new().expect("temp");
        let path = write_settings(&dir, r#"{ "player_spawn_tile": [58, "four"] }"#);
        let err = load_settings(&path).expect_err("malformed");
        match err {
            SettingsError::Parse { field, .. } => assert_eq!(field, "player_spawn_tile[1]"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = TempDir::new().expect("temp");
        let path = write_settings(&dir, r#"{ "player_sped_px": 8 }"#);
        assert!(matches!(
            load_settings(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn zero_speed_is_invalid() {
        let dir = TempDir::new().expect("temp");
        let path = write_settings(&dir, r#"{ "player_speed_px": 0 }"#);
        let err = load_settings(&path).expect_err("invalid");
        assert!(err.to_string().contains("player_speed_px"));
    }

    #[test]
    fn shipped_settings_match_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../assets")
            .join(SETTINGS_RELATIVE_PATH);
        assert_eq!(load_settings(&path).expect("settings"), GameSettings::default());
    }
}
