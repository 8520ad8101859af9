//! Settings persistence under the platform config directory.

use shared::settings::RuntimeSettings;
use std::fs;
use std::path::{Path, PathBuf};

fn config_path() -> Option<PathBuf> {
    if let Some(proj) = directories::ProjectDirs::from("com.local", "Deskmate", "Deskmate") {
        let p = proj.config_dir().join("settings.json");
        let _ = fs::create_dir_all(proj.config_dir());
        Some(p)
    } else {
        None
    }
}

fn read_settings(path: &Path) -> Option<RuntimeSettings> {
    let bytes = fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn write_settings(path: &Path, settings: &RuntimeSettings) {
    match serde_json::to_vec_pretty(settings) {
        Ok(json) => {
            if let Err(e) = fs::write(path, json) {
                tracing::warn!(?path, error = %e, "failed to save settings");
            }
        }
        Err(e) => tracing::warn!(error = %e, "failed to serialize settings"),
    }
}

/// Load settings, falling back to defaults. The bool is true on a fresh
/// install (no readable settings file).
pub fn load_settings_or_default() -> (RuntimeSettings, bool) {
    if let Some(path) = config_path() {
        if path.exists() {
            match read_settings(&path) {
                Some(settings) => return (settings, false),
                None => tracing::warn!(?path, "settings file unreadable, using defaults"),
            }
        }
    }
    (RuntimeSettings::default(), true)
}

pub fn save_settings(settings: &RuntimeSettings) {
    if let Some(path) = config_path() {
        write_settings(&path, settings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_survive_a_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = RuntimeSettings {
            model: "tinyllama".into(),
            temperature: 0.3,
            ..Default::default()
        };
        write_settings(&path, &settings);

        let loaded = read_settings(&path).unwrap();
        assert_eq!(loaded.model, "tinyllama");
        assert!((loaded.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(loaded.base_url, settings.base_url);
    }

    #[test]
    fn unreadable_settings_read_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, b"not json").unwrap();
        assert!(read_settings(&path).is_none());
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_settings(&dir.path().join("nope.json")).is_none());
    }
}
