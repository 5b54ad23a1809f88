use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::core::error::AutomationError;
use crate::core::storage;
use crate::settings::{AutomationSettings, PathKind, RecordingQuality};
use crate::types::PathCheck;

/// Key of the single settings entry in the key/value table.
pub const SETTINGS_KEY: &str = "automationSettings";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Path,
    Text,
    Quality,
    Flag,
}

fn field_kind(key: &str) -> Option<FieldKind> {
    match key {
        "leagueClientPath" | "obsStudioPath" | "recordingFolder" => Some(FieldKind::Path),
        "obsSceneName" => Some(FieldKind::Text),
        "recordingQuality" => Some(FieldKind::Quality),
        "autoUploadToYoutube" | "autoStartRecording" | "watchForNewReplays"
        | "uploadAfterRecording" => Some(FieldKind::Flag),
        _ => None,
    }
}

fn validate(key: &str, kind: FieldKind, value: Value) -> Result<Value, AutomationError> {
    match kind {
        FieldKind::Path | FieldKind::Text => match value {
            Value::String(text) => Ok(Value::String(text)),
            _ => Err(AutomationError::configuration(key, "expected a string")),
        },
        FieldKind::Quality => {
            let quality = value
                .as_str()
                .and_then(RecordingQuality::parse)
                .ok_or_else(|| {
                    AutomationError::configuration(key, "expected one of high, medium, low")
                })?;
            Ok(Value::String(quality.as_str().to_string()))
        }
        FieldKind::Flag => match value {
            Value::Bool(_) => Ok(value),
            _ => Err(AutomationError::configuration(key, "expected true or false")),
        },
    }
}

/// Owns the automation settings for the lifetime of the app.
pub struct SettingsStore {
    data_dir: PathBuf,
    current: AutomationSettings,
}

impl SettingsStore {
    /// Reads the persisted record, or starts from defaults when there is none.
    pub fn load(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let current = match read_persisted(&data_dir) {
            Ok(Some(settings)) => settings,
            Ok(None) => AutomationSettings::default(),
            Err(err) => {
                log::warn!("failed to load automation settings, using defaults: {err}");
                AutomationSettings::default()
            }
        };

        Self { data_dir, current }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn get(&self) -> &AutomationSettings {
        &self.current
    }

    /// Merges one field, addressed by its JSON key. The record is untouched on error.
    pub fn update(&mut self, key: &str, value: Value) -> Result<&AutomationSettings, AutomationError> {
        let kind = field_kind(key)
            .ok_or_else(|| AutomationError::configuration(key, "unknown setting"))?;
        let value = validate(key, kind, value)?;

        let mut record = serde_json::to_value(&self.current)
            .map_err(|err| AutomationError::Storage(err.to_string()))?;
        if let Some(object) = record.as_object_mut() {
            object.insert(key.to_string(), value);
        }
        self.current = serde_json::from_value(record)
            .map_err(|err| AutomationError::configuration(key, err.to_string()))?;
        Ok(&self.current)
    }

    pub fn replace(&mut self, settings: AutomationSettings) {
        self.current = settings;
    }

    pub fn save(&self) -> Result<(), AutomationError> {
        let payload = serde_json::to_string(&self.current)
            .map_err(|err| AutomationError::Storage(err.to_string()))?;
        storage::save_setting_value(&self.data_dir, SETTINGS_KEY, &payload)
            .map_err(AutomationError::Storage)
    }

    /// Replaces in-memory edits with the persisted record. Without one, keeps the current record.
    pub fn reload(&mut self) -> Result<&AutomationSettings, AutomationError> {
        if let Some(settings) = read_persisted(&self.data_dir)? {
            self.current = settings;
        }
        Ok(&self.current)
    }
}

fn read_persisted(data_dir: &Path) -> Result<Option<AutomationSettings>, AutomationError> {
    let raw = storage::load_setting_value(data_dir, SETTINGS_KEY).map_err(AutomationError::Storage)?;
    raw.map(|raw| {
        serde_json::from_str::<AutomationSettings>(&raw)
            .map_err(|err| AutomationError::Storage(err.to_string()))
    })
    .transpose()
}

/// Checks that a configured path exists. Never starts anything.
pub fn check_path(path: &str, kind: PathKind) -> PathCheck {
    let resolved = storage::resolve_user_path(path);
    let metadata = std::fs::metadata(&resolved).ok();
    let exists = metadata.is_some();
    let is_file = metadata.as_ref().map(|meta| meta.is_file()).unwrap_or(false);
    let executable = is_file && is_executable(&resolved);

    PathCheck {
        kind,
        path: path.to_string(),
        resolved: resolved.to_string_lossy().to_string(),
        exists,
        is_file,
        executable,
    }
}

impl PathCheck {
    /// Whether the path is usable for its kind: a folder for recordings, a file otherwise.
    pub fn usable(&self) -> bool {
        match self.kind {
            PathKind::Folder => self.exists && !self.is_file,
            PathKind::League | PathKind::Obs => self.is_file,
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|metadata| metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::temp_data_dir;
    use serde_json::json;

    #[test]
    fn starts_from_defaults_without_persisted_record() {
        let dir = temp_data_dir();
        let store = SettingsStore::load(&dir);
        assert_eq!(store.get(), &AutomationSettings::default());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_then_reload_reproduces_record() {
        let dir = temp_data_dir();
        let mut store = SettingsStore::load(&dir);
        store
            .update("recordingQuality", json!("medium"))
            .expect("quality");
        store
            .update("autoUploadToYoutube", json!(false))
            .expect("flag");
        store.save().expect("save");
        let saved = store.get().clone();

        let reopened = SettingsStore::load(&dir);
        assert_eq!(reopened.get(), &saved);
        assert_eq!(reopened.get().recording_quality, RecordingQuality::Medium);
        assert!(!reopened.get().auto_upload_to_youtube);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn reload_discards_unsaved_edits() {
        let dir = temp_data_dir();
        let mut store = SettingsStore::load(&dir);
        store.save().expect("save");
        store
            .update("obsSceneName", json!("Scrims"))
            .expect("scene");
        store.reload().expect("reload");
        assert_eq!(store.get().obs_scene_name, "League of Legends Recording");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn update_rejects_wrong_kinds_and_keeps_record() {
        let dir = temp_data_dir();
        let mut store = SettingsStore::load(&dir);
        let before = store.get().clone();

        assert!(matches!(
            store.update("recordingQuality", json!("ultra")),
            Err(AutomationError::Configuration { .. })
        ));
        assert!(store.update("watchForNewReplays", json!("yes")).is_err());
        assert!(store.update("obsStudioPath", json!(42)).is_err());
        assert!(store.update("youtubeToken", json!("x")).is_err());
        assert_eq!(store.get(), &before);
    }

    #[test]
    fn path_fields_accept_any_string() {
        let dir = temp_data_dir();
        let mut store = SettingsStore::load(&dir);
        store
            .update("leagueClientPath", json!("  not/a/real/path  "))
            .expect("path");
        assert_eq!(store.get().league_client_path, "  not/a/real/path  ");
    }

    #[test]
    fn text_fields_are_stored_as_given() {
        let dir = temp_data_dir();
        let mut store = SettingsStore::load(&dir);
        store.update("obsSceneName", json!("Scrims ")).expect("scene");
        assert_eq!(store.get().obs_scene_name, "Scrims ");

        store.save().expect("save");
        store.reload().expect("reload");
        assert_eq!(store.get().obs_scene_name, "Scrims ");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn check_path_reports_existing_and_missing() {
        let dir = temp_data_dir();
        std::fs::create_dir_all(&dir).expect("dir");
        let file = dir.join("LeagueClient.exe");
        std::fs::write(&file, b"stub").expect("file");

        let found = check_path(&file.to_string_lossy(), PathKind::League);
        assert!(found.exists && found.is_file && found.usable());

        let folder = check_path(&dir.to_string_lossy(), PathKind::Folder);
        assert!(folder.usable());

        let missing = check_path(&dir.join("obs64.exe").to_string_lossy(), PathKind::Obs);
        assert!(!missing.exists);
        assert!(!missing.usable());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
