use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Capture and upload configuration, persisted as one flat JSON object.
///
/// Paths are opaque strings. Nothing here checks that they exist; `test_path` is the only place
/// that touches the file system, and only when the user asks for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutomationSettings {
    pub league_client_path: String,
    pub obs_studio_path: String,
    pub recording_folder: String,
    pub auto_upload_to_youtube: bool,
    pub obs_scene_name: String,
    pub recording_quality: RecordingQuality,
    pub auto_start_recording: bool,
    pub watch_for_new_replays: bool,
    pub upload_after_recording: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingQuality {
    High,
    Medium,
    Low,
}

impl RecordingQuality {
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "High (1080p 60fps)",
            Self::Medium => "Medium (720p 60fps)",
            Self::Low => "Low (720p 30fps)",
        }
    }
}

impl Default for RecordingQuality {
    fn default() -> Self {
        Self::High
    }
}

/// Which executable or folder a path setting points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    League,
    Obs,
    Folder,
}

impl PathKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::League => "League Client",
            Self::Obs => "OBS Studio",
            Self::Folder => "recording folder",
        }
    }
}

fn default_data_dir_path() -> PathBuf {
    if let Some(dir) = std::env::var_os("RIFTCAST_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(target_os = "windows") {
        if let Some(base) = std::env::var_os("LOCALAPPDATA")
            .or_else(|| std::env::var_os("APPDATA"))
            .or_else(|| std::env::var_os("USERPROFILE"))
        {
            return PathBuf::from(base).join("riftcast");
        }
    }

    if cfg!(target_os = "macos") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("riftcast");
        }
    }

    if cfg!(target_os = "linux") {
        if let Some(dir) = std::env::var_os("XDG_DATA_HOME") {
            return PathBuf::from(dir).join("riftcast");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("riftcast");
        }
    }

    std::env::temp_dir().join("riftcast")
}

/// Directory holding `riftcast.db`. Not part of the persisted record.
pub fn default_data_dir() -> PathBuf {
    default_data_dir_path()
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            league_client_path: r"C:\Riot Games\League of Legends\LeagueClient.exe".to_string(),
            obs_studio_path: r"C:\Program Files\obs-studio\bin\64bit\obs64.exe".to_string(),
            recording_folder: r"C:\Users\%USERNAME%\Videos\LoL Replays".to_string(),
            auto_upload_to_youtube: true,
            obs_scene_name: "League of Legends Recording".to_string(),
            recording_quality: RecordingQuality::High,
            auto_start_recording: true,
            watch_for_new_replays: true,
            upload_after_recording: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_keys() {
        let value = serde_json::to_value(AutomationSettings::default()).expect("serialize");
        assert_eq!(value["recordingQuality"], "high");
        assert_eq!(value["autoUploadToYoutube"], true);
        assert_eq!(value["obsSceneName"], "League of Legends Recording");
        assert!(value.get("league_client_path").is_none());
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let parsed: AutomationSettings =
            serde_json::from_str(r#"{"recordingQuality":"low"}"#).expect("parse");
        assert_eq!(parsed.recording_quality, RecordingQuality::Low);
        assert_eq!(
            parsed.league_client_path,
            AutomationSettings::default().league_client_path
        );
    }

    #[test]
    fn quality_parse_is_case_insensitive() {
        assert_eq!(RecordingQuality::parse(" Medium "), Some(RecordingQuality::Medium));
        assert_eq!(RecordingQuality::parse("ultra"), None);
    }
}
