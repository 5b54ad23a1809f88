use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    pub id: String,
    pub file_name: String,
    pub path: String,
    #[serde(default)]
    pub champion: Option<String>,
    pub discovered_at: i64,
}

impl Replay {
    /// New replay record for a file path. Windows and Unix separators are both accepted.
    pub fn discovered(path: &str, champion: Option<String>) -> Self {
        let path = path.trim();
        let file_name = path
            .rsplit(['/', '\\'])
            .find(|part| !part.is_empty())
            .unwrap_or(path)
            .to_string();
        let champion = champion
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_name,
            path: path.to_string(),
            champion,
            discovered_at: now_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Completed,
    Failed,
    Cancelled,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "uploading" => Self::Uploading,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadJob {
    pub id: String,
    #[serde(default)]
    pub replay_id: Option<String>,
    pub file_path: String,
    pub title: String,
    pub status: UploadStatus,
    pub progress: u8,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub error: Option<String>,
}

/// Video handed to the uploader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoFile {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub privacy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathCheck {
    pub kind: crate::settings::PathKind,
    pub path: String,
    pub resolved: String,
    pub exists: bool,
    pub is_file: bool,
    pub executable: bool,
}

pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}
