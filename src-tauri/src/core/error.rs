use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutomationError {
    /// A setting value is missing, of the wrong kind, or points nowhere.
    #[error("invalid setting {field}: {reason}")]
    Configuration { field: String, reason: String },
    /// An external application could not be started.
    #[error("failed to launch {target}: {reason}")]
    Launch { target: String, reason: String },
    #[error("upload failed: {0}")]
    Upload(String),
    /// The analytics source could not be read.
    #[error("analytics query failed: {0}")]
    Query(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("an automation run is already in progress")]
    AlreadyRunning,
    #[error("cancelled")]
    Cancelled,
}

impl AutomationError {
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn launch(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Launch {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

impl From<AutomationError> for String {
    fn from(err: AutomationError) -> Self {
        err.to_string()
    }
}
