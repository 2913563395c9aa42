use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutobuyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Device command `{command}` failed (exit {code:?}): {stderr}")]
    Command {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Device command `{command}` timed out after {secs}s")]
    CommandTimeout { command: String, secs: u64 },

    #[error("Screen capture error: {0}")]
    Capture(String),

    #[error("Text recognition error: {0}")]
    Recognition(String),

    #[error("Annotation error: {0}")]
    Annotation(String),

    #[error("Cleanup error: {0}")]
    Cleanup(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl AutobuyError {
    /// True for failures reported by the device command gateway itself.
    pub fn is_command_failure(&self) -> bool {
        matches!(
            self,
            AutobuyError::Command { .. } | AutobuyError::CommandTimeout { .. }
        )
    }
}

pub type AutobuyResult<T> = Result<T, AutobuyError>;
