use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmaError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Subject property not found: {0}")]
    MissingSubject(String),

    #[error("Subject property record is malformed: {0}")]
    MalformedSubject(String),

    #[error("{source_name} fetch failed: {message}")]
    Fetch { source_name: String, message: String },
}

impl CmaError {
    pub fn fetch(source_name: &str, message: impl Into<String>) -> Self {
        CmaError::Fetch {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CmaError>;
