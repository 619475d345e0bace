use thiserror::Error;

/// Fallback shown when the scoring service gives no usable error text.
pub const GENERIC_SERVER_ERROR: &str = "Server error";

#[derive(Error, Debug)]
pub enum TopsisError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration '{field}'")]
    MissingConfigError { field: String },

    #[error("Dataset '{name}' is empty")]
    EmptyDataset { name: String },

    #[error("Dataset '{name}' has no criterion columns (found {columns} column(s))")]
    NoCriteria { name: String, columns: usize },
}

impl TopsisError {
    /// Short text suitable for the terminal, without the variant prefix noise.
    pub fn user_friendly_message(&self) -> String {
        match self {
            TopsisError::EmptyDataset { name } => {
                format!("The file '{}' is empty, no criteria could be detected", name)
            }
            TopsisError::NoCriteria { name, .. } => format!(
                "The file '{}' needs an identifier column followed by at least one criterion column",
                name
            ),
            TopsisError::IoError(e) => format!("Could not read file: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TopsisError>;

/// Failure of a scoring request.
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("scoring request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("scoring service returned {status}: {}", .message.as_deref().unwrap_or(GENERIC_SERVER_ERROR))]
    Rejected {
        status: u16,
        message: Option<String>,
    },
}

impl ScoringError {
    /// The service's own `error` text as sent (even when empty), otherwise the generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            ScoringError::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            _ => GENERIC_SERVER_ERROR.to_string(),
        }
    }
}

/// Failure of the notification relay. Never affects the scoring outcome.
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("notification relay is not configured")]
    NotConfigured,

    #[error("an email address is required to send a notification")]
    MissingEmail,

    #[error("the result has no downloadable artifact to link")]
    MissingLink,

    #[error("invalid result link: {0}")]
    InvalidLink(#[from] url::ParseError),

    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification relay returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl NotificationError {
    pub fn user_message(&self) -> String {
        format!("Result email could not be sent: {}", self)
    }
}
