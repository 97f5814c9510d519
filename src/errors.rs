use std::fmt;

#[derive(Debug)]
pub enum AppError {
    /// Network request failed
    NetworkError(String),
    /// Session driver operation failed
    SessionError(String),
    /// Invalid URL format
    UrlError(String),
    /// Settings file missing, malformed or freshly bootstrapped
    ConfigError(String),
    /// Mail composition or SMTP delivery failed
    MailError(String),
    /// Bounded poll expired before the awaited condition held
    Timeout { waiting_for: String, timeout_ms: u64 },
    /// Recovery attempts for a failed download navigation ran out
    RetryExhausted { url: String, attempts: u32 },
    /// IO operation failed
    IoError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NetworkError(msg) => write!(f, "Network error: {msg}"),
            AppError::SessionError(msg) => write!(f, "Session error: {msg}"),
            AppError::UrlError(msg) => write!(f, "Invalid URL: {msg}"),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
            AppError::MailError(msg) => write!(f, "Mail error: {msg}"),
            AppError::Timeout {
                waiting_for,
                timeout_ms,
            } => {
                write!(f, "Timed out after {timeout_ms}ms waiting for {waiting_for}")
            }
            AppError::RetryExhausted { url, attempts } => {
                write!(f, "Gave up on '{url}' after {attempts} attempt(s)")
            }
            AppError::IoError(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

// Conversion implementations for common errors
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::NetworkError(err.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::UrlError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<lettre::error::Error> for AppError {
    fn from(err: lettre::error::Error) -> Self {
        AppError::MailError(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for AppError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        AppError::MailError(err.to_string())
    }
}

impl From<lettre::address::AddressError> for AppError {
    fn from(err: lettre::address::AddressError) -> Self {
        AppError::MailError(err.to_string())
    }
}

// Custom type alias for Results in this application
pub type AppResult<T> = Result<T, AppError>;
