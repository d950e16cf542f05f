
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShelfkeeperError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("At least one filter parameter is required")]
    InvalidFilter,
    #[error("Template account '{0}' doesn't exist!")]
    TemplateNotFound(String),
    #[error("Record format error on line {line}: {message}")]
    RecordFormat { line: u64, message: String },
    #[error("Hashing error: {0}")]
    Hashing(String),
    #[error("Store error: {0}")]
    Store(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl ShelfkeeperError {
    /// Errors caused by how the tool was invoked rather than by the store or the input data.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::InvalidFilter | Self::TemplateNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ShelfkeeperError>;

// Helper conversions
impl From<rusqlite::Error> for ShelfkeeperError {
    fn from(e: rusqlite::Error) -> Self { Self::Store(e.to_string()) }
}
impl From<config::ConfigError> for ShelfkeeperError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<std::io::Error> for ShelfkeeperError {
    fn from(e: std::io::Error) -> Self { Self::Io(e.to_string()) }
}
impl From<csv::Error> for ShelfkeeperError {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            return Self::Io(e.to_string());
        }
        let line = e.position().map(|p| p.line()).unwrap_or(0);
        Self::RecordFormat { line, message: e.to_string() }
    }
}
