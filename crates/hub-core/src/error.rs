use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HubError {
    /// Short error code string for operator-facing output.
    pub fn code(&self) -> &'static str {
        match self {
            HubError::Config(_) => "CONFIG_ERROR",
            HubError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
