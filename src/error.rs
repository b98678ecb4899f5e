use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Failed to connect to Chrome: {0}")]
    ConnectionFailed(String),

    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Element '{label}' is not visible")]
    ElementNotVisible { label: String },

    #[error("Menu did not open after {attempts} attempt(s) on trigger {trigger}")]
    MenuDidNotOpen { trigger: String, attempts: u32 },

    #[error("Expected a native dialog: {0}")]
    DialogExpected(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No page available")]
    NoPage,

    #[error("CDP error: {0}")]
    CdpError(#[from] chromiumoxide::error::CdpError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BrowserError>;
