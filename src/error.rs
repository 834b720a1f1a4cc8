use rework::SubscriptionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReworkError {
    #[error(transparent)]
    Rework(#[from] rework::Error),

    #[error("Invalid plugin: {0}")]
    Subscription(#[from] SubscriptionError),

    #[error("Validation failed:\n{0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("A logger was already installed")]
    Logger(#[from] log::SetLoggerError),
}

// Create a type alias for convenience
pub type Result<T> = std::result::Result<T, ReworkError>;
