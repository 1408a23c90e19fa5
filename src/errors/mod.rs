use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // Registry errors
    #[error("Invalid source name: {0}")]
    InvalidSourceName(String),

    #[error("Source already exists: {0}")]
    SourceAlreadyExists(String),

    #[error("Source not registered: {0}")]
    SourceNotRegistered(String),

    #[error("Not authorized")]
    Unauthorized,

    // Provider errors
    #[error("Content provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Source not found upstream: {0}")]
    SourceNotFound(String),

    // Delivery errors
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Messaging error: {0}")]
    Messaging(String),

    // Network errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // Storage errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store is corrupted: {0}")]
    StoreCorrupted(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // User input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Registry worker stopped")]
    RegistryClosed,
}

impl From<reddit::RedditError> for RelayError {
    fn from(err: reddit::RedditError) -> Self {
        if err.is_not_found() {
            RelayError::SourceNotFound(err.to_string())
        } else {
            RelayError::ProviderUnavailable(err.to_string())
        }
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
