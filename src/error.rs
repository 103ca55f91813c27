use thiserror::Error;

pub type Result<T, E = BaseError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum BaseError {
    #[error("failed to spawn thread `{name}`: {source}")]
    ThreadSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid thread name {0:?}: names cannot contain NUL bytes")]
    InvalidThreadName(String),
    #[error("thread `{0}` was already started")]
    ThreadAlreadyStarted(String),
    #[error("thread `{0}` was never started")]
    ThreadNotStarted(String),
    #[error("thread `{0}` was already joined or detached")]
    ThreadAlreadyJoined(String),
    #[error("thread `{name}` panicked: {message}")]
    ThreadPanicked { name: String, message: String },
    #[error("unknown task runner priority `{0}` (expected low, normal or high)")]
    InvalidPriority(String),
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
