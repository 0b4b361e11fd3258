pub type Result<T> = std::result::Result<T, Error>;

/// Error type returned by user work and completion functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Arity or type mismatch at the call boundary. The message is the one
    /// raised to the host verbatim.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("work failed: {0}")]
    WorkFailure(String),

    #[error("callback failed: {0}")]
    CallbackFailure(String),

    #[error("executor error: {0}")]
    Executor(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("event loop is shut down")]
    Shutdown,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn work_failure<S: Into<String>>(msg: S) -> Self {
        Error::WorkFailure(msg.into())
    }

    pub fn callback_failure<S: Into<String>>(msg: S) -> Self {
        Error::CallbackFailure(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }

    pub fn is_work_failure(&self) -> bool {
        matches!(self, Error::WorkFailure(_))
    }

    pub fn is_callback_failure(&self) -> bool {
        matches!(self, Error::CallbackFailure(_))
    }
}
