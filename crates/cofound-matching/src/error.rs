use thiserror::Error;

/// Failures of match and messaging operations. Every variant is detected
/// before anything is written.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("You already sent an invitation to this person")]
    AlreadyRequested,

    #[error("Already connected with this person")]
    AlreadyConnected,

    #[error("{message}")]
    RateLimited { message: String, remaining: u32 },

    #[error("storage failure")]
    Store(#[from] anyhow::Error),
}

/// The stable category a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Forbidden,
    InvalidState,
    RateLimited,
    Internal,
}

impl MatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::InvalidState(_) | Self::AlreadyRequested | Self::AlreadyConnected => {
                ErrorKind::InvalidState
            }
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Store(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub(crate) fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;
