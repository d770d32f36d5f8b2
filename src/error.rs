use thiserror::Error;

/// Errors produced at the backend boundary.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("user already responded to this poll")]
    AlreadyResponded,
    #[error("poll not found")]
    PollNotFound,
    #[error("no quality control question available")]
    NoChallengeAvailable,
    #[error("malformed backend response: {0}")]
    InvalidResponse(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors produced by the core components.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("not signed in")]
    AuthenticationRequired,
    #[error("quality control not passed")]
    GateRequired,
    #[error("no choice selected")]
    NoSelection,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ApiError {
    /// Short, non-technical string for display. Raw transport bodies are
    /// never surfaced verbatim.
    pub fn user_message(&self) -> &'static str {
        match self {
            ApiError::Transport(_) => "Could not reach the server. Please try again.",
            ApiError::AlreadyResponded => "You have already voted on this poll.",
            ApiError::PollNotFound => "Poll not found.",
            ApiError::NoChallengeAvailable => "No quality control question is available right now.",
            ApiError::InvalidResponse(_) | ApiError::Backend(_) => {
                "Something went wrong. Please try again later."
            }
        }
    }
}

impl CoreError {
    pub fn user_message(&self) -> &'static str {
        match self {
            CoreError::AuthenticationRequired => "Please log in first.",
            CoreError::GateRequired => "Please pass the quality control check first.",
            CoreError::NoSelection => "Select an answer first.",
            CoreError::Api(e) => e.user_message(),
        }
    }

    /// True when the caller should redirect (to login or the gate path)
    /// rather than render an inline error.
    pub fn is_redirect(&self) -> bool {
        matches!(
            self,
            CoreError::AuthenticationRequired | CoreError::GateRequired
        )
    }
}
