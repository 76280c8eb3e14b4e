use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("routing engine transport failure: {0}")]
    Transport(String),

    #[error("routing engine unreachable: {0}")]
    Unreachable(String),

    #[error("routing engine returned status {code}: {message}")]
    Status { code: String, message: String },

    #[error("malformed routing engine response: {0}")]
    Malformed(String),

    #[error("invalid routing request: {0}")]
    InvalidRequest(String),

    #[error("cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl OracleError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, OracleError::Cancelled | OracleError::DeadlineExceeded)
    }

    /// A failure which will repeat for every further call of the run.
    pub fn is_systemic(&self) -> bool {
        self.is_cancellation() || matches!(self, OracleError::Unreachable(_))
    }
}
