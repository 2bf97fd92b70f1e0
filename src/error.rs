use thiserror::Error;

/// Failures of the counter operations.
///
/// None of these are handled locally; they propagate to whichever runtime
/// invoked the handler.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CounterError {
    /// The counter record (or its counter field) does not exist.
    #[error("counter record not found")]
    RecordNotFound,

    #[error("{operation}: {message}")]
    Service { operation: &'static str, message: String },

    /// The store answered, but the answer did not contain a usable counter.
    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },
}

impl CounterError {
    pub fn service(
        operation: &'static str,
        message: impl Into<String>,
    ) -> CounterError {
        CounterError::Service { operation, message: message.into() }
    }

    pub fn malformed(reason: impl Into<String>) -> CounterError {
        CounterError::MalformedResponse { reason: reason.into() }
    }
}
