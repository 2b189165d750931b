use thiserror::Error;

/// Substituted when a handler fails without a usable message.
pub const UNKNOWN_ERROR: &str = "Unknown error at server";

/// Every way a single dispatch can fail.
///
/// The `Display` text of each variant is exactly what clients receive in the
/// envelope's `error` field; existing clients match on these strings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Endpoint {name} not found")]
    NotFound { name: String },

    #[error("Invalid input")]
    InvalidInput,

    #[error("Invalid Output")]
    InvalidOutput,

    #[error("{message}")]
    Handler { message: String },

    #[error("Handler timed out")]
    Timeout,
}

/// Failure raised from inside an endpoint handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler's own computation failed.
    #[error("{}", .message.as_deref().unwrap_or(UNKNOWN_ERROR))]
    Failed { message: Option<String> },

    /// The cleaned argument could not be decoded into the handler's input type.
    #[error("Invalid input")]
    Decode(#[source] serde_json::Error),

    /// The handler's return value could not be encoded as JSON.
    #[error("Invalid Output")]
    Encode(#[source] serde_json::Error),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Failed {
            message: (!message.trim().is_empty()).then_some(message),
        }
    }

    /// A failure that carries no message.
    pub fn unknown() -> Self {
        Self::Failed { message: None }
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self::failed(err.to_string())
    }
}

impl From<HandlerError> for DispatchError {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::Failed { message } => DispatchError::Handler {
                message: message.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            },
            HandlerError::Decode(_) => DispatchError::InvalidInput,
            HandlerError::Encode(_) => DispatchError::InvalidOutput,
        }
    }
}
