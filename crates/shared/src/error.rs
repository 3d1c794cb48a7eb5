use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MissingInput,
    TransportFailure,
    ServiceFailure,
    MalformedResponse,
    NoArtifact,
}

impl ErrorCode {
    /// General wording shown to the user in place of the raw message title.
    pub fn summary(self) -> &'static str {
        match self {
            Self::MissingInput => "Required images are missing",
            Self::TransportFailure => "Could not reach the watermark service",
            Self::ServiceFailure => "The watermark service rejected the request",
            Self::MalformedResponse => "The watermark service sent an unexpected response",
            Self::NoArtifact => "There is no image to download",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationError {
    pub code: ErrorCode,
    pub message: String,
}

impl OperationError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{code:?}: {message}")]
pub struct OperationException {
    pub code: ErrorCode,
    pub message: String,
}

impl OperationException {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<OperationException> for OperationError {
    fn from(value: OperationException) -> Self {
        Self {
            code: value.code,
            message: value.message,
        }
    }
}

impl From<OperationError> for OperationException {
    fn from(value: OperationError) -> Self {
        Self {
            code: value.code,
            message: value.message,
        }
    }
}
