//! UI/backend events and error modeling for the desktop GUI.

use client_core::{ServiceError, ServiceResponse, Ticket, WorkflowError};
use shared::error::ErrorCode;

pub enum UiEvent {
    Info(String),
    Error(UiError),
    OperationFinished {
        ticket: Ticket,
        outcome: Result<ServiceResponse, ServiceError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Service,
    Validation,
    Workflow,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    SelectFile,
    Submit,
    Download,
    General,
}

impl From<ErrorCode> for UiErrorCategory {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::TransportFailure => Self::Transport,
            ErrorCode::ServiceFailure | ErrorCode::MalformedResponse => Self::Service,
            ErrorCode::MissingInput | ErrorCode::NoArtifact => Self::Validation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn new(context: UiErrorContext, message: impl Into<String>) -> Self {
        Self {
            category: UiErrorCategory::Local,
            context,
            message: message.into(),
        }
    }

    pub fn from_workflow(context: UiErrorContext, err: &WorkflowError) -> Self {
        let category = match err.code() {
            Some(code) => code.into(),
            None => match err {
                WorkflowError::SaveFailed { .. } => UiErrorCategory::Local,
                _ => UiErrorCategory::Workflow,
            },
        };
        let message = match err.code() {
            Some(code) => format!("{}: {err}", code.summary()),
            None => err.to_string(),
        };
        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
