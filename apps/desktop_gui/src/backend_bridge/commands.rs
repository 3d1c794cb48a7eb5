//! Backend commands queued from UI to backend worker.

use client_core::{OperationRequest, Ticket};

pub enum BackendCommand {
    Send {
        ticket: Ticket,
        request: OperationRequest,
    },
    Cancel {
        ticket: Ticket,
    },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Send { .. } => "send",
            Self::Cancel { .. } => "cancel",
        }
    }
}
