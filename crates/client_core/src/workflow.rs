//! Operation workflow state machine.
//!
//! The controller owns the mode, both file slots with their previews, the
//! in-flight ticket and the settled result. Every user action goes through
//! one of its methods; the phase is derived from that state rather than
//! stored separately.

use std::{path::PathBuf, time::Duration};

use chrono::{DateTime, Utc};
use shared::{
    domain::{ExtractVariant, FileRole, OperationMode},
    error::{ErrorCode, OperationError},
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    capabilities::{FileInputReset, NoopInputReset, SaveAs},
    preview::{PreviewHandle, PreviewManager, PreviewSlot, PreviewSurface},
    request::{required_roles, OperationRequest, ResponseShape, ValidationError},
    service::{
        send_with_timeout, ImageArtifact, MatchReport, ServiceError, ServiceResponse,
        WatermarkService,
    },
    types::{FileSlots, SelectedFile},
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPhase {
    Idle,
    Ready,
    Submitting,
    Settled,
}

/// Identifies one dispatched request; completions for any other ticket are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingOperation {
    pub ticket: Ticket,
    pub request: OperationRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageResult {
    pub preview: PreviewHandle,
    pub artifact: ImageArtifact,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationResult {
    Embed(ImageResult),
    Recovered(ImageResult),
    Extract(MatchReport),
    Error(OperationError),
}

impl OperationResult {
    pub fn image(&self) -> Option<&ImageResult> {
        match self {
            Self::Embed(image) | Self::Recovered(image) => Some(image),
            Self::Extract(_) | Self::Error(_) => None,
        }
    }

    /// Fixed download name for image-bearing results.
    pub fn download_name(&self) -> Option<String> {
        let (stem, image) = match self {
            Self::Embed(image) => ("watermarked_image", image),
            Self::Recovered(image) => ("extracted_watermark", image),
            Self::Extract(_) | Self::Error(_) => return None,
        };
        Some(format!("{stem}.{}", image.artifact.extension))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettledResult {
    pub ticket: Ticket,
    pub mode: OperationMode,
    pub result: OperationResult,
    pub settled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    #[error("an operation is already in flight")]
    Busy,
    #[error(transparent)]
    MissingInput(#[from] ValidationError),
    #[error("cannot {action} while {phase:?}")]
    InvalidTransition {
        action: &'static str,
        phase: WorkflowPhase,
    },
    #[error("the current result has no image to download")]
    NoArtifact,
    #[error("failed to save {filename}: {message}")]
    SaveFailed { filename: String, message: String },
}

impl WorkflowError {
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::MissingInput(err) => Some(err.code()),
            Self::NoArtifact => Some(ErrorCode::NoArtifact),
            Self::Busy | Self::InvalidTransition { .. } | Self::SaveFailed { .. } => None,
        }
    }
}

struct InFlight {
    ticket: Ticket,
    mode: OperationMode,
    expected: ResponseShape,
}

pub struct WorkflowController<S: PreviewSurface> {
    mode: OperationMode,
    extract_variant: ExtractVariant,
    files: FileSlots,
    previews: PreviewManager<S>,
    in_flight: Option<InFlight>,
    result: Option<SettledResult>,
    next_ticket: u64,
    request_timeout: Duration,
    input_reset: Box<dyn FileInputReset>,
}

impl<S: PreviewSurface> WorkflowController<S> {
    pub fn new(surface: S) -> Self {
        Self {
            mode: OperationMode::default(),
            extract_variant: ExtractVariant::default(),
            files: FileSlots::default(),
            previews: PreviewManager::new(surface),
            in_flight: None,
            result: None,
            next_ticket: 1,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            input_reset: Box::new(NoopInputReset),
        }
    }

    pub fn with_extract_variant(mut self, variant: ExtractVariant) -> Self {
        self.extract_variant = variant;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_input_reset(mut self, input_reset: Box<dyn FileInputReset>) -> Self {
        self.input_reset = input_reset;
        self
    }

    pub fn mode(&self) -> OperationMode {
        self.mode
    }

    pub fn extract_variant(&self) -> ExtractVariant {
        self.extract_variant
    }

    pub fn phase(&self) -> WorkflowPhase {
        if self.in_flight.is_some() {
            WorkflowPhase::Submitting
        } else if self.result.is_some() {
            WorkflowPhase::Settled
        } else if self.missing_role().is_none() {
            WorkflowPhase::Ready
        } else {
            WorkflowPhase::Idle
        }
    }

    pub fn can_submit(&self) -> bool {
        self.phase() == WorkflowPhase::Ready
    }

    pub fn required_roles(&self) -> &'static [FileRole] {
        required_roles(self.mode, self.extract_variant)
    }

    pub fn selected(&self, role: FileRole) -> Option<&SelectedFile> {
        self.files.get(role)
    }

    pub fn preview(&self, role: FileRole) -> Option<PreviewHandle> {
        self.previews.handle(PreviewSlot::Input(role))
    }

    pub fn previews(&self) -> &PreviewManager<S> {
        &self.previews
    }

    pub fn surface(&self) -> &S {
        self.previews.surface()
    }

    pub fn surface_mut(&mut self) -> &mut S {
        self.previews.surface_mut()
    }

    pub fn result(&self) -> Option<&SettledResult> {
        self.result.as_ref()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn in_flight_ticket(&self) -> Option<Ticket> {
        self.in_flight.as_ref().map(|in_flight| in_flight.ticket)
    }

    /// Stores `file` in its role's slot and replaces that slot's preview.
    ///
    /// Selecting while a result is shown discards the result; this is the
    /// path back to a new attempt after a failure.
    pub fn select_file(&mut self, file: SelectedFile) -> Result<PreviewHandle, WorkflowError> {
        if self.in_flight.is_some() {
            return Err(WorkflowError::Busy);
        }
        if self.result.is_some() {
            self.discard_result();
        }

        let role = file.role;
        let handle = self.previews.set_preview(role, &file);
        debug!(%role, file = %file.file_name, size = file.len(), "selected file");
        self.files.set(file);
        Ok(handle)
    }

    pub fn remove_file(&mut self, role: FileRole) -> Result<(), WorkflowError> {
        if self.in_flight.is_some() {
            return Err(WorkflowError::Busy);
        }
        if self.result.is_some() {
            self.discard_result();
        }
        self.files.take(role);
        self.previews.clear(role);
        Ok(())
    }

    /// Switches mode with a full reset. Re-selecting the current mode is a
    /// valid way to reset.
    pub fn change_mode(&mut self, mode: OperationMode) -> Result<(), WorkflowError> {
        if self.in_flight.is_some() {
            return Err(WorkflowError::Busy);
        }
        info!(from = %self.mode, to = %mode, "changing mode");
        self.mode = mode;
        self.full_reset();
        Ok(())
    }

    pub fn set_extract_variant(&mut self, variant: ExtractVariant) -> Result<(), WorkflowError> {
        if self.in_flight.is_some() {
            return Err(WorkflowError::Busy);
        }
        info!(from = %self.extract_variant, to = %variant, "changing extract variant");
        self.extract_variant = variant;
        self.full_reset();
        Ok(())
    }

    /// Validates inputs, builds the request and marks it in flight.
    pub fn begin_submit(&mut self) -> Result<PendingOperation, WorkflowError> {
        match self.phase() {
            WorkflowPhase::Submitting => return Err(WorkflowError::Busy),
            phase @ WorkflowPhase::Settled => {
                return Err(WorkflowError::InvalidTransition {
                    action: "submit",
                    phase,
                })
            }
            WorkflowPhase::Idle | WorkflowPhase::Ready => {}
        }

        let request = OperationRequest::build(self.mode, self.extract_variant, &self.files)?;
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight = Some(InFlight {
            ticket,
            mode: request.mode(),
            expected: request.expected_response(),
        });
        info!(ticket = ticket.0, operation = request.name(), "operation submitted");
        Ok(PendingOperation { ticket, request })
    }

    /// Settles the in-flight operation. Returns `false` and leaves state
    /// untouched when `ticket` is not the one in flight.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        outcome: Result<ServiceResponse, ServiceError>,
    ) -> bool {
        let in_flight = match self.in_flight.take() {
            Some(in_flight) if in_flight.ticket == ticket => in_flight,
            other => {
                self.in_flight = other;
                warn!(ticket = ticket.0, "ignoring completion for stale ticket");
                return false;
            }
        };

        let result = match (outcome, in_flight.expected) {
            (Ok(ServiceResponse::Image(artifact)), ResponseShape::Image) => {
                let preview = self.previews.set_result_preview(&artifact.bytes);
                let image = ImageResult { preview, artifact };
                match in_flight.mode {
                    OperationMode::Embed => OperationResult::Embed(image),
                    OperationMode::Extract => OperationResult::Recovered(image),
                }
            }
            (Ok(ServiceResponse::MatchReport(report)), ResponseShape::MatchReport) => {
                OperationResult::Extract(report)
            }
            (Ok(_), expected) => OperationResult::Error(OperationError::new(
                ErrorCode::MalformedResponse,
                format!("service response did not match the expected {expected:?} shape"),
            )),
            (Err(err), _) => OperationResult::Error(err.into()),
        };

        match &result {
            OperationResult::Error(err) => {
                warn!(ticket = ticket.0, code = ?err.code, "operation failed: {}", err.message)
            }
            _ => info!(ticket = ticket.0, "operation settled"),
        }

        self.result = Some(SettledResult {
            ticket,
            mode: in_flight.mode,
            result,
            settled_at: Utc::now(),
        });
        true
    }

    /// Runs one full round-trip against `service`, bounded by the request timeout.
    pub async fn submit<W>(&mut self, service: &W) -> Result<&SettledResult, WorkflowError>
    where
        W: WatermarkService + ?Sized,
    {
        let pending = self.begin_submit()?;
        let outcome = send_with_timeout(service, &pending.request, self.request_timeout).await;
        self.complete(pending.ticket, outcome);
        self.result.as_ref().ok_or(WorkflowError::InvalidTransition {
            action: "read result",
            phase: WorkflowPhase::Ready,
        })
    }

    /// Abandons the in-flight request; its completion will be ignored.
    pub fn cancel(&mut self) -> Result<Ticket, WorkflowError> {
        match self.in_flight.take() {
            Some(in_flight) => {
                info!(ticket = in_flight.ticket.0, "operation cancelled");
                Ok(in_flight.ticket)
            }
            None => Err(WorkflowError::InvalidTransition {
                action: "cancel",
                phase: self.phase(),
            }),
        }
    }

    /// Closes the result and resets every selection.
    pub fn dismiss_result(&mut self) -> Result<(), WorkflowError> {
        if self.in_flight.is_some() {
            return Err(WorkflowError::Busy);
        }
        if self.result.is_none() {
            return Err(WorkflowError::InvalidTransition {
                action: "dismiss result",
                phase: self.phase(),
            });
        }
        self.full_reset();
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), WorkflowError> {
        if self.in_flight.is_some() {
            return Err(WorkflowError::Busy);
        }
        self.full_reset();
        Ok(())
    }

    pub fn download_artifact(
        &self,
        sink: &mut dyn SaveAs,
    ) -> Result<Option<PathBuf>, WorkflowError> {
        let Some(settled) = self.result.as_ref() else {
            return Err(WorkflowError::InvalidTransition {
                action: "download",
                phase: self.phase(),
            });
        };
        let (Some(image), Some(filename)) =
            (settled.result.image(), settled.result.download_name())
        else {
            return Err(WorkflowError::NoArtifact);
        };

        let saved = sink
            .save_as(&image.artifact.bytes, &filename)
            .map_err(|err| WorkflowError::SaveFailed {
                filename: filename.clone(),
                message: err.to_string(),
            })?;
        match &saved {
            Some(path) => info!(path = %path.display(), "saved artifact"),
            None => debug!(%filename, "artifact save declined"),
        }
        Ok(saved)
    }

    fn missing_role(&self) -> Option<FileRole> {
        self.required_roles()
            .iter()
            .copied()
            .find(|role| self.files.get(*role).is_none())
    }

    fn discard_result(&mut self) {
        self.result = None;
        self.previews.clear_result();
    }

    fn full_reset(&mut self) {
        self.files.clear();
        self.previews.clear_all();
        self.discard_result();
        self.input_reset.reset_file_inputs();
    }
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
