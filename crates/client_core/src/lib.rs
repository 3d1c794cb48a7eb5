//! Client-side orchestration for the remote watermarking service.

pub mod capabilities;
pub mod config;
pub mod presenter;
pub mod preview;
pub mod request;
pub mod service;
pub mod types;
pub mod workflow;

pub use capabilities::{DirectorySaveAs, FileInputReset, NoopInputReset, SaveAs};
pub use config::{load_settings, Settings};
pub use presenter::{ResultView, VerdictView};
pub use preview::{NullPreviewSurface, PreviewHandle, PreviewManager, PreviewSlot, PreviewSurface};
pub use request::{OperationRequest, ResponseShape, ValidationError};
pub use service::{
    send_with_timeout, HttpWatermarkService, ImageArtifact, MatchReport, ServiceError,
    ServiceResponse, WatermarkService,
};
pub use types::{FileSlots, SelectedFile};
pub use workflow::{
    ImageResult, OperationResult, PendingOperation, SettledResult, Ticket, WorkflowController,
    WorkflowError, WorkflowPhase,
};
