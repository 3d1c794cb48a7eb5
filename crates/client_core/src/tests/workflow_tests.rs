use super::*;
use std::{
    collections::{HashSet, VecDeque},
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;

use crate::presenter::ResultView;

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nresult";

#[derive(Default)]
struct RecordingSurface {
    live: HashSet<PreviewHandle>,
    slots: Vec<(PreviewHandle, PreviewSlot)>,
}

impl RecordingSurface {
    fn live_for(&self, slot: PreviewSlot) -> usize {
        self.slots
            .iter()
            .filter(|(handle, s)| *s == slot && self.live.contains(handle))
            .count()
    }
}

impl PreviewSurface for RecordingSurface {
    fn publish(&mut self, handle: PreviewHandle, slot: PreviewSlot, _bytes: &[u8]) {
        self.live.insert(handle);
        self.slots.push((handle, slot));
    }

    fn revoke(&mut self, handle: PreviewHandle) {
        assert!(self.live.remove(&handle), "revoked handle that was not live");
    }
}

struct ScriptedService {
    responses: Mutex<VecDeque<Result<ServiceResponse, ServiceError>>>,
    calls: Mutex<Vec<OperationRequest>>,
    delay: Option<Duration>,
}

impl ScriptedService {
    fn new(responses: Vec<Result<ServiceResponse, ServiceError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    fn slow(delay: Duration) -> Self {
        let mut service = Self::new(vec![Ok(png_response())]);
        service.delay = Some(delay);
        service
    }

    fn calls(&self) -> Vec<OperationRequest> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl WatermarkService for ScriptedService {
    async fn send(&self, request: &OperationRequest) -> Result<ServiceResponse, ServiceError> {
        self.calls.lock().expect("calls lock").push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::transport("no scripted response")))
    }
}

struct CountingReset(Arc<AtomicUsize>);

impl FileInputReset for CountingReset {
    fn reset_file_inputs(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct MemorySink {
    saved: Vec<(String, Vec<u8>)>,
}

impl SaveAs for MemorySink {
    fn save_as(&mut self, bytes: &[u8], filename: &str) -> io::Result<Option<PathBuf>> {
        self.saved.push((filename.to_string(), bytes.to_vec()));
        Ok(Some(PathBuf::from(filename)))
    }
}

struct FailingSink;

impl SaveAs for FailingSink {
    fn save_as(&mut self, _bytes: &[u8], _filename: &str) -> io::Result<Option<PathBuf>> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    }
}

fn png_response() -> ServiceResponse {
    ServiceResponse::Image(
        ImageArtifact::from_response(PNG_BYTES.to_vec(), Some("image/png")).expect("artifact"),
    )
}

fn report(is_match: bool, ber_percent: f64, bit_errors: u64, total_bits: u64) -> ServiceResponse {
    ServiceResponse::MatchReport(MatchReport {
        is_match,
        ber_percent,
        bit_errors,
        total_bits,
    })
}

fn file(role: FileRole, name: &str) -> SelectedFile {
    SelectedFile::from_bytes(role, name, name.as_bytes().to_vec())
}

fn controller() -> WorkflowController<RecordingSurface> {
    WorkflowController::new(RecordingSurface::default())
}

fn ready_controller(mode: OperationMode) -> WorkflowController<RecordingSurface> {
    let mut controller = controller();
    controller.change_mode(mode).expect("mode");
    controller
        .select_file(file(FileRole::Host, "host.png"))
        .expect("host");
    controller
        .select_file(file(FileRole::Watermark, "mark.png"))
        .expect("watermark");
    controller
}

#[tokio::test]
async fn embed_submit_sends_one_request_and_yields_previewable_image() {
    let mut controller = ready_controller(OperationMode::Embed);
    assert_eq!(controller.phase(), WorkflowPhase::Ready);
    let service = ScriptedService::new(vec![Ok(png_response())]);

    let settled = controller.submit(&service).await.expect("submit").clone();

    let calls = service.calls();
    assert_eq!(calls.len(), 1);
    let OperationRequest::Embed { host, watermark } = &calls[0] else {
        panic!("expected embed request");
    };
    assert_eq!(host.file_name, "host.png");
    assert_eq!(watermark.file_name, "mark.png");

    let OperationResult::Embed(image) = &settled.result else {
        panic!("expected embed result");
    };
    assert_eq!(controller.phase(), WorkflowPhase::Settled);
    assert_eq!(
        controller.previews().handle(PreviewSlot::Result),
        Some(image.preview)
    );
    assert!(controller.surface().live.contains(&image.preview));
    assert_eq!(settled.mode, OperationMode::Embed);
}

#[tokio::test]
async fn match_report_renders_match_verdict() {
    let mut controller = ready_controller(OperationMode::Extract);
    let service = ScriptedService::new(vec![Ok(report(true, 0.0, 0, 1024))]);

    let settled = controller.submit(&service).await.expect("submit");
    let ResultView::Verdict(verdict) = ResultView::from_result(&settled.result) else {
        panic!("expected verdict");
    };

    assert!(verdict.is_match);
    assert_eq!(verdict.headline, "Watermark matches");
    assert_eq!(verdict.ber_text, "0%");
    assert_eq!(verdict.bits_text, "0 / 1024");
}

#[tokio::test]
async fn mismatch_report_renders_ber_and_bit_counts() {
    let mut controller = ready_controller(OperationMode::Extract);
    let service = ScriptedService::new(vec![Ok(report(false, 12.5, 16, 128))]);

    let settled = controller.submit(&service).await.expect("submit");
    let text = ResultView::from_result(&settled.result).render_text();

    assert!(text.contains("does not match"), "unexpected text: {text}");
    assert!(text.contains("12.5%"), "unexpected text: {text}");
    assert!(text.contains("16 / 128"), "unexpected text: {text}");
    let calls = service.calls();
    assert!(matches!(calls[0], OperationRequest::VerifyMatch { .. }));
}

#[tokio::test]
async fn change_mode_resets_from_every_state() {
    let resets = Arc::new(AtomicUsize::new(0));
    let mut controller =
        controller().with_input_reset(Box::new(CountingReset(Arc::clone(&resets))));

    controller.change_mode(OperationMode::Extract).expect("idle");
    assert_eq!(controller.phase(), WorkflowPhase::Idle);

    controller
        .select_file(file(FileRole::Host, "host.png"))
        .expect("host");
    controller
        .select_file(file(FileRole::Watermark, "mark.png"))
        .expect("mark");
    controller.change_mode(OperationMode::Extract).expect("ready");
    assert!(controller.selected(FileRole::Host).is_none());
    assert!(controller.selected(FileRole::Watermark).is_none());
    assert!(controller.preview(FileRole::Host).is_none());
    assert!(controller.preview(FileRole::Watermark).is_none());

    controller
        .select_file(file(FileRole::Host, "host.png"))
        .expect("host");
    controller
        .select_file(file(FileRole::Watermark, "mark.png"))
        .expect("mark");
    let service = ScriptedService::new(vec![Ok(report(true, 1.0, 1, 100))]);
    controller.submit(&service).await.expect("submit");
    assert_eq!(controller.phase(), WorkflowPhase::Settled);

    controller.change_mode(OperationMode::Embed).expect("settled");
    assert_eq!(controller.mode(), OperationMode::Embed);
    assert_eq!(controller.phase(), WorkflowPhase::Idle);
    assert!(controller.result().is_none());
    assert_eq!(controller.previews().live_count(), 0);
    assert!(controller.surface().live.is_empty());
    assert_eq!(resets.load(Ordering::SeqCst), 3);
}

#[test]
fn second_submit_while_in_flight_is_rejected() {
    let mut controller = ready_controller(OperationMode::Embed);
    let pending = controller.begin_submit().expect("first submit");

    assert_eq!(controller.phase(), WorkflowPhase::Submitting);
    assert_eq!(controller.begin_submit(), Err(WorkflowError::Busy));
    assert_eq!(
        controller.select_file(file(FileRole::Host, "other.png")),
        Err(WorkflowError::Busy)
    );
    assert_eq!(
        controller.change_mode(OperationMode::Extract),
        Err(WorkflowError::Busy)
    );
    assert_eq!(controller.dismiss_result(), Err(WorkflowError::Busy));
    assert_eq!(controller.in_flight_ticket(), Some(pending.ticket));
    assert_eq!(
        controller.selected(FileRole::Host).map(|f| f.file_name.as_str()),
        Some("host.png")
    );
}

#[test]
fn submit_without_required_inputs_reports_missing_input() {
    let mut controller = controller();
    controller
        .select_file(file(FileRole::Host, "host.png"))
        .expect("host");

    let err = controller.begin_submit().expect_err("must fail");
    assert_eq!(err.code(), Some(ErrorCode::MissingInput));
    assert_eq!(controller.phase(), WorkflowPhase::Idle);
    assert!(controller.in_flight_ticket().is_none());
}

#[tokio::test]
async fn download_on_match_result_reports_no_artifact() {
    let mut controller = ready_controller(OperationMode::Extract);
    let service = ScriptedService::new(vec![Ok(report(false, 50.0, 64, 128))]);
    controller.submit(&service).await.expect("submit");

    let mut sink = MemorySink::default();
    assert_eq!(
        controller.download_artifact(&mut sink),
        Err(WorkflowError::NoArtifact)
    );
    assert!(sink.saved.is_empty());
}

#[tokio::test]
async fn download_uses_fixed_names_per_result_kind() {
    let mut controller = ready_controller(OperationMode::Embed);
    let service = ScriptedService::new(vec![Ok(png_response()), Ok(png_response())]);
    controller.submit(&service).await.expect("embed");

    let mut sink = MemorySink::default();
    controller.download_artifact(&mut sink).expect("download");
    assert_eq!(sink.saved[0].0, "watermarked_image.png");
    assert_eq!(sink.saved[0].1, PNG_BYTES);
    assert_eq!(controller.phase(), WorkflowPhase::Settled);

    controller.change_mode(OperationMode::Extract).expect("mode");
    controller
        .set_extract_variant(ExtractVariant::SelfRecover)
        .expect("variant");
    controller
        .select_file(file(FileRole::Host, "marked.png"))
        .expect("host");
    assert_eq!(controller.phase(), WorkflowPhase::Ready);
    let settled = controller.submit(&service).await.expect("recover");
    assert!(matches!(settled.result, OperationResult::Recovered(_)));

    controller.download_artifact(&mut sink).expect("download");
    assert_eq!(sink.saved[1].0, "extracted_watermark.png");
}

#[tokio::test]
async fn failing_sink_leaves_result_in_place() {
    let mut controller = ready_controller(OperationMode::Embed);
    let service = ScriptedService::new(vec![Ok(png_response())]);
    controller.submit(&service).await.expect("embed");

    let err = controller
        .download_artifact(&mut FailingSink)
        .expect_err("must fail");
    assert!(matches!(err, WorkflowError::SaveFailed { .. }));
    assert_eq!(controller.phase(), WorkflowPhase::Settled);
}

#[test]
fn reselecting_host_keeps_exactly_one_live_host_preview() {
    let mut controller = controller();
    let first = controller
        .select_file(file(FileRole::Host, "a.png"))
        .expect("first");
    let second = controller
        .select_file(file(FileRole::Host, "b.png"))
        .expect("second");

    assert_ne!(first, second);
    assert_eq!(controller.preview(FileRole::Host), Some(second));
    assert_eq!(
        controller
            .surface()
            .live_for(PreviewSlot::Input(FileRole::Host)),
        1
    );
    assert!(!controller.surface().live.contains(&first));
}

#[tokio::test]
async fn transport_failure_settles_with_error() {
    let mut controller = ready_controller(OperationMode::Embed);
    let service =
        ScriptedService::new(vec![Err(ServiceError::transport("connection refused"))]);

    let settled = controller.submit(&service).await.expect("submit");
    let OperationResult::Error(err) = &settled.result else {
        panic!("expected error result");
    };
    assert_eq!(err.code, ErrorCode::TransportFailure);
    assert_eq!(controller.phase(), WorkflowPhase::Settled);
    assert!(controller.in_flight_ticket().is_none());
}

#[tokio::test]
async fn slow_service_times_out_into_error_result() {
    let mut controller =
        ready_controller(OperationMode::Embed).with_request_timeout(Duration::from_millis(50));
    let service = ScriptedService::slow(Duration::from_secs(5));

    let settled = controller.submit(&service).await.expect("submit");
    let OperationResult::Error(err) = &settled.result else {
        panic!("expected timeout error");
    };
    assert_eq!(err.code, ErrorCode::TransportFailure);
    assert_eq!(controller.phase(), WorkflowPhase::Settled);
}

#[test]
fn settled_error_requires_new_input_before_retry() {
    let mut controller = ready_controller(OperationMode::Embed);
    let pending = controller.begin_submit().expect("submit");
    assert!(controller.complete(
        pending.ticket,
        Err(ServiceError::service("service returned 500"))
    ));

    assert!(matches!(
        controller.begin_submit(),
        Err(WorkflowError::InvalidTransition {
            action: "submit",
            phase: WorkflowPhase::Settled
        })
    ));

    controller
        .select_file(file(FileRole::Watermark, "mark2.png"))
        .expect("reselect");
    assert!(controller.result().is_none());
    assert_eq!(controller.phase(), WorkflowPhase::Ready);
    assert!(controller.begin_submit().is_ok());
}

#[test]
fn cancelled_ticket_completion_is_ignored() {
    let mut controller = ready_controller(OperationMode::Embed);
    let pending = controller.begin_submit().expect("submit");

    assert_eq!(controller.cancel(), Ok(pending.ticket));
    assert_eq!(controller.phase(), WorkflowPhase::Ready);
    assert!(!controller.complete(pending.ticket, Ok(png_response())));
    assert!(controller.result().is_none());
    assert_eq!(controller.previews().handle(PreviewSlot::Result), None);

    let retry = controller.begin_submit().expect("retry");
    assert!(retry.ticket > pending.ticket);
    assert!(!controller.complete(pending.ticket, Ok(png_response())));
    assert_eq!(controller.phase(), WorkflowPhase::Submitting);
    assert!(controller.complete(retry.ticket, Ok(png_response())));
    assert_eq!(controller.phase(), WorkflowPhase::Settled);
}

#[test]
fn cancel_without_in_flight_request_is_invalid() {
    let mut controller = controller();
    assert!(matches!(
        controller.cancel(),
        Err(WorkflowError::InvalidTransition {
            action: "cancel",
            ..
        })
    ));
}

#[test]
fn unexpected_response_shape_is_malformed() {
    let mut controller = ready_controller(OperationMode::Extract);
    let pending = controller.begin_submit().expect("submit");
    controller.complete(pending.ticket, Ok(png_response()));

    let Some(SettledResult {
        result: OperationResult::Error(err),
        ..
    }) = controller.result()
    else {
        panic!("expected malformed error");
    };
    assert_eq!(err.code, ErrorCode::MalformedResponse);
    assert_eq!(controller.previews().handle(PreviewSlot::Result), None);
}

#[test]
fn dismiss_clears_result_and_selections() {
    let resets = Arc::new(AtomicUsize::new(0));
    let mut controller = ready_controller(OperationMode::Embed)
        .with_input_reset(Box::new(CountingReset(Arc::clone(&resets))));
    assert_eq!(
        controller.dismiss_result(),
        Err(WorkflowError::InvalidTransition {
            action: "dismiss result",
            phase: WorkflowPhase::Ready
        })
    );

    let pending = controller.begin_submit().expect("submit");
    controller.complete(pending.ticket, Ok(png_response()));
    controller.dismiss_result().expect("dismiss");

    assert_eq!(controller.phase(), WorkflowPhase::Idle);
    assert!(controller.result().is_none());
    assert!(controller.selected(FileRole::Host).is_none());
    assert_eq!(controller.previews().live_count(), 0);
    assert!(controller.surface().live.is_empty());
    assert_eq!(resets.load(Ordering::SeqCst), 1);
}

#[test]
fn self_variant_is_ready_with_host_only() {
    let mut controller = controller().with_extract_variant(ExtractVariant::SelfRecover);
    controller.change_mode(OperationMode::Extract).expect("mode");
    assert_eq!(controller.required_roles(), &[FileRole::Host]);

    controller
        .select_file(file(FileRole::Host, "marked.png"))
        .expect("host");
    assert!(controller.can_submit());

    let pending = controller.begin_submit().expect("submit");
    assert!(matches!(pending.request, OperationRequest::Recover { .. }));
}

#[test]
fn removing_a_file_drops_its_preview_and_readiness() {
    let mut controller = ready_controller(OperationMode::Embed);
    controller.remove_file(FileRole::Watermark).expect("remove");

    assert_eq!(controller.phase(), WorkflowPhase::Idle);
    assert!(controller.preview(FileRole::Watermark).is_none());
    assert_eq!(controller.previews().live_count(), 1);
}

#[test]
fn switching_extract_variant_resets_and_changes_requirements() {
    let resets = Arc::new(AtomicUsize::new(0));
    let mut controller = ready_controller(OperationMode::Extract)
        .with_input_reset(Box::new(CountingReset(Arc::clone(&resets))));
    assert_eq!(controller.required_roles().len(), 2);

    controller
        .set_extract_variant(ExtractVariant::SelfRecover)
        .expect("variant");

    assert_eq!(controller.extract_variant(), ExtractVariant::SelfRecover);
    assert_eq!(controller.required_roles(), &[FileRole::Host]);
    assert_eq!(controller.phase(), WorkflowPhase::Idle);
    assert!(controller.surface().live.is_empty());
    assert_eq!(resets.load(Ordering::SeqCst), 1);
}

#[test]
fn reset_is_rejected_while_in_flight_and_clears_otherwise() {
    let mut controller = ready_controller(OperationMode::Embed);
    let pending = controller.begin_submit().expect("submit");

    assert_eq!(controller.reset(), Err(WorkflowError::Busy));
    assert_eq!(
        controller.set_extract_variant(ExtractVariant::SelfRecover),
        Err(WorkflowError::Busy)
    );
    assert_eq!(controller.in_flight_ticket(), Some(pending.ticket));

    controller.cancel().expect("cancel");
    assert_eq!(controller.phase(), WorkflowPhase::Ready);
    controller.reset().expect("reset");
    assert_eq!(controller.phase(), WorkflowPhase::Idle);
    assert_eq!(controller.previews().live_count(), 0);
}
