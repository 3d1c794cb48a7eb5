use std::{path::PathBuf, time::Duration};

use client_core::{
    presenter::{input_label, submit_label, ResultView},
    OperationResult, SelectedFile, WorkflowController, WorkflowError, WorkflowPhase,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::domain::{ExtractVariant, FileRole, OperationMode};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::{UiError, UiErrorCategory, UiErrorContext, UiEvent},
    orchestration::dispatch_backend_command,
};
use crate::ui::{
    host::{DialogSaveAs, PathInputs},
    textures::{PreviewTexture, TexturePreviewSurface},
};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp", "tif", "tiff"];
const MATCH_COLOR: egui::Color32 = egui::Color32::from_rgb(0x4C, 0xAF, 0x50);
const MISMATCH_COLOR: egui::Color32 = egui::Color32::from_rgb(0xF4, 0x43, 0x36);
const NOTICE_COLOR: egui::Color32 = egui::Color32::from_rgb(0xFF, 0x98, 0x00);

#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub service_url: String,
    pub extract_variant: ExtractVariant,
    pub download_dir: PathBuf,
    pub request_timeout: Duration,
}

enum UiAction {
    ChangeMode(OperationMode),
    SetVariant(ExtractVariant),
    Browse(FileRole),
    LoadPath(FileRole),
    Remove(FileRole),
    Submit,
    Cancel,
    Dismiss,
    Download,
    ClearError,
}

pub struct WatermarkApp {
    controller: WorkflowController<TexturePreviewSurface>,
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    path_inputs: PathInputs,
    status: String,
    last_error: Option<UiError>,
    config: StartupConfig,
}

fn variant_label(variant: ExtractVariant) -> &'static str {
    match variant {
        ExtractVariant::Match => "Compare with original (BER)",
        ExtractVariant::SelfRecover => "Recover watermark image",
    }
}

fn human_readable_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else if value.fract() == 0.0 {
        format!("{value:.0} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

impl WatermarkApp {
    pub fn new(
        ctx: &egui::Context,
        config: StartupConfig,
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
    ) -> Self {
        let path_inputs = PathInputs::default();
        let controller = WorkflowController::new(TexturePreviewSurface::new(ctx.clone()))
            .with_extract_variant(config.extract_variant)
            .with_request_timeout(config.request_timeout)
            .with_input_reset(Box::new(path_inputs.clone()));
        Self {
            controller,
            cmd_tx,
            ui_rx,
            path_inputs,
            status: "Select the images to begin".to_string(),
            last_error: None,
            config,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => self.status = message,
                UiEvent::Error(err) => {
                    tracing::warn!(context = ?err.context(), "{}", err.message());
                    self.last_error = Some(err);
                }
                UiEvent::OperationFinished { ticket, outcome } => {
                    if !self.controller.complete(ticket, outcome) {
                        continue;
                    }
                    self.status = match self.controller.result().map(|settled| &settled.result) {
                        Some(OperationResult::Error(_)) => {
                            "Operation failed; reselect an image or change mode to retry"
                                .to_string()
                        }
                        Some(_) => "Operation completed".to_string(),
                        None => String::new(),
                    };
                }
            }
        }
    }

    fn report(&mut self, context: UiErrorContext, err: &WorkflowError) {
        tracing::warn!(?context, "workflow rejected action: {err}");
        self.last_error = Some(UiError::from_workflow(context, err));
    }

    fn apply(&mut self, action: UiAction) {
        match action {
            UiAction::ChangeMode(mode) => match self.controller.change_mode(mode) {
                Ok(()) => self.status = format!("Switched to {mode} mode"),
                Err(err) => self.report(UiErrorContext::General, &err),
            },
            UiAction::SetVariant(variant) => {
                if let Err(err) = self.controller.set_extract_variant(variant) {
                    self.report(UiErrorContext::General, &err);
                }
            }
            UiAction::Browse(role) => {
                let mut dialog = rfd::FileDialog::new().add_filter("Images", IMAGE_EXTENSIONS);
                let current = self.path_inputs.get(role);
                if let Some(parent) = PathBuf::from(current.trim()).parent() {
                    if parent.is_dir() {
                        dialog = dialog.set_directory(parent);
                    }
                }
                if let Some(path) = dialog.pick_file() {
                    self.path_inputs.set(role, path.display().to_string());
                    self.load_file(role, path);
                }
            }
            UiAction::LoadPath(role) => {
                let typed = self.path_inputs.get(role);
                let typed = typed.trim();
                if typed.is_empty() {
                    self.status = format!("Enter a path for the {role} image first");
                } else {
                    self.load_file(role, PathBuf::from(typed));
                }
            }
            UiAction::Remove(role) => match self.controller.remove_file(role) {
                Ok(()) => self.path_inputs.set(role, String::new()),
                Err(err) => self.report(UiErrorContext::SelectFile, &err),
            },
            UiAction::Submit => self.submit(),
            UiAction::Cancel => match self.controller.cancel() {
                Ok(ticket) => {
                    if let Err(status) =
                        dispatch_backend_command(&self.cmd_tx, BackendCommand::Cancel { ticket })
                    {
                        tracing::warn!("failed to forward cancellation: {status}");
                    }
                    self.status = "Request cancelled".to_string();
                }
                Err(err) => self.report(UiErrorContext::General, &err),
            },
            UiAction::Dismiss => match self.controller.dismiss_result() {
                Ok(()) => self.status = "Select the images to begin".to_string(),
                Err(err) => self.report(UiErrorContext::General, &err),
            },
            UiAction::Download => {
                let mut sink = DialogSaveAs {
                    start_dir: Some(self.config.download_dir.clone()),
                };
                match self.controller.download_artifact(&mut sink) {
                    Ok(Some(path)) => self.status = format!("Saved image to {}", path.display()),
                    Ok(None) => self.status = "Download cancelled".to_string(),
                    Err(err) => self.report(UiErrorContext::Download, &err),
                }
            }
            UiAction::ClearError => self.last_error = None,
        }
    }

    fn load_file(&mut self, role: FileRole, path: PathBuf) {
        let file = match SelectedFile::from_path(role, &path) {
            Ok(file) => file,
            Err(err) => {
                self.last_error = Some(UiError::new(UiErrorContext::SelectFile, format!("{err:#}")));
                return;
            }
        };
        let name = file.file_name.clone();
        match self.controller.select_file(file) {
            Ok(_) => self.status = format!("Selected {name}"),
            Err(err) => self.report(UiErrorContext::SelectFile, &err),
        }
    }

    fn submit(&mut self) {
        let pending = match self.controller.begin_submit() {
            Ok(pending) => pending,
            Err(err) => {
                self.report(UiErrorContext::Submit, &err);
                return;
            }
        };
        let ticket = pending.ticket;
        let name = pending.request.name();
        let cmd = BackendCommand::Send {
            ticket,
            request: pending.request,
        };
        match dispatch_backend_command(&self.cmd_tx, cmd) {
            Ok(()) => self.status = format!("Waiting for the service ({name})..."),
            Err(status) => {
                let _ = self.controller.cancel();
                self.last_error = Some(UiError::new(UiErrorContext::Submit, status));
            }
        }
    }

    fn show_preview(&self, ui: &mut egui::Ui, handle: client_core::PreviewHandle) {
        match self.controller.surface().get(handle) {
            Some(PreviewTexture::Image { texture, size }) => {
                let scale = (ui.available_width() / size.x.max(1.0)).min(1.0);
                ui.image((texture.id(), *size * scale));
            }
            Some(PreviewTexture::DecodeFailed) => {
                ui.weak("Preview unavailable for this file");
            }
            None => {}
        }
    }

    fn show_workflow(&self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        let mode = self.controller.mode();
        let phase = self.controller.phase();
        let submitting = phase == WorkflowPhase::Submitting;

        ui.heading("DCT Watermark Verification");
        ui.add_space(8.0);

        ui.add_enabled_ui(!submitting, |ui| {
            ui.horizontal(|ui| {
                for (target, label) in [
                    (OperationMode::Embed, "Embed mode"),
                    (OperationMode::Extract, "Verify mode"),
                ] {
                    if ui.selectable_label(mode == target, label).clicked() {
                        actions.push(UiAction::ChangeMode(target));
                    }
                }
            });

            if mode == OperationMode::Extract {
                let current = self.controller.extract_variant();
                let mut variant = current;
                egui::ComboBox::from_label("Extract method")
                    .selected_text(variant_label(variant))
                    .show_ui(ui, |ui| {
                        for option in [ExtractVariant::Match, ExtractVariant::SelfRecover] {
                            ui.selectable_value(&mut variant, option, variant_label(option));
                        }
                    });
                if variant != current {
                    actions.push(UiAction::SetVariant(variant));
                }
            }

            ui.separator();
            for role in self.controller.required_roles() {
                self.show_file_input(ui, *role, actions);
                ui.add_space(6.0);
            }
        });

        ui.separator();
        ui.horizontal(|ui| {
            let label = submit_label(mode, self.controller.extract_variant());
            if ui
                .add_enabled(self.controller.can_submit(), egui::Button::new(label))
                .clicked()
            {
                actions.push(UiAction::Submit);
            }
            if submitting {
                ui.spinner();
                if ui.button("Cancel").clicked() {
                    actions.push(UiAction::Cancel);
                }
            }
        });
    }

    fn show_file_input(&self, ui: &mut egui::Ui, role: FileRole, actions: &mut Vec<UiAction>) {
        let mode = self.controller.mode();
        ui.label(egui::RichText::new(input_label(mode, role)).strong());
        ui.horizontal(|ui| {
            let mut text = self.path_inputs.get(role);
            let response = ui.add(
                egui::TextEdit::singleline(&mut text)
                    .hint_text("Path to image")
                    .desired_width(280.0),
            );
            if response.changed() {
                self.path_inputs.set(role, text);
            }
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                actions.push(UiAction::LoadPath(role));
            }
            if ui.button("Load").clicked() {
                actions.push(UiAction::LoadPath(role));
            }
            if ui.button("Browse...").clicked() {
                actions.push(UiAction::Browse(role));
            }
            if self.controller.selected(role).is_some() && ui.small_button("x").clicked() {
                actions.push(UiAction::Remove(role));
            }
        });

        if let Some(file) = self.controller.selected(role) {
            ui.weak(format!(
                "{} ({})",
                file.file_name,
                human_readable_bytes(file.len())
            ));
        }
        if let Some(handle) = self.controller.preview(role) {
            self.show_preview(ui, handle);
        }
    }

    fn show_result_panel(&self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        let Some(settled) = self.controller.result() else {
            return;
        };
        let view = ResultView::from_result(&settled.result);

        egui::SidePanel::right("result_panel")
            .min_width(340.0)
            .show(ctx, |ui| {
                ui.heading(view.title());
                ui.weak(format!(
                    "Completed {}",
                    settled.settled_at.format("%Y-%m-%d %H:%M:%S UTC")
                ));
                ui.separator();

                match &view {
                    ResultView::Image {
                        preview,
                        download_name,
                        ..
                    } => {
                        self.show_preview(ui, *preview);
                        ui.add_space(8.0);
                        ui.horizontal(|ui| {
                            if ui.button("Close result").clicked() {
                                actions.push(UiAction::Dismiss);
                            }
                            if ui.button(format!("Download {download_name}")).clicked() {
                                actions.push(UiAction::Download);
                            }
                        });
                    }
                    ResultView::Verdict(verdict) => {
                        let color = if verdict.is_match {
                            MATCH_COLOR
                        } else {
                            MISMATCH_COLOR
                        };
                        ui.colored_label(
                            color,
                            egui::RichText::new(verdict.headline).strong().size(18.0),
                        );
                        ui.add_space(6.0);
                        ui.label(format!("Bit Error Rate (BER): {}", verdict.ber_text));
                        ui.label(format!("Bit errors: {} bits", verdict.bits_text));
                        ui.add_space(8.0);
                        if ui.button("Close result").clicked() {
                            actions.push(UiAction::Dismiss);
                        }
                    }
                    ResultView::Failure { message, .. } => {
                        ui.colored_label(MISMATCH_COLOR, message);
                        ui.add_space(8.0);
                        if ui.button("Close result").clicked() {
                            actions.push(UiAction::Dismiss);
                        }
                    }
                }
            });
    }

    fn show_status_bar(&self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.weak(&self.config.service_url);
                });
            });
            if let Some(err) = &self.last_error {
                ui.horizontal(|ui| {
                    let color = match err.category() {
                        UiErrorCategory::Transport | UiErrorCategory::Service => MISMATCH_COLOR,
                        _ => NOTICE_COLOR,
                    };
                    ui.colored_label(color, err.message());
                    if ui.small_button("Dismiss").clicked() {
                        actions.push(UiAction::ClearError);
                    }
                });
            }
        });
    }
}

impl eframe::App for WatermarkApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        let mut actions = Vec::new();
        self.show_status_bar(ctx, &mut actions);
        self.show_result_panel(ctx, &mut actions);
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| self.show_workflow(ui, &mut actions));
        });

        for action in actions {
            self.apply(action);
        }

        if self.controller.phase() == WorkflowPhase::Submitting {
            ctx.request_repaint_after(Duration::from_millis(50));
        } else {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }
}
