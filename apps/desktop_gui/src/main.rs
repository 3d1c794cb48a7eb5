mod backend_bridge;
mod controller;
mod ui;

use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use client_core::{load_settings, HttpWatermarkService, Settings};
use crossbeam_channel::bounded;
use eframe::egui;
use shared::domain::ExtractVariant;
use tracing_subscriber::EnvFilter;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::ui::{StartupConfig, WatermarkApp};

#[derive(Parser, Debug)]
#[command(about = "Desktop front-end for the DCT watermark service")]
struct Args {
    /// Base URL of the watermark service; overrides settings and environment.
    #[arg(long)]
    service_url: Option<String>,
    /// Seconds to wait for the service before giving up.
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Initial extract method: `match` or `self`.
    #[arg(long)]
    extract_variant: Option<ExtractVariant>,
    /// Default directory offered when saving result images.
    #[arg(long)]
    download_dir: Option<PathBuf>,
}

fn effective_settings(args: &Args) -> Settings {
    let mut settings = load_settings();
    if let Some(url) = &args.service_url {
        settings.service_url = url.clone();
    }
    if let Some(secs) = args.timeout_secs {
        settings.request_timeout_secs = secs;
    }
    if let Some(variant) = args.extract_variant {
        settings.extract_variant = variant;
    }
    if let Some(dir) = &args.download_dir {
        settings.download_dir = dir.clone();
    }
    settings
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();
    let settings = effective_settings(&args);
    tracing::info!(service_url = %settings.service_url, "starting watermark desktop client");

    let service = HttpWatermarkService::from_settings(&settings)?;
    let startup = StartupConfig {
        service_url: service.base_url().to_string(),
        extract_variant: settings.extract_variant,
        download_dir: settings.download_dir.clone(),
        request_timeout: settings.request_timeout(),
    };

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    backend_bridge::runtime::launch(service, startup.request_timeout, cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("DCT Watermark Verification")
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([720.0, 520.0]),
        ..Default::default()
    };
    eframe::run_native(
        "DCT Watermark Verification",
        options,
        Box::new(|cc| {
            Ok(Box::new(WatermarkApp::new(
                &cc.egui_ctx,
                startup,
                cmd_tx,
                ui_rx,
            )))
        }),
    )
    .map_err(|err| anyhow!("desktop client exited with an error: {err}"))
}
