use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, presenter::ResultView, DirectorySaveAs, HttpWatermarkService,
    NullPreviewSurface, SelectedFile, Settings, WorkflowController,
};
use shared::domain::{ExtractVariant, FileRole, OperationMode};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Embed or verify image watermarks through the remote watermark service")]
struct Args {
    /// Base URL of the watermark service; overrides settings and environment.
    #[arg(long, global = true)]
    service_url: Option<String>,
    /// Seconds to wait for the service before giving up.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Embed a watermark image into a host image.
    Embed {
        #[arg(long)]
        host: PathBuf,
        #[arg(long)]
        watermark: PathBuf,
        /// Directory that receives watermarked_image.<ext>.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Check whether an image still carries a known watermark.
    Verify {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        original: PathBuf,
    },
    /// Recover the embedded watermark from an image alone.
    Recover {
        #[arg(long)]
        image: PathBuf,
        /// Directory that receives extracted_watermark.<ext>.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

impl Command {
    fn mode(&self) -> OperationMode {
        match self {
            Self::Embed { .. } => OperationMode::Embed,
            Self::Verify { .. } | Self::Recover { .. } => OperationMode::Extract,
        }
    }

    fn extract_variant(&self) -> ExtractVariant {
        match self {
            Self::Recover { .. } => ExtractVariant::SelfRecover,
            Self::Embed { .. } | Self::Verify { .. } => ExtractVariant::Match,
        }
    }

    fn inputs(&self) -> Vec<(FileRole, &PathBuf)> {
        match self {
            Self::Embed {
                host, watermark, ..
            } => vec![(FileRole::Host, host), (FileRole::Watermark, watermark)],
            Self::Verify { image, original } => {
                vec![(FileRole::Host, image), (FileRole::Watermark, original)]
            }
            Self::Recover { image, .. } => vec![(FileRole::Host, image)],
        }
    }

    fn out_dir(&self) -> Option<&PathBuf> {
        match self {
            Self::Embed { out_dir, .. } | Self::Recover { out_dir, .. } => out_dir.as_ref(),
            Self::Verify { .. } => None,
        }
    }
}

fn effective_settings(args: &Args) -> Settings {
    let mut settings = load_settings();
    if let Some(url) = &args.service_url {
        settings.service_url = url.clone();
    }
    if let Some(secs) = args.timeout_secs {
        settings.request_timeout_secs = secs;
    }
    settings
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();
    let settings = effective_settings(&args);
    tracing::info!(service_url = %settings.service_url, "using watermark service");

    let service = HttpWatermarkService::from_settings(&settings)?;
    let mut controller = WorkflowController::new(NullPreviewSurface)
        .with_extract_variant(args.command.extract_variant())
        .with_request_timeout(settings.request_timeout());
    controller.change_mode(args.command.mode())?;

    for (role, path) in args.command.inputs() {
        controller.select_file(SelectedFile::from_path(role, path)?)?;
    }

    let settled = controller.submit(&service).await?;
    let failed = settled.result.is_error();
    let has_image = settled.result.image().is_some();
    println!("{}", ResultView::from_result(&settled.result).render_text());

    if failed {
        bail!("watermark operation failed");
    }

    if has_image {
        let dir = args
            .command
            .out_dir()
            .cloned()
            .unwrap_or_else(|| settings.download_dir.clone());
        let mut sink = DirectorySaveAs::new(dir);
        if let Some(path) = controller.download_artifact(&mut sink)? {
            println!("Saved {}", path.display());
        }
    }

    Ok(())
}
