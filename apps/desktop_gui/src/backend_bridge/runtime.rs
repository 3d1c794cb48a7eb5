//! Runtime bridge between UI command queue and backend event intake.

use std::{sync::Arc, thread, time::Duration};

use client_core::{send_with_timeout, HttpWatermarkService, Ticket, WatermarkService};
use crossbeam_channel::{Receiver, Sender};
use tokio::task::JoinHandle;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(
    service: HttpWatermarkService,
    request_timeout: Duration,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let _ = ui_tx.try_send(UiEvent::Info(format!(
                "Ready; using watermark service at {}",
                service.base_url()
            )));
            let service: Arc<dyn WatermarkService> = Arc::new(service);

            let mut active: Option<(Ticket, JoinHandle<()>)> = None;
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::Send { ticket, request } => {
                        if let Some((previous, task)) = active.take() {
                            if !task.is_finished() {
                                tracing::warn!(
                                    previous = previous.id(),
                                    "aborting superseded watermark request"
                                );
                                task.abort();
                            }
                        }

                        let service = Arc::clone(&service);
                        let ui_tx = ui_tx.clone();
                        let task = tokio::spawn(async move {
                            let outcome =
                                send_with_timeout(&*service, &request, request_timeout).await;
                            if ui_tx
                                .try_send(UiEvent::OperationFinished { ticket, outcome })
                                .is_err()
                            {
                                tracing::error!(
                                    ticket = ticket.id(),
                                    "ui event queue unavailable; dropping operation result"
                                );
                            }
                        });
                        active = Some((ticket, task));
                    }
                    BackendCommand::Cancel { ticket } => match active.take() {
                        Some((current, task)) if current == ticket => {
                            task.abort();
                            tracing::info!(ticket = ticket.id(), "cancelled watermark request");
                        }
                        other => active = other,
                    },
                }
            }
        });
    });
}
