//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

/// Queues `cmd`; on failure returns the status line to show instead.
pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
) -> Result<(), String> {
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            Ok(())
        }
        Err(TrySendError::Full(_)) => Err("UI command queue is full; please retry".to_string()),
        Err(TrySendError::Disconnected(_)) => Err(
            "Backend worker disconnected (possible startup/runtime failure); restart the app"
                .to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_core::{NullPreviewSurface, OperationRequest, SelectedFile, WorkflowController};
    use crossbeam_channel::bounded;
    use shared::domain::FileRole;

    fn pending_send() -> BackendCommand {
        let mut controller = WorkflowController::new(NullPreviewSurface);
        controller
            .select_file(SelectedFile::from_bytes(FileRole::Host, "h.png", vec![1]))
            .expect("host");
        controller
            .select_file(SelectedFile::from_bytes(FileRole::Watermark, "w.png", vec![2]))
            .expect("watermark");
        let pending = controller.begin_submit().expect("submit");
        assert!(matches!(pending.request, OperationRequest::Embed { .. }));
        BackendCommand::Send {
            ticket: pending.ticket,
            request: pending.request,
        }
    }

    #[test]
    fn reports_full_queue() {
        let (tx, _rx) = bounded(1);
        dispatch_backend_command(&tx, pending_send()).expect("first fits");
        let err = dispatch_backend_command(&tx, pending_send()).expect_err("queue full");
        assert!(err.contains("full"));
    }

    #[test]
    fn reports_disconnected_worker() {
        let (tx, rx) = bounded(1);
        drop(rx);
        let err = dispatch_backend_command(&tx, pending_send()).expect_err("disconnected");
        assert!(err.contains("disconnected"));
    }
}
