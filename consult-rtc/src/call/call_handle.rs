use crate::call::{CallError, CallSnapshot, ControllerCommand};
use tokio::sync::{mpsc, oneshot, watch};

/// Cloneable front end of a running [`ConnectionController`].
///
/// [`ConnectionController`]: crate::ConnectionController
#[derive(Clone)]
pub struct CallHandle {
    command_tx: mpsc::Sender<ControllerCommand>,
    snapshot_rx: watch::Receiver<CallSnapshot>,
}

impl CallHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<ControllerCommand>,
        snapshot_rx: watch::Receiver<CallSnapshot>,
    ) -> Self {
        Self {
            command_tx,
            snapshot_rx,
        }
    }

    pub async fn start_call(&self) -> Result<(), CallError> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(ControllerCommand::StartCall { reply })
            .await
            .map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())?
    }

    /// Safe to call in any state and more than once.
    pub async fn end_call(&self) {
        let (reply, rx) = oneshot::channel();
        if self
            .command_tx
            .send(ControllerCommand::EndCall { reply })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    pub async fn toggle_audio(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .command_tx
            .send(ControllerCommand::ToggleAudio { reply })
            .await
            .is_err()
        {
            return self.snapshot().audio_enabled;
        }
        rx.await.unwrap_or_else(|_| self.snapshot().audio_enabled)
    }

    pub async fn toggle_video(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .command_tx
            .send(ControllerCommand::ToggleVideo { reply })
            .await
            .is_err()
        {
            return self.snapshot().video_enabled;
        }
        rx.await.unwrap_or_else(|_| self.snapshot().video_enabled)
    }

    pub fn snapshot(&self) -> CallSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CallSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Waits until `predicate` holds for the current snapshot. `None` once the
    /// controller is gone.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&CallSnapshot) -> bool,
    ) -> Option<CallSnapshot> {
        let mut rx = self.snapshot_rx.clone();
        let snapshot = rx.wait_for(predicate).await.ok()?;
        Some(snapshot.clone())
    }
}

fn stopped() -> CallError {
    CallError::Failed("connection controller stopped".to_owned())
}
