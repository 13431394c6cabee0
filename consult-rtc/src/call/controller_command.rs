use crate::call::CallError;
use tokio::sync::oneshot;

/// Control operations queued to the controller loop.
#[derive(Debug)]
pub enum ControllerCommand {
    StartCall {
        reply: oneshot::Sender<Result<(), CallError>>,
    },
    EndCall {
        reply: oneshot::Sender<()>,
    },
    /// Replies with the resulting enabled flag.
    ToggleAudio { reply: oneshot::Sender<bool> },
    ToggleVideo { reply: oneshot::Sender<bool> },
}
