use crate::signaling::{Relay, RelayChannel, RelayError};
use async_trait::async_trait;
use consult_core::ParticipantId;
use consult_core::relay::{ClientFrame, RelayEvent, ServerFrame};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Relay client speaking to a `consult-relay` server over WebSocket.
#[derive(Clone, Debug)]
pub struct WsRelay {
    base_url: String,
}

impl WsRelay {
    /// `base_url` is the server root, e.g. `ws://127.0.0.1:8787`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Both segments are percent-encoded; the server decodes them back.
    fn channel_url(&self, channel: &str, key: &ParticipantId) -> String {
        format!(
            "{}/relay/{}/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(channel),
            urlencoding::encode(key.as_str())
        )
    }
}

#[async_trait]
impl Relay for WsRelay {
    async fn subscribe(
        &self,
        channel: &str,
        key: &ParticipantId,
        events: mpsc::UnboundedSender<RelayEvent>,
    ) -> Result<Box<dyn RelayChannel>, RelayError> {
        let url = self.channel_url(channel, key);
        debug!("Connecting to relay {}", url);

        let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| RelayError::Unreachable(e.to_string()))?;
        let (mut sink, mut stream) = ws_stream.split();

        // The server answers the upgrade with exactly one handshake frame.
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerFrame>(&text) {
                    Ok(ServerFrame::Subscribed) => break,
                    Ok(ServerFrame::Rejected { reason }) => {
                        return Err(RelayError::Rejected(reason));
                    }
                    Ok(other) => warn!("Unexpected frame before subscription: {:?}", other),
                    Err(e) => {
                        return Err(RelayError::Unreachable(format!(
                            "invalid handshake frame: {e}"
                        )));
                    }
                },
                Some(Ok(Message::Close(_))) | None => return Err(RelayError::Closed),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(RelayError::Unreachable(e.to_string())),
            }
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if sink.send(msg).await.is_err() || closing {
                    break;
                }
            }
        });

        let recv_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = stream.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ServerFrame>(&text) {
                        Ok(frame) => {
                            let Some(event) = frame.into_event() else {
                                continue;
                            };
                            if events.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Invalid relay frame: {:?}", e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            debug!("Relay stream ended");
        });

        Ok(Box::new(WsChannel {
            tx,
            recv_task: recv_task.abort_handle(),
            closed: AtomicBool::new(false),
        }))
    }
}

struct WsChannel {
    tx: mpsc::UnboundedSender<Message>,
    recv_task: AbortHandle,
    closed: AtomicBool,
}

impl WsChannel {
    fn send_frame(&self, frame: &ClientFrame) -> Result<(), RelayError> {
        let json =
            serde_json::to_string(frame).map_err(|e| RelayError::Unreachable(e.to_string()))?;
        self.tx
            .send(Message::Text(json.into()))
            .map_err(|_| RelayError::Closed)
    }
}

#[async_trait]
impl RelayChannel for WsChannel {
    async fn track(&self) -> Result<(), RelayError> {
        self.send_frame(&ClientFrame::Track)
    }

    async fn untrack(&self) {
        let _ = self.send_frame(&ClientFrame::Untrack);
    }

    async fn broadcast(&self, payload: String) -> Result<(), RelayError> {
        self.send_frame(&ClientFrame::Broadcast { payload })
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.tx.send(Message::Close(None));
        self.recv_task.abort();
    }
}
