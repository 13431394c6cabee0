use crate::RelayService;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use consult_core::ParticipantId;
use consult_core::relay::{ClientFrame, RelayEvent, ServerFrame};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path((channel, key)): Path<(String, String)>,
    State(service): State<RelayService>,
) -> impl IntoResponse {
    let key = ParticipantId::from(key);

    ws.on_upgrade(move |socket| handle_socket(socket, channel, key, service))
}

async fn handle_socket(
    socket: WebSocket,
    channel: String,
    key: ParticipantId,
    service: RelayService,
) {
    info!("New relay connection: {} in {}", key, channel);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<RelayEvent>();

    if let Err(e) = service.hub().subscribe(&channel, key.clone(), tx) {
        warn!("Rejecting {} in {}: {}", key, channel, e);
        let rejected = ServerFrame::Rejected {
            reason: e.to_string(),
        };
        let _ = send_frame(&mut sender, &rejected).await;
        let _ = sender.close().await;
        return;
    }

    if send_frame(&mut sender, &ServerFrame::Subscribed)
        .await
        .is_err()
    {
        service.hub().unsubscribe(&channel, &key);
        return;
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if send_frame(&mut sender, &ServerFrame::from(event))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let hub = service.hub().clone();
        let channel = channel.clone();
        let key = key.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                        Ok(ClientFrame::Track) => {
                            if let Err(e) = hub.track(&channel, &key) {
                                warn!("Track failed for {}: {}", key, e);
                            }
                        }
                        Ok(ClientFrame::Untrack) => hub.untrack(&channel, &key),
                        Ok(ClientFrame::Broadcast { payload }) => {
                            if let Err(e) = hub.broadcast(&channel, &key, payload) {
                                warn!("Broadcast from {} dropped: {}", key, e);
                            }
                        }
                        Err(e) => warn!("Invalid relay frame from {}: {}", key, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.hub().unsubscribe(&channel, &key);
    info!("Relay connection closed: {} in {}", key, channel);
}

async fn send_frame(
    sender: &mut SplitSink<WebSocket, Message>,
    frame: &ServerFrame,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(frame).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}
