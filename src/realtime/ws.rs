use std::collections::HashMap;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use time::OffsetDateTime;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::{
    realtime::hub::{RoomEvent, RoomHub},
    state::AppState,
};

/// Frames a connected client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: String },
    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_id: String },
    #[serde(rename_all = "camelCase")]
    UpdateLocation {
        room_id: String,
        delivery_id: String,
        latitude: f64,
        longitude: f64,
    },
    #[serde(rename_all = "camelCase")]
    OrderStatus { order_id: String, status: String },
}

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade))
}

#[instrument(skip_all)]
async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let hub = state.rooms.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// One task per connection. Joined rooms each get a forwarder task pumping
/// broadcast events into this connection's outbox; a dying connection only
/// takes its own tasks down with it.
async fn handle_socket(mut socket: WebSocket, hub: RoomHub) {
    let (out_tx, mut out_rx) = mpsc::channel::<String>(64);
    let mut forwards: HashMap<String, JoinHandle<()>> = HashMap::new();
    info!("realtime client connected");

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let message = match incoming {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        debug!(error = %e, "websocket receive error");
                        break;
                    }
                    None => break,
                };
                let text = match message {
                    Message::Text(t) => t,
                    Message::Close(_) => break,
                    _ => continue,
                };
                let frame: ClientFrame = match serde_json::from_str(&text) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!(error = %e, "unparseable client frame");
                        continue;
                    }
                };
                handle_frame(frame, &hub, &out_tx, &mut forwards).await;
            }
            outgoing = out_rx.recv() => {
                match outgoing {
                    Some(text) => {
                        if socket.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    for (room, handle) in forwards.drain() {
        handle.abort();
        hub.prune(&room).await;
    }
    info!("realtime client disconnected");
}

async fn handle_frame(
    frame: ClientFrame,
    hub: &RoomHub,
    out_tx: &mpsc::Sender<String>,
    forwards: &mut HashMap<String, JoinHandle<()>>,
) {
    match frame {
        ClientFrame::JoinRoom { room_id } => {
            if forwards.contains_key(&room_id) {
                return;
            }
            debug!(room = %room_id, "client joined room");
            let rx = hub.subscribe(&room_id).await;
            let tx = out_tx.clone();
            forwards.insert(room_id, tokio::spawn(forward_room(rx, tx)));
        }
        ClientFrame::LeaveRoom { room_id } => {
            if let Some(handle) = forwards.remove(&room_id) {
                handle.abort();
            }
            hub.prune(&room_id).await;
            debug!(room = %room_id, "client left room");
        }
        ClientFrame::UpdateLocation {
            room_id,
            delivery_id,
            latitude,
            longitude,
        } => {
            hub.publish(
                &room_id,
                RoomEvent::LocationUpdated {
                    delivery_id,
                    latitude,
                    longitude,
                    timestamp: OffsetDateTime::now_utc(),
                },
            )
            .await;
        }
        // Room id is the order id, so order trackers get the change.
        ClientFrame::OrderStatus { order_id, status } => {
            let room = order_id.clone();
            hub.publish(
                &room,
                RoomEvent::OrderStatusChanged {
                    order_id,
                    status,
                    timestamp: OffsetDateTime::now_utc(),
                },
            )
            .await;
        }
    }
}

/// Pumps one room's broadcast stream into the connection outbox until either
/// side goes away. Lag drops old events rather than the connection.
async fn forward_room(mut rx: broadcast::Receiver<RoomEvent>, tx: mpsc::Sender<String>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let Ok(json) = serde_json::to_string(&event) else {
                    continue;
                };
                if tx.send(json).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "room subscriber lagging, events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frames_deserialize() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"event":"join-room","data":{"roomId":"order-1"}}"#).unwrap();
        assert!(matches!(frame, ClientFrame::JoinRoom { room_id } if room_id == "order-1"));

        let frame: ClientFrame = serde_json::from_str(
            r#"{"event":"update-location",
                "data":{"roomId":"r","deliveryId":"d","latitude":18.5,"longitude":73.8}}"#,
        )
        .unwrap();
        assert!(matches!(
            frame,
            ClientFrame::UpdateLocation { latitude, .. } if latitude == 18.5
        ));
    }

    #[test]
    fn unknown_frame_is_an_error() {
        assert!(serde_json::from_str::<ClientFrame>(r#"{"event":"shutdown","data":{}}"#).is_err());
    }

    #[tokio::test]
    async fn forwarder_relays_until_outbox_closes() {
        let hub = RoomHub::new();
        let rx = hub.subscribe("r").await;
        let (tx, mut out) = mpsc::channel(4);
        let handle = tokio::spawn(forward_room(rx, tx));

        hub.publish(
            "r",
            RoomEvent::OrderStatusChanged {
                order_id: "o".into(),
                status: "confirmed".into(),
                timestamp: OffsetDateTime::now_utc(),
            },
        )
        .await;

        let json = out.recv().await.expect("event should be forwarded");
        assert!(json.contains("order-status-changed"));

        drop(out);
        hub.publish(
            "r",
            RoomEvent::OrderStatusChanged {
                order_id: "o".into(),
                status: "ready".into(),
                timestamp: OffsetDateTime::now_utc(),
            },
        )
        .await;
        // Forwarder exits once the outbox is gone.
        let _ = handle.await;
    }
}
