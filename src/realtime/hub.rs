use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::{broadcast, RwLock};

/// Per-room channel capacity; a slow subscriber past this many queued events
/// starts losing the oldest ones.
const ROOM_CAPACITY: usize = 64;

/// Events relayed to room subscribers. No replay: whoever is not subscribed
/// when an event is published never sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum RoomEvent {
    #[serde(rename_all = "camelCase")]
    LocationUpdated {
        delivery_id: String,
        latitude: f64,
        longitude: f64,
        timestamp: OffsetDateTime,
    },
    #[serde(rename_all = "camelCase")]
    OrderStatusChanged {
        order_id: String,
        status: String,
        timestamp: OffsetDateTime,
    },
}

/// Room-scoped publish/subscribe over in-process broadcast channels. Holds no
/// durable state of its own.
#[derive(Clone, Default)]
pub struct RoomHub {
    rooms: Arc<RwLock<HashMap<String, broadcast::Sender<RoomEvent>>>>,
}

impl RoomHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to a room, creating it on first join.
    pub async fn subscribe(&self, room: &str) -> broadcast::Receiver<RoomEvent> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Relays an event to current room members. Returns how many subscribers
    /// received it; publishing into an empty or unknown room is a no-op.
    pub async fn publish(&self, room: &str, event: RoomEvent) -> usize {
        let rooms = self.rooms.read().await;
        match rooms.get(room) {
            Some(tx) => tx.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Drops the room channel once the last subscriber is gone.
    pub async fn prune(&self, room: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(tx) = rooms.get(room) {
            if tx.receiver_count() == 0 {
                rooms.remove(room);
            }
        }
    }

    #[cfg(test)]
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_event(status: &str) -> RoomEvent {
        RoomEvent::OrderStatusChanged {
            order_id: "order-1".into(),
            status: status.into(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let hub = RoomHub::new();
        let mut rx = hub.subscribe("room-a").await;
        let delivered = hub.publish("room-a", status_event("confirmed")).await;
        assert_eq!(delivered, 1);
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, RoomEvent::OrderStatusChanged { ref status, .. } if status == "confirmed"));
    }

    #[tokio::test]
    async fn late_joiner_misses_prior_events() {
        let hub = RoomHub::new();
        let _early = hub.subscribe("room-a").await;
        hub.publish("room-a", status_event("confirmed")).await;

        let mut late = hub.subscribe("room-a").await;
        hub.publish("room-a", status_event("preparing")).await;
        let event = late.recv().await.unwrap();
        assert!(matches!(event, RoomEvent::OrderStatusChanged { ref status, .. } if status == "preparing"));
        assert!(late.try_recv().is_err());
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let hub = RoomHub::new();
        let mut a = hub.subscribe("room-a").await;
        let _b = hub.subscribe("room-b").await;
        assert_eq!(hub.publish("room-b", status_event("ready")).await, 1);
        assert!(a.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_to_unknown_room_is_noop() {
        let hub = RoomHub::new();
        assert_eq!(hub.publish("nowhere", status_event("ready")).await, 0);
    }

    #[tokio::test]
    async fn prune_removes_empty_rooms_only() {
        let hub = RoomHub::new();
        let rx = hub.subscribe("room-a").await;
        hub.prune("room-a").await;
        assert_eq!(hub.room_count().await, 1);

        drop(rx);
        hub.prune("room-a").await;
        assert_eq!(hub.room_count().await, 0);
    }

    #[test]
    fn events_serialize_with_event_and_data_keys() {
        let json = serde_json::to_value(status_event("out_for_delivery")).unwrap();
        assert_eq!(json["event"], "order-status-changed");
        assert_eq!(json["data"]["orderId"], "order-1");
        assert_eq!(json["data"]["status"], "out_for_delivery");
        assert!(json["data"]["timestamp"].is_string() || json["data"]["timestamp"].is_array());
    }
}
