// Per-project broadcast rooms for newly stored messages

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use crate::db::models::Message;

const ROOM_CAPACITY: usize = 256;

pub struct Room {
    pub broadcast: broadcast::Sender<Arc<Message>>,
}

impl Room {
    pub fn new() -> Self {
        let (broadcast, _) = broadcast::channel(ROOM_CAPACITY);
        Self { broadcast }
    }
}

impl Default for Room {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<String, Arc<Room>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn room(&self, project_id: &str) -> Arc<Room> {
        {
            let rooms = self.rooms.read().await;
            if let Some(room) = rooms.get(project_id) {
                return Arc::clone(room);
            }
        }

        let mut rooms = self.rooms.write().await;
        Arc::clone(
            rooms
                .entry(project_id.to_string())
                .or_insert_with(|| Arc::new(Room::new())),
        )
    }

    pub async fn subscribe(&self, project_id: &str) -> broadcast::Receiver<Arc<Message>> {
        self.room(project_id).await.broadcast.subscribe()
    }

    // Returns how many subscribers received it.
    pub async fn publish(&self, message: Message) -> usize {
        let room = {
            let rooms = self.rooms.read().await;
            rooms.get(&message.project_id).cloned()
        };

        match room {
            // No receivers is not an error; nobody is listening right now.
            Some(room) => room.broadcast.send(Arc::new(message)).unwrap_or(0),
            None => 0,
        }
    }

    pub async fn prune(&self) {
        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, room| room.broadcast.receiver_count() > 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(project_id: &str, content: &str) -> Message {
        Message {
            id: "m1".to_string(),
            project_id: project_id.to_string(),
            sender_id: "s1".to_string(),
            sender_name: None,
            content: content.to_string(),
            created_at: "2026-01-01T00:00:00.000000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_messages_for_their_project_only() {
        let registry = RoomRegistry::new();
        let mut a = registry.subscribe("project-a").await;
        let mut b = registry.subscribe("project-b").await;

        assert_eq!(registry.publish(message("project-a", "hello")).await, 1);

        let received = a.recv().await.unwrap();
        assert_eq!(received.content, "hello");
        assert!(b.try_recv().is_err());
    }

    #[tokio::test]
    async fn publishing_without_room_is_a_no_op() {
        let registry = RoomRegistry::new();
        assert_eq!(registry.publish(message("nobody", "hi")).await, 0);
    }

    #[tokio::test]
    async fn prune_removes_idle_rooms() {
        let registry = RoomRegistry::new();
        let rx = registry.subscribe("project-a").await;
        registry.subscribe("project-b").await;

        registry.prune().await;
        assert_eq!(registry.rooms.read().await.len(), 1);

        drop(rx);
        registry.prune().await;
        assert!(registry.rooms.read().await.is_empty());
    }
}
