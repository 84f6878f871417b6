//! Collaboration message layer.
//!
//! Sits between the board engine and the sync channel: encodes local activity
//! (presence, cursors, board operations, page switches) into wire frames and
//! decodes inbound frames into [`CollabEvent`]s. While the channel is down,
//! board operations divert into the [`OfflineQueue`] and are flushed on
//! reconnect.

use crate::board::BoardOperation;
use crate::offline::{OfflineQueue, PendingOperation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Remote cursors idle longer than this are dropped.
pub const CURSOR_TTL_MS: u64 = 5_000;

/// A participant in the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUser {
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// Last known cursor position of a remote participant.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorState {
    pub user_id: String,
    pub user_name: String,
    /// Canvas coordinates.
    pub x: f64,
    pub y: f64,
    pub tool: String,
    pub color: String,
    pub timestamp: u64,
}

/// Inbound frames, as fanned out by the server (which attributes them to a
/// user). Outbound frames are bare and are built in the send methods.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BoardMessage {
    #[serde(rename_all = "camelCase")]
    Presence { users: Vec<PresenceUser> },
    #[serde(rename_all = "camelCase")]
    CursorMove {
        user_id: String,
        user_name: String,
        x: f64,
        y: f64,
        tool: String,
        color: String,
        timestamp: u64,
    },
    #[serde(rename_all = "camelCase")]
    BoardOperation {
        user_id: String,
        operation: BoardOperation,
    },
    #[serde(rename_all = "camelCase")]
    PageSwitch { user_id: String, page_id: String },
    #[serde(rename_all = "camelCase")]
    VersionConflict {
        page_id: String,
        current_version: u64,
    },
}

/// Decoded inbound collaboration activity.
#[derive(Debug, Clone, PartialEq)]
pub enum CollabEvent {
    /// The participant list changed.
    PresenceChanged(Vec<PresenceUser>),
    /// A remote cursor moved.
    RemoteCursor(CursorState),
    /// A remote client mutated the board.
    RemoteOperation {
        user_id: String,
        operation: BoardOperation,
    },
    /// A remote client moved to another page.
    RemotePageSwitch { user_id: String, page_id: String },
    /// The server rejected an operation against a stale page version.
    VersionConflict {
        page_id: String,
        current_version: u64,
    },
}

/// Collaboration session for one room.
///
/// Poll-driven like the rest of the engine: outgoing frames accumulate and
/// are drained with [`take_outgoing`](Self::take_outgoing) by whatever owns
/// the sync channel.
pub struct CollaborationClient {
    room_id: String,
    user_id: String,
    user_name: String,
    users: Vec<PresenceUser>,
    cursors: HashMap<String, CursorState>,
    outgoing: Vec<Value>,
    offline: OfflineQueue,
}

impl CollaborationClient {
    pub fn new(room_id: &str, user_id: &str, user_name: &str) -> Self {
        Self {
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            users: Vec::new(),
            cursors: HashMap::new(),
            outgoing: Vec::new(),
            offline: OfflineQueue::new(),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Current participant list, as last announced by the server.
    pub fn users(&self) -> &[PresenceUser] {
        &self.users
    }

    /// Remote cursors, most recent position per user.
    pub fn cursors(&self) -> impl Iterator<Item = &CursorState> {
        self.cursors.values()
    }

    /// Number of operations waiting for reconnect.
    pub fn offline_count(&self) -> usize {
        self.offline.len()
    }

    /// Announce ourselves and flush any operations queued while offline.
    ///
    /// Called on every fresh connection; the server attributes the join from
    /// the session token and answers with a full `presence` roster.
    pub fn on_connected(&mut self) {
        self.outgoing
            .push(serde_json::json!({ "type": "presence_join" }));

        let queued = self.offline.drain();
        if !queued.is_empty() {
            log::info!("Flushing {} queued operations", queued.len());
        }
        for pending in queued {
            self.outgoing.push(pending.payload);
        }
    }

    /// Clear remote state when the connection drops.
    pub fn on_disconnected(&mut self) {
        self.users.clear();
        self.cursors.clear();
    }

    /// Send a cursor position.
    ///
    /// Fire-and-forget and unthrottled; callers rate-limit to their frame
    /// cadence.
    pub fn send_cursor(&mut self, x: f64, y: f64, tool: &str, color: &str, now_ms: u64) {
        self.outgoing.push(serde_json::json!({
            "type": "cursor_move",
            "cursor": {
                "x": x,
                "y": y,
                "tool": tool,
                "color": color,
                "timestamp": now_ms,
            },
        }));
    }

    /// Send a board operation, queuing it when disconnected.
    ///
    /// Returns `true` if the frame went to the outgoing buffer, `false` if
    /// it was parked in the offline queue.
    pub fn send_operation(&mut self, operation: &BoardOperation, connected: bool, now_ms: u64) -> bool {
        let value = match serde_json::to_value(operation) {
            Ok(op) => serde_json::json!({ "type": "board_operation", "operation": op }),
            Err(e) => {
                log::error!("Failed to encode board operation: {}", e);
                return false;
            }
        };

        if connected {
            self.outgoing.push(value);
            true
        } else {
            self.offline.enqueue(PendingOperation {
                room_id: self.room_id.clone(),
                payload: value,
                timestamp: now_ms,
            });
            false
        }
    }

    /// Announce a page switch.
    pub fn send_page_switch(&mut self, page_id: &str) {
        self.outgoing.push(serde_json::json!({
            "type": "page_switch",
            "pageId": page_id,
        }));
    }

    /// Decode one inbound payload.
    ///
    /// Frames from our own user id (another tab or a server echo) and frames
    /// of unknown shape return `None`.
    pub fn handle_message(&mut self, payload: &Value) -> Option<CollabEvent> {
        let message: BoardMessage = match serde_json::from_value(payload.clone()) {
            Ok(m) => m,
            Err(e) => {
                log::debug!("Ignoring unrecognized frame: {}", e);
                return None;
            }
        };

        match message {
            BoardMessage::Presence { users } => {
                self.users = users.clone();
                self.cursors
                    .retain(|user_id, _| users.iter().any(|u| &u.user_id == user_id));
                Some(CollabEvent::PresenceChanged(users))
            }
            BoardMessage::CursorMove {
                user_id,
                user_name,
                x,
                y,
                tool,
                color,
                timestamp,
            } => {
                if user_id == self.user_id {
                    return None;
                }
                let cursor = CursorState {
                    user_id: user_id.clone(),
                    user_name,
                    x,
                    y,
                    tool,
                    color,
                    timestamp,
                };
                self.cursors.insert(user_id, cursor.clone());
                Some(CollabEvent::RemoteCursor(cursor))
            }
            BoardMessage::BoardOperation { user_id, operation } => {
                if user_id == self.user_id {
                    return None;
                }
                Some(CollabEvent::RemoteOperation { user_id, operation })
            }
            BoardMessage::PageSwitch { user_id, page_id } => {
                if user_id == self.user_id {
                    return None;
                }
                Some(CollabEvent::RemotePageSwitch { user_id, page_id })
            }
            BoardMessage::VersionConflict {
                page_id,
                current_version,
            } => Some(CollabEvent::VersionConflict {
                page_id,
                current_version,
            }),
        }
    }

    /// Drop remote cursors that have gone idle.
    pub fn prune_cursors(&mut self, now_ms: u64) {
        self.cursors
            .retain(|_, c| now_ms.saturating_sub(c.timestamp) < CURSOR_TTL_MS);
    }

    /// Take frames ready to go out over the sync channel.
    pub fn take_outgoing(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.outgoing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardOperation, OperationKind};

    fn client() -> CollaborationClient {
        CollaborationClient::new("room-1", "user-a", "Alice")
    }

    fn operation() -> BoardOperation {
        BoardOperation {
            kind: OperationKind::ComponentCreate,
            page_id: "page-1".to_string(),
            version: 2,
            data: serde_json::json!({ "id": "c1" }),
        }
    }

    #[test]
    fn test_cursor_frame_shape() {
        let mut client = client();
        client.send_cursor(10.0, 20.0, "pen", "#ff0000", 1_000);
        let frames = client.take_outgoing();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "cursor_move");
        assert_eq!(frames[0]["cursor"]["x"], 10.0);
        assert_eq!(frames[0]["cursor"]["tool"], "pen");
        assert_eq!(frames[0]["cursor"]["timestamp"], 1_000);
    }

    #[test]
    fn test_operation_offline_queue_and_flush() {
        let mut client = client();
        assert!(!client.send_operation(&operation(), false, 100));
        assert!(!client.send_operation(&operation(), false, 200));
        assert_eq!(client.offline_count(), 2);
        assert!(client.take_outgoing().is_empty());

        client.on_connected();
        let frames = client.take_outgoing();
        // Presence announce first, then the two queued operations in order
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0]["type"], "presence_join");
        assert_eq!(frames[1]["type"], "board_operation");
        assert_eq!(frames[1]["operation"]["pageId"], "page-1");
        assert_eq!(client.offline_count(), 0);
    }

    #[test]
    fn test_own_messages_ignored() {
        let mut client = client();
        let frame = serde_json::json!({
            "type": "cursor_move",
            "userId": "user-a",
            "userName": "Alice",
            "x": 1.0, "y": 2.0,
            "tool": "pen", "color": "#000",
            "timestamp": 5,
        });
        assert_eq!(client.handle_message(&frame), None);
    }

    #[test]
    fn test_remote_cursor_tracked() {
        let mut client = client();
        let frame = serde_json::json!({
            "type": "cursor_move",
            "userId": "user-b",
            "userName": "Bob",
            "x": 42.0, "y": 7.0,
            "tool": "pen", "color": "#00f",
            "timestamp": 1_000,
        });
        match client.handle_message(&frame) {
            Some(CollabEvent::RemoteCursor(cursor)) => {
                assert_eq!(cursor.user_name, "Bob");
                assert_eq!(cursor.x, 42.0);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(client.cursors().count(), 1);

        client.prune_cursors(1_000 + CURSOR_TTL_MS);
        assert_eq!(client.cursors().count(), 0);
    }

    #[test]
    fn test_presence_drops_departed_cursors() {
        let mut client = client();
        client.handle_message(&serde_json::json!({
            "type": "cursor_move",
            "userId": "user-b", "userName": "Bob",
            "x": 0.0, "y": 0.0, "tool": "pen", "color": "#000",
            "timestamp": 0,
        }));

        let event = client.handle_message(&serde_json::json!({
            "type": "presence",
            "users": [{ "userId": "user-c", "userName": "Cara" }],
        }));
        assert!(matches!(event, Some(CollabEvent::PresenceChanged(ref u)) if u.len() == 1));
        assert_eq!(client.cursors().count(), 0);
        assert_eq!(client.users()[0].user_name, "Cara");
    }

    #[test]
    fn test_remote_operation_decoded() {
        let mut client = client();
        let frame = serde_json::json!({
            "type": "board_operation",
            "userId": "user-b",
            "operation": serde_json::to_value(operation()).unwrap(),
        });

        match client.handle_message(&frame) {
            Some(CollabEvent::RemoteOperation { user_id, operation }) => {
                assert_eq!(user_id, "user-b");
                assert_eq!(operation.page_id, "page-1");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_version_conflict_surfaced() {
        let mut client = client();
        let event = client.handle_message(&serde_json::json!({
            "type": "version_conflict",
            "pageId": "page-1",
            "currentVersion": 9,
        }));
        assert_eq!(
            event,
            Some(CollabEvent::VersionConflict {
                page_id: "page-1".to_string(),
                current_version: 9,
            })
        );
    }

    #[test]
    fn test_unknown_frame_ignored() {
        let mut client = client();
        assert_eq!(
            client.handle_message(&serde_json::json!({ "type": "shiny.new" })),
            None
        );
    }
}
