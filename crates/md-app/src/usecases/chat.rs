//! Chat rooms and messages
//!
//! Plain CRUD over the gated chat surface. Delivery is insert plus the
//! realtime feed, nothing stronger: a message the feed misses simply shows
//! up on the next history fetch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use md_core::ports::{BackendQueryPort, Filter, RealtimeFeedPort, RealtimeSubscription};
use md_core::{BackendError, UserId};

use crate::context::AuthContext;

pub const ROOMS_TABLE: &str = "chat_rooms";
pub const MESSAGES_TABLE: &str = "chat_messages";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_by: Option<UserId>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_public() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub room_id: String,
    pub user_id: UserId,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

pub struct ListRooms {
    query: Arc<dyn BackendQueryPort>,
}

impl ListRooms {
    pub fn new(query: Arc<dyn BackendQueryPort>) -> Self {
        Self { query }
    }

    /// All rooms, oldest first.
    pub async fn execute(&self) -> Result<Vec<ChatRoom>, BackendError> {
        let rows = self.query.select(ROOMS_TABLE, "*", &[], None).await?;
        let mut rooms: Vec<ChatRoom> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value(row) {
                Ok(room) => Some(room),
                Err(err) => {
                    warn!(error = %err, "skipping malformed room row");
                    None
                }
            })
            .collect();
        rooms.sort_by_key(|room| room.created_at);
        Ok(rooms)
    }
}

pub struct CreateRoom {
    ctx: Arc<AuthContext>,
    query: Arc<dyn BackendQueryPort>,
}

impl CreateRoom {
    pub fn new(ctx: Arc<AuthContext>, query: Arc<dyn BackendQueryPort>) -> Self {
        Self { ctx, query }
    }

    /// Rooms are public by default.
    pub async fn execute(&self, name: &str) -> Result<(), BackendError> {
        let created_by = self.ctx.user_id();
        self.query
            .insert(
                ROOMS_TABLE,
                serde_json::json!({
                    "name": name.trim(),
                    "is_public": true,
                    "created_by": created_by,
                }),
            )
            .await
    }
}

pub struct SendMessage {
    ctx: Arc<AuthContext>,
    query: Arc<dyn BackendQueryPort>,
}

impl SendMessage {
    pub fn new(ctx: Arc<AuthContext>, query: Arc<dyn BackendQueryPort>) -> Self {
        Self { ctx, query }
    }

    pub async fn execute(&self, room_id: &str, content: &str) -> Result<(), BackendError> {
        let user = self
            .ctx
            .user_id()
            .ok_or_else(|| BackendError::Unauthorized("no signed-in actor".into()))?;
        self.query
            .insert(
                MESSAGES_TABLE,
                serde_json::json!({
                    "room_id": room_id,
                    "user_id": user,
                    "content": content,
                }),
            )
            .await
    }
}

/// Message history plus a live tail for one room.
pub struct RoomFeedHandle {
    pub history: Vec<ChatMessage>,
    subscription: RealtimeSubscription,
}

impl RoomFeedHandle {
    /// Next live message; `None` once the feed closes. Rows that fail to
    /// decode are skipped.
    pub async fn next(&mut self) -> Option<ChatMessage> {
        loop {
            let row = self.subscription.rows.recv().await?;
            match serde_json::from_value(row) {
                Ok(message) => return Some(message),
                Err(err) => debug!(error = %err, "skipping malformed message row"),
            }
        }
    }
}

pub struct RoomFeed {
    query: Arc<dyn BackendQueryPort>,
    realtime: Arc<dyn RealtimeFeedPort>,
}

impl RoomFeed {
    pub fn new(query: Arc<dyn BackendQueryPort>, realtime: Arc<dyn RealtimeFeedPort>) -> Self {
        Self { query, realtime }
    }

    pub async fn open(&self, room_id: &str) -> Result<RoomFeedHandle, BackendError> {
        let filter = Filter::eq("room_id", room_id);
        let subscription = self
            .realtime
            .subscribe_inserts(MESSAGES_TABLE, Some(filter.clone()))
            .await?;

        let rows = self
            .query
            .select(MESSAGES_TABLE, "*", &[filter], None)
            .await?;
        let mut history: Vec<ChatMessage> = rows
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect();
        history.sort_by_key(|message| message.created_at);

        Ok(RoomFeedHandle {
            history,
            subscription,
        })
    }
}
