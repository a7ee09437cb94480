//! Realtime change-feed client
//!
//! Phoenix-style websocket subscription to a table's insert feed: join
//! `realtime:public:{table}` with a `postgres_changes` INSERT config and
//! an optional row filter, forward decoded records to the subscriber, and
//! heartbeat every 30s. Dropping the subscription aborts the reader task,
//! which closes the socket.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use md_core::ports::{Filter, RealtimeFeedPort, RealtimeSubscription};
use md_core::BackendError;

use crate::BackendConfig;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const FEED_BUFFER: usize = 64;

pub struct RealtimeClient {
    config: BackendConfig,
}

impl RealtimeClient {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }

    fn websocket_url(&self) -> String {
        let ws_base = if let Some(rest) = self.config.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.config.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.config.base_url.clone()
        };
        format!(
            "{ws_base}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            self.config.anon_key
        )
    }
}

fn join_message(topic: &str, table: &str, filter: Option<&Filter>) -> Value {
    let mut change = json!({
        "event": "INSERT",
        "schema": "public",
        "table": table,
    });
    if let Some(filter) = filter {
        change["filter"] = json!(format!("{}=eq.{}", filter.column, filter.value));
    }
    json!({
        "topic": topic,
        "event": "phx_join",
        "ref": "1",
        "payload": {
            "config": {
                "postgres_changes": [change]
            }
        }
    })
}

fn heartbeat_message() -> Value {
    json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "ref": null,
        "payload": {}
    })
}

/// Pull the inserted record out of a feed message addressed to `topic`.
fn insert_record(topic: &str, message: &Value) -> Option<Value> {
    if message.get("topic").and_then(|v| v.as_str()) != Some(topic) {
        return None;
    }
    match message.get("event").and_then(|v| v.as_str()) {
        Some("postgres_changes") => {
            let data = message.get("payload")?.get("data")?;
            if data.get("type").and_then(|v| v.as_str()) != Some("INSERT") {
                return None;
            }
            data.get("record").cloned()
        }
        Some("INSERT") => message.get("payload")?.get("record").cloned(),
        _ => None,
    }
}

#[async_trait]
impl RealtimeFeedPort for RealtimeClient {
    async fn subscribe_inserts(
        &self,
        table: &str,
        filter: Option<Filter>,
    ) -> Result<RealtimeSubscription, BackendError> {
        let url = self.websocket_url();
        let (socket, _) = connect_async(&url)
            .await
            .map_err(|e| BackendError::Transport(format!("websocket connect failed: {e}")))?;
        let (mut sink, mut stream) = socket.split();

        let topic = format!("realtime:public:{table}");
        let join = join_message(&topic, table, filter.as_ref());
        sink.send(Message::Text(join.to_string().into()))
            .await
            .map_err(|e| BackendError::Transport(format!("websocket join failed: {e}")))?;
        debug!(%topic, "joined realtime topic");

        let (tx, rx) = mpsc::channel(FEED_BUFFER);
        let handle = tokio::spawn(async move {
            let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
            heartbeat.tick().await;
            loop {
                tokio::select! {
                    _ = heartbeat.tick() => {
                        if sink
                            .send(Message::Text(heartbeat_message().to_string().into()))
                            .await
                            .is_err()
                        {
                            warn!(%topic, "realtime heartbeat failed, feed closed");
                            break;
                        }
                    }
                    frame = stream.next() => {
                        match frame {
                            Some(Ok(Message::Text(text))) => {
                                let Ok(message) = serde_json::from_str::<Value>(text.as_str())
                                else {
                                    continue;
                                };
                                if let Some(record) = insert_record(&topic, &message) {
                                    if tx.send(record).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Some(Ok(_)) => {}
                            Some(Err(err)) => {
                                warn!(%topic, error = %err, "realtime stream error");
                                break;
                            }
                            None => {
                                debug!(%topic, "realtime stream closed");
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(RealtimeSubscription::new(rx, handle))
    }
}
