//! Realtime change feed over the Phoenix-channel WebSocket
//! (`/realtime/v1/websocket`).
//!
//! One socket is shared by every subscription. Each subscription joins its
//! own topic; incoming `postgres_changes` frames are decoded into
//! [`ChangeEvent`]s and fanned out over a broadcast channel, where each
//! [`Subscription`] keeps only the ones tagged with its own topic. When the socket
//! drops, the connection task reconnects with backoff and rejoins every live
//! topic.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use studyhub_core::query::{Filter, FilterOp};
use studyhub_core::{BackendConfig, ChangeEvent, ChangeKind, Subscription};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::Result;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Capacity of the fan-out channel.
const EVENT_CHANNEL_CAPACITY: usize = 1024;
/// Capacity of the outgoing frame queue.
const OUTGOING_CAPACITY: usize = 64;
/// Reconnect attempts before the connection task gives up.
const MAX_RECONNECT_ATTEMPTS: u32 = 6;

/// WebSocket URL for a project.
pub fn websocket_url(config: &BackendConfig) -> String {
    let base = config.base_url();
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!(
        "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
        ws_base, config.anon_key
    )
}

/// Server-side filter expression, when the realtime service supports the operator.
pub fn filter_expression(filter: &Filter) -> Option<String> {
    match filter.op {
        FilterOp::Eq | FilterOp::Neq | FilterOp::Gte | FilterOp::Lte | FilterOp::In => {
            Some(format!("{}={}", filter.column, filter.rest_value()))
        }
        FilterOp::ILike => None,
    }
}

/// `phx_join` payload for a table subscription.
pub fn join_payload(table: &str, filter: Option<&Filter>, access_token: &str) -> Value {
    let mut change = json!({
        "event": "*",
        "schema": "public",
        "table": table,
    });
    if let Some(expr) = filter.and_then(filter_expression) {
        change["filter"] = Value::String(expr);
    }
    json!({
        "config": {
            "broadcast": { "self": false },
            "presence": { "key": "" },
            "postgres_changes": [change],
        },
        "access_token": access_token,
    })
}

fn frame(topic: &str, event: &str, payload: Value, reference: u64) -> String {
    json!({
        "topic": topic,
        "event": event,
        "payload": payload,
        "ref": reference.to_string(),
    })
    .to_string()
}

#[derive(Debug, Deserialize)]
struct IncomingFrame {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
}

/// Decode a row change out of a server frame.
pub fn parse_change(text: &str) -> Option<ChangeEvent> {
    let incoming: IncomingFrame = serde_json::from_str(text).ok()?;
    let data = match incoming.event.as_str() {
        "postgres_changes" => incoming.payload.get("data")?,
        "INSERT" | "UPDATE" | "DELETE" => &incoming.payload,
        "phx_reply" => {
            if incoming.payload.get("status").and_then(Value::as_str) == Some("error") {
                tracing::warn!(topic = %incoming.topic, payload = %incoming.payload, "Realtime join rejected");
            }
            return None;
        }
        "phx_error" | "phx_close" => {
            tracing::warn!(topic = %incoming.topic, event = %incoming.event, "Realtime channel closed");
            return None;
        }
        _ => return None,
    };

    let kind: ChangeKind = serde_json::from_value(data.get("type")?.clone()).ok()?;
    let table = data.get("table")?.as_str()?.to_string();
    let record = data
        .get("record")
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()));
    let old_record = data
        .get("old_record")
        .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
        .cloned();
    Some(ChangeEvent {
        table,
        kind,
        record,
        old_record,
        topic: Some(incoming.topic),
    })
}

/// Leaves the topic when the subscription is dropped.
struct TopicGuard {
    topic: String,
    topics: Arc<DashMap<String, Value>>,
    outgoing: mpsc::Sender<String>,
    next_ref: Arc<AtomicU64>,
}

impl Drop for TopicGuard {
    fn drop(&mut self) {
        self.topics.remove(&self.topic);
        let reference = self.next_ref.fetch_add(1, Ordering::Relaxed);
        let leave = frame(&self.topic, "phx_leave", json!({}), reference);
        if self.outgoing.try_send(leave).is_err() {
            tracing::debug!(topic = %self.topic, "Realtime socket gone before leave");
        }
    }
}

/// Shared realtime socket.
pub struct RealtimeHub {
    url: String,
    heartbeat: Duration,
    events: broadcast::Sender<ChangeEvent>,
    topics: Arc<DashMap<String, Value>>,
    outgoing: Mutex<Option<mpsc::Sender<String>>>,
    next_ref: Arc<AtomicU64>,
}

impl std::fmt::Debug for RealtimeHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeHub")
            .field("topics", &self.topics.len())
            .finish_non_exhaustive()
    }
}

impl RealtimeHub {
    pub fn new(config: &BackendConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            url: websocket_url(config),
            heartbeat: config.heartbeat_interval(),
            events,
            topics: Arc::new(DashMap::new()),
            outgoing: Mutex::new(None),
            next_ref: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Number of joined topics.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Join a topic for `table` and return its feed.
    pub async fn subscribe(
        &self,
        table: &str,
        filter: Option<Filter>,
        access_token: &str,
    ) -> Result<Subscription> {
        let outgoing = self.connection().await?;
        let reference = self.next_ref.fetch_add(1, Ordering::Relaxed);
        let topic = format!("realtime:{table}:{reference}");
        let payload = join_payload(table, filter.as_ref(), access_token);

        // Subscribe before joining so no early event is missed.
        let rx = self.events.subscribe();
        self.topics.insert(topic.clone(), payload.clone());
        if outgoing
            .send(frame(&topic, "phx_join", payload, reference))
            .await
            .is_err()
        {
            tracing::warn!(%topic, "Realtime socket closed while joining; will rejoin on reconnect");
        }
        tracing::debug!(%topic, table, "Joined realtime topic");

        let subscription = Subscription::new(table, filter, rx).with_topic(topic.clone());
        let guard = TopicGuard {
            topic,
            topics: self.topics.clone(),
            outgoing,
            next_ref: self.next_ref.clone(),
        };
        Ok(subscription.with_guard(guard))
    }

    /// Sender into the live socket, connecting first if needed.
    async fn connection(&self) -> Result<mpsc::Sender<String>> {
        let mut slot = self.outgoing.lock().await;
        if let Some(tx) = slot.as_ref().filter(|tx| !tx.is_closed()) {
            return Ok(tx.clone());
        }

        let (socket, _) = connect_async(self.url.as_str()).await?;
        tracing::info!("Realtime socket connected");

        let (tx, rx) = mpsc::channel(OUTGOING_CAPACITY);
        let task = ConnectionTask {
            url: self.url.clone(),
            heartbeat: self.heartbeat,
            events: self.events.clone(),
            topics: self.topics.clone(),
            next_ref: self.next_ref.clone(),
        };
        tokio::spawn(task.run(socket, rx));
        *slot = Some(tx.clone());
        Ok(tx)
    }
}

enum Exit {
    /// Every sender is gone; the hub was dropped.
    Shutdown,
    Disconnected,
}

struct ConnectionTask {
    url: String,
    heartbeat: Duration,
    events: broadcast::Sender<ChangeEvent>,
    topics: Arc<DashMap<String, Value>>,
    next_ref: Arc<AtomicU64>,
}

impl ConnectionTask {
    async fn run(self, socket: Socket, mut outgoing: mpsc::Receiver<String>) {
        let mut socket = Some(socket);
        loop {
            let current = match socket.take() {
                Some(s) => s,
                None => match self.reconnect().await {
                    Some(s) => s,
                    None => {
                        tracing::error!("Realtime socket lost; giving up after {MAX_RECONNECT_ATTEMPTS} attempts");
                        return;
                    }
                },
            };
            match self.drive(current, &mut outgoing).await {
                Exit::Shutdown => {
                    tracing::debug!("Realtime connection task finished");
                    return;
                }
                Exit::Disconnected => {
                    tracing::warn!("Realtime socket disconnected");
                }
            }
        }
    }

    async fn reconnect(&self) -> Option<Socket> {
        for attempt in 0..MAX_RECONNECT_ATTEMPTS {
            let delay = Duration::from_secs(1u64 << attempt.min(5));
            tokio::time::sleep(delay).await;
            match connect_async(self.url.as_str()).await {
                Ok((mut socket, _)) => {
                    tracing::info!(attempt, "Realtime socket reconnected");
                    if self.rejoin(&mut socket).await {
                        return Some(socket);
                    }
                }
                Err(e) => tracing::warn!(attempt, error = %e, "Realtime reconnect failed"),
            }
        }
        None
    }

    async fn rejoin(&self, socket: &mut Socket) -> bool {
        let joins: Vec<(String, Value)> = self
            .topics
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        for (topic, payload) in joins {
            let reference = self.next_ref.fetch_add(1, Ordering::Relaxed);
            let join = frame(&topic, "phx_join", payload, reference);
            if let Err(e) = socket.send(Message::Text(join)).await {
                tracing::warn!(%topic, error = %e, "Rejoin failed");
                return false;
            }
        }
        true
    }

    async fn drive(&self, socket: Socket, outgoing: &mut mpsc::Receiver<String>) -> Exit {
        let (mut write, mut read) = socket.split();
        let mut ticker = tokio::time::interval(self.heartbeat);
        ticker.tick().await;

        loop {
            tokio::select! {
                frame_out = outgoing.recv() => {
                    let Some(text) = frame_out else {
                        let _ = write.close().await;
                        return Exit::Shutdown;
                    };
                    if let Err(e) = write.send(Message::Text(text)).await {
                        tracing::warn!(error = %e, "Realtime write failed");
                        return Exit::Disconnected;
                    }
                }
                item = read.next() => {
                    match item {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(event) = parse_change(&text) {
                                tracing::trace!(table = %event.table, kind = ?event.kind, "Realtime change");
                                let _ = self.events.send(event);
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => return Exit::Disconnected,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Realtime read failed");
                            return Exit::Disconnected;
                        }
                    }
                }
                _ = ticker.tick() => {
                    let reference = self.next_ref.fetch_add(1, Ordering::Relaxed);
                    let beat = frame("phoenix", "heartbeat", json!({}), reference);
                    if let Err(e) = write.send(Message::Text(beat)).await {
                        tracing::warn!(error = %e, "Realtime heartbeat failed");
                        return Exit::Disconnected;
                    }
                }
            }
        }
    }
}
