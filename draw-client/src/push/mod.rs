use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use draw_core::{normalize_draw_complete, normalize_draw_start, normalize_snapshot_str};
use draw_types::{Connectivity, DrawComplete, DrawStart, StateSnapshot};
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::ApiError;

pub mod sse;

use sse::{SseDecoder, SseFrame};

/// Identifies one transport connection of the push channel, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Snapshot(StateSnapshot),
    DrawStart(DrawStart),
    DrawComplete(DrawComplete),
    Connectivity(Connectivity),
}

/// Receives typed push events. Called from the subscription task.
pub trait PushHandler: Send + Sync + 'static {
    fn on_snapshot(&self, snapshot: StateSnapshot);
    fn on_draw_start(&self, start: DrawStart);
    fn on_draw_complete(&self, complete: DrawComplete);
    fn on_connectivity(&self, _connectivity: Connectivity) {}
}

/// Forwards everything into an event loop.
impl PushHandler for mpsc::UnboundedSender<PushEvent> {
    fn on_snapshot(&self, snapshot: StateSnapshot) {
        let _ = self.send(PushEvent::Snapshot(snapshot));
    }

    fn on_draw_start(&self, start: DrawStart) {
        let _ = self.send(PushEvent::DrawStart(start));
    }

    fn on_draw_complete(&self, complete: DrawComplete) {
        let _ = self.send(PushEvent::DrawComplete(complete));
    }

    fn on_connectivity(&self, connectivity: Connectivity) {
        let _ = self.send(PushEvent::Connectivity(connectivity));
    }
}

/// Owns the single subscription to `GET /events`.
///
/// The subscription runs as one task that connects, decodes events and, when
/// the transport fails or the server ends the stream, waits a fixed delay and
/// connects again, forever. Dropping or closing the channel aborts that task,
/// which closes the connection and cancels any pending reconnect.
pub struct PushChannel {
    client: Client,
    url: String,
    reconnect_delay: Duration,
    task: Option<JoinHandle<()>>,
}

impl PushChannel {
    pub fn new(api_base: &str, reconnect_delay: Duration) -> Self {
        Self {
            client: Client::new(),
            url: format!("{}/events", api_base.trim_end_matches('/')),
            reconnect_delay,
            task: None,
        }
    }

    /// Start delivering events to `handler`, replacing any previous subscription.
    pub fn subscribe<H: PushHandler>(&mut self, handler: H) {
        self.close();

        let task = tokio::spawn(run_subscription(
            self.client.clone(),
            self.url.clone(),
            self.reconnect_delay,
            Arc::new(handler),
        ));
        self.task = Some(task);
    }

    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Closing push subscription to {}", self.url);
            task.abort();
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_subscription(
    client: Client,
    url: String,
    reconnect_delay: Duration,
    handler: Arc<dyn PushHandler>,
) {
    loop {
        let connection_id = ConnectionId::new();
        match stream_events(&client, &url, connection_id, handler.as_ref()).await {
            Ok(()) => warn!("Push connection {} ended by the server", connection_id),
            Err(e) => warn!("Push connection {} failed: {}", connection_id, e),
        }

        handler.on_connectivity(Connectivity::Lost);
        info!("Reconnecting push channel in {:?}", reconnect_delay);
        tokio::time::sleep(reconnect_delay).await;
    }
}

async fn stream_events(
    client: &Client,
    url: &str,
    connection_id: ConnectionId,
    handler: &dyn PushHandler,
) -> Result<(), ApiError> {
    let response = client
        .get(url)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await?
        .error_for_status()?;

    info!("Push connection {} open", connection_id);
    handler.on_connectivity(Connectivity::Restored);

    let mut decoder = SseDecoder::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        for frame in decoder.push(&chunk?)? {
            dispatch(frame, handler);
        }
    }
    Ok(())
}

fn dispatch(frame: SseFrame, handler: &dyn PushHandler) {
    match frame.event.as_str() {
        "snapshot" | "state" => handler.on_snapshot(normalize_snapshot_str(&frame.data)),
        "draw-start" | "spin-start" => match normalize_draw_start(&parse(&frame.data)) {
            Some(start) => handler.on_draw_start(start),
            None => debug!("Dropped unusable {} payload", frame.event),
        },
        "draw-complete" | "spin-complete" => match normalize_draw_complete(&parse(&frame.data)) {
            Some(complete) => handler.on_draw_complete(complete),
            None => debug!("Dropped unusable {} payload", frame.event),
        },
        "error" => warn!("Backend reported an error: {}", frame.data),
        other => debug!("Ignoring push event '{}'", other),
    }
}

fn parse(data: &str) -> Value {
    serde_json::from_str(data).unwrap_or(Value::Null)
}
