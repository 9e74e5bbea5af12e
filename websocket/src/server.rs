//! WebSocket server implementation.
//!
//! Accepts WebSocket connections at `/ws` and lets clients subscribe to
//! event topics. Events are delivered via one broadcast channel per topic and
//! filtered per client.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use consensus_types::{EngineEvent, Timestamp};

use crate::error::WsError;
use crate::subscriptions::{
    ClientMessage, ClientSubscriptions, ServerMessage, SubscriptionEvent, SubscriptionFilter,
    SubscriptionTopic,
};

type WsSink = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Shared state for the WebSocket server: one broadcast channel per topic.
pub struct WsState {
    channels: HashMap<SubscriptionTopic, broadcast::Sender<String>>,
}

impl WsState {
    /// Create a new `WsState` with the given channel capacity for each topic.
    pub fn new(channel_capacity: usize) -> Self {
        let channels = SubscriptionTopic::ALL
            .iter()
            .map(|topic| (*topic, broadcast::channel(channel_capacity).0))
            .collect();
        Self { channels }
    }

    /// Get the broadcast sender for a given topic.
    pub fn sender_for(&self, topic: &SubscriptionTopic) -> &broadcast::Sender<String> {
        // every topic gets a channel in `new`
        &self.channels[topic]
    }

    /// Publish an engine event on its topic. Returns how many clients received it.
    pub fn publish(&self, event: &EngineEvent) -> usize {
        let payload = SubscriptionEvent::from_engine_event(event, Timestamp::now().as_secs());
        let topic = payload.topic;
        match serde_json::to_string(&payload) {
            Ok(text) => self.sender_for(&topic).send(text).unwrap_or(0),
            Err(e) => {
                warn!(event = event.name(), error = %e, "failed to encode event");
                0
            }
        }
    }

    pub fn subscriber_count(&self, topic: &SubscriptionTopic) -> usize {
        self.sender_for(topic).receiver_count()
    }
}

impl Default for WsState {
    fn default() -> Self {
        Self::new(256)
    }
}

/// The WebSocket server, configured with a port and shared state.
pub struct WebSocketServer {
    pub port: u16,
    pub state: Arc<WsState>,
}

impl WebSocketServer {
    pub fn with_state(port: u16, state: Arc<WsState>) -> Self {
        Self { port, state }
    }

    pub fn router(state: Arc<WsState>) -> Router {
        Router::new().route("/ws", get(ws_handler)).with_state(state)
    }

    /// Bind the configured port and serve until the task is dropped.
    pub async fn start(&self) -> Result<(), WsError> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| WsError::Bind { addr: addr.clone(), source })?;
        info!("WebSocket server listening on {}", addr);
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), WsError> {
        axum::serve(listener, Self::router(self.state.clone())).await?;
        Ok(())
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
///
/// Each subscription gets a forwarder task reading its topic channel; all
/// forwarders are aborted when the client disconnects.
async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let ws_sender: WsSink = Arc::new(Mutex::new(ws_sender));

    let mut client_subs = ClientSubscriptions::new();
    let mut forwarders: HashMap<SubscriptionTopic, JoinHandle<()>> = HashMap::new();

    debug!("new WebSocket client connected");

    while let Some(msg_result) = ws_receiver.next().await {
        let msg = match msg_result {
            Ok(msg) => msg,
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                handle_text_message(&text, &state, &mut client_subs, &mut forwarders, &ws_sender)
                    .await;
            }
            Message::Close(_) => break,
            Message::Ping(data) => {
                let _ = ws_sender.lock().await.send(Message::Pong(data)).await;
            }
            _ => {}
        }
    }

    for (_, handle) in forwarders.drain() {
        handle.abort();
    }
    debug!("WebSocket client disconnected");
}

async fn handle_text_message(
    text: &str,
    state: &Arc<WsState>,
    client_subs: &mut ClientSubscriptions,
    forwarders: &mut HashMap<SubscriptionTopic, JoinHandle<()>>,
    ws_sender: &WsSink,
) {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            let reply = ServerMessage::Error {
                message: format!("invalid message: {}", e),
            };
            send_control(ws_sender, &reply).await;
            return;
        }
    };

    match client_msg {
        ClientMessage::Subscribe { topic, filter } => {
            if let Some(handle) = forwarders.remove(&topic) {
                handle.abort();
            }
            client_subs.subscribe(topic, filter.clone());

            let rx = state.sender_for(&topic).subscribe();
            let handle = tokio::spawn(forward_events(rx, ws_sender.clone(), topic, filter));
            forwarders.insert(topic, handle);

            let ack = ServerMessage::Ack {
                action: "subscribe".to_string(),
                topic,
            };
            send_control(ws_sender, &ack).await;
            debug!(%topic, "client subscribed");
        }
        ClientMessage::Unsubscribe { topic } => {
            let was_subscribed = client_subs.unsubscribe(&topic);
            if let Some(handle) = forwarders.remove(&topic) {
                handle.abort();
            }
            let reply = if was_subscribed {
                ServerMessage::Ack {
                    action: "unsubscribe".to_string(),
                    topic,
                }
            } else {
                ServerMessage::Error {
                    message: format!("not subscribed to {}", topic),
                }
            };
            send_control(ws_sender, &reply).await;
        }
        ClientMessage::Ping => send_control(ws_sender, &ServerMessage::Pong).await,
    }
}

async fn send_control(ws_sender: &WsSink, msg: &ServerMessage) {
    match serde_json::to_string(msg) {
        Ok(text) => {
            let _ = ws_sender.lock().await.send(Message::Text(text)).await;
        }
        Err(e) => warn!(error = %e, "failed to encode control message"),
    }
}

/// Forwarder task: relays matching events from a topic channel to one client.
async fn forward_events(
    mut rx: broadcast::Receiver<String>,
    ws_sender: WsSink,
    topic: SubscriptionTopic,
    filter: Option<SubscriptionFilter>,
) {
    let mut matcher = ClientSubscriptions::new();
    matcher.subscribe(topic, filter);

    loop {
        match rx.recv().await {
            Ok(event_str) => {
                let should_send = match serde_json::from_str::<SubscriptionEvent>(&event_str) {
                    Ok(event) => matcher.matches_filter(&topic, &event),
                    Err(_) => true,
                };
                if should_send {
                    let mut sender = ws_sender.lock().await;
                    if sender.send(Message::Text(event_str)).await.is_err() {
                        break;
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("client lagged behind by {} events on topic {}", n, topic);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
