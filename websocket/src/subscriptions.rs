//! Subscription management for WebSocket clients.

use consensus_types::{EngineEvent, EventKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Available subscription topics, one per [`EventKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTopic {
    Claims,
    Votes,
    Rounds,
    Decisions,
}

impl SubscriptionTopic {
    pub const ALL: [SubscriptionTopic; 4] = [
        SubscriptionTopic::Claims,
        SubscriptionTopic::Votes,
        SubscriptionTopic::Rounds,
        SubscriptionTopic::Decisions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTopic::Claims => "claims",
            SubscriptionTopic::Votes => "votes",
            SubscriptionTopic::Rounds => "rounds",
            SubscriptionTopic::Decisions => "decisions",
        }
    }
}

impl From<EventKind> for SubscriptionTopic {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Claims => SubscriptionTopic::Claims,
            EventKind::Votes => SubscriptionTopic::Votes,
            EventKind::Rounds => SubscriptionTopic::Rounds,
            EventKind::Decisions => SubscriptionTopic::Decisions,
        }
    }
}

impl fmt::Display for SubscriptionTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional filter for subscriptions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionFilter {
    /// Only receive events naming one of these accounts.
    pub accounts: Option<Vec<String>>,
}

/// An event as delivered to subscribed clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub topic: SubscriptionTopic,
    /// Event name, e.g. `"vote_cast"`.
    pub event: String,
    pub data: serde_json::Value,
    /// Accounts named by the event, used for filtering.
    #[serde(default)]
    pub accounts: Vec<String>,
    pub timestamp: u64,
}

impl SubscriptionEvent {
    pub fn from_engine_event(event: &EngineEvent, timestamp: u64) -> Self {
        Self {
            topic: event.kind().into(),
            event: event.name().to_string(),
            data: serde_json::to_value(event).unwrap_or(serde_json::Value::Null),
            accounts: event.agent().map(|a| a.to_string()).into_iter().collect(),
            timestamp,
        }
    }
}

/// Messages a client may send.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe {
        topic: SubscriptionTopic,
        #[serde(default)]
        filter: Option<SubscriptionFilter>,
    },
    Unsubscribe {
        topic: SubscriptionTopic,
    },
    Ping,
}

/// Control messages the server sends back (events are sent as [`SubscriptionEvent`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Ack {
        action: String,
        topic: SubscriptionTopic,
    },
    Error {
        message: String,
    },
    Pong,
}

/// The set of topics (and their filters) a single client is subscribed to.
#[derive(Clone, Debug, Default)]
pub struct ClientSubscriptions {
    topics: HashMap<SubscriptionTopic, Option<SubscriptionFilter>>,
}

impl ClientSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe, replacing any previous filter for the topic.
    pub fn subscribe(&mut self, topic: SubscriptionTopic, filter: Option<SubscriptionFilter>) {
        self.topics.insert(topic, filter);
    }

    /// Returns whether the client was subscribed.
    pub fn unsubscribe(&mut self, topic: &SubscriptionTopic) -> bool {
        self.topics.remove(topic).is_some()
    }

    pub fn is_subscribed(&self, topic: &SubscriptionTopic) -> bool {
        self.topics.contains_key(topic)
    }

    /// Whether `event` should be delivered on `topic` to this client.
    pub fn matches_filter(&self, topic: &SubscriptionTopic, event: &SubscriptionEvent) -> bool {
        let Some(filter) = self.topics.get(topic) else {
            return false;
        };
        match filter.as_ref().and_then(|f| f.accounts.as_ref()) {
            None => true,
            Some(accounts) => event
                .accounts
                .iter()
                .any(|named| accounts.iter().any(|a| a.eq_ignore_ascii_case(named))),
        }
    }
}
