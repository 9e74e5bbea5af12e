//! WebSocket server for real-time engine events.
//!
//! Agents connect to `/ws` and subscribe to topics:
//! - `claims`: new claims and their voting deadlines
//! - `votes`: accepted votes
//! - `rounds`: round resolutions and deferred reputation
//! - `decisions`: decision requests, answers and resolutions
//!
//! Each subscription may carry an account filter so an agent only hears
//! about events that name it.

pub mod error;
pub mod server;
pub mod subscriptions;

pub use error::WsError;
pub use server::{WebSocketServer, WsState};
pub use subscriptions::{
    ClientMessage, ClientSubscriptions, ServerMessage, SubscriptionEvent, SubscriptionFilter,
    SubscriptionTopic,
};
