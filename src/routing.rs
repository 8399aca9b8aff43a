//! Message routing from MQTT topics to Redis channels
//!
//! The [`Router`] receives every message delivered by the ingress
//! subscriber through the [`MessageHandler`] interface, validates its topic
//! and forwards the payload to the destination channel.

pub mod error;
pub mod handler;
pub mod router;


pub use error::RouteError;
pub use handler::{Message, MessageHandler};
pub use router::Router;
