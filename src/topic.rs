//! Routing key handling
//!
//! Incoming MQTT topics follow the fixed schema `airq/<city>/<building>/<room>`.
//! This module validates a topic against that schema and derives the Redis
//! channel name the payload is forwarded to.

pub mod error;
pub mod location;


pub use error::SchemaError;
pub use location::Location;

/// Reserved first segment of every accepted topic.
pub const NAMESPACE: &str = "airq";

/// Prefix of every destination channel name.
pub const CHANNEL_PREFIX: &str = "airq";

/// Number of `/`-separated sections a valid topic has.
pub const SECTION_COUNT: usize = 4;
