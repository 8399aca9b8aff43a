//! # airq-bridge
//!
//! Forwards air-quality telemetry from an MQTT broker to Redis pub/sub.
//!
//! Every message received on `airq/<city>/<building>/<room>` is published,
//! payload untouched, on the Redis channel `airq:<city>:<building>:<room>`.
//!
//! ## Components
//!
//! - [`IngressSubscriber`]: TLS session to the broker, QoS 0 subscription
//!   restored on every reconnect, serial delivery to a [`MessageHandler`]
//! - [`Router`]: topic validation and forwarding through a
//!   [`ChannelPublisher`]
//! - [`RedisPublisher`]: `PUBLISH` over a shared Redis connection
//!
//! ## Delivery
//!
//! Forwarding is at most once. Messages with an invalid topic, messages
//! whose publish fails and messages in flight at shutdown are logged and
//! dropped.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use airq_bridge::{IngressConfig, IngressSubscriber, RedisPublisher, Router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let publisher = RedisPublisher::open("redis://localhost:6379/")?;
//!     let router = Router::new(Arc::new(publisher));
//!
//!     let config = IngressConfig::new("bridge", "localhost", 1883, "airq/#");
//!     let connection = IngressSubscriber::connect(config, Arc::new(router)).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     connection.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod routing;
pub mod sink;
pub mod topic;

pub use client::{
	ClientSettings, IngressConfig, IngressError, IngressSubscriber, TlsMode,
};
pub use config::{BridgeConfig, ConfigError};
pub use connection::IngressConnection;
pub use routing::{Message, MessageHandler, RouteError, Router};
pub use sink::{ChannelPublisher, ForwardError, RedisPublisher};
pub use topic::{CHANNEL_PREFIX, Location, NAMESPACE, SchemaError};

/// Error types used throughout the crate
///
/// ```rust
/// use airq_bridge::errors::*;
/// ```
pub mod errors {
	pub use crate::client::{
		ConnectionEstablishmentError, IngressError, SubscriptionError,
	};
	pub use crate::{ConfigError, ForwardError, RouteError, SchemaError};
}
