//! Destination side of the bridge
//!
//! The router only needs a way to publish a payload on a named channel.
//! [`ChannelPublisher`] is that seam; [`RedisPublisher`] is the production
//! implementation.

pub mod error;
pub mod redis_publisher;

use async_trait::async_trait;
use bytes::Bytes;

pub use self::error::ForwardError;
pub use self::redis_publisher::RedisPublisher;

/// Fire-and-forget publish primitive of the destination store.
///
/// Implementations must be safe to share between concurrent forwards; the
/// router calls them without extra synchronization.
#[async_trait]
pub trait ChannelPublisher: Send + Sync {
	/// Publishes `payload` unchanged on `channel`.
	async fn publish(
		&self,
		channel: &str,
		payload: Bytes,
	) -> Result<(), ForwardError>;
}
