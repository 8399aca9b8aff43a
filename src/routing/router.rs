use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::error::RouteError;
use super::handler::{Message, MessageHandler};
use crate::sink::ChannelPublisher;
use crate::topic::{CHANNEL_PREFIX, Location};

/// Validates topics and forwards payloads to the destination store.
///
/// Delivery is at most once. A message whose topic is invalid or whose
/// publish fails is logged and dropped: there is no retry, buffering or
/// dead-letter channel. The router keeps no state between messages, so
/// routing the same message twice publishes it twice.
#[derive(Clone)]
pub struct Router {
	publisher: Arc<dyn ChannelPublisher>,
	prefix: &'static str,
}

impl Router {
	/// Creates a router publishing through `publisher`.
	pub fn new(publisher: Arc<dyn ChannelPublisher>) -> Self {
		Self {
			publisher,
			prefix: CHANNEL_PREFIX,
		}
	}

	/// Forwards `message` and returns the channel it was published on.
	pub async fn forward(&self, message: &Message) -> Result<String, RouteError> {
		let location = Location::parse(message.topic())?;
		let channel = location.channel_name(self.prefix);
		self.publisher
			.publish(&channel, message.payload().clone())
			.await?;
		Ok(channel)
	}

	/// Forwards `message`, logging the outcome instead of returning it.
	pub async fn route(&self, message: &Message) {
		debug!(topic = %message.topic(), payload_size = message.payload().len(), "Received MQTT message");

		match self.forward(message).await {
			| Ok(channel) => {
				info!(channel = %channel, "Forwarded message to Redis");
			}
			| Err(RouteError::Schema(err)) => {
				warn!(topic = %message.topic(), error = %err, "Dropping message with invalid topic");
			}
			| Err(RouteError::Forward(err)) => {
				error!(topic = %message.topic(), error = %err, "Could not publish to Redis");
			}
		}
	}
}

#[async_trait]
impl MessageHandler for Router {
	async fn handle(&self, message: Message) {
		self.route(&message).await;
	}
}

impl std::fmt::Debug for Router {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Router")
			.field("prefix", &self.prefix)
			.finish_non_exhaustive()
	}
}
