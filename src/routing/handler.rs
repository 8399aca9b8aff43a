//! Consumer interface between the subscriber and the router

use arcstr::ArcStr;
use async_trait::async_trait;
use bytes::Bytes;

/// Message as delivered by the MQTT broker.
///
/// The payload is opaque and passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
	topic: ArcStr,
	payload: Bytes,
}

impl Message {
	/// Creates a message from its topic and payload.
	pub fn new(topic: impl Into<ArcStr>, payload: impl Into<Bytes>) -> Self {
		Self {
			topic: topic.into(),
			payload: payload.into(),
		}
	}

	/// Topic the message was published on.
	pub fn topic(&self) -> &ArcStr {
		&self.topic
	}

	/// Raw payload.
	pub fn payload(&self) -> &Bytes {
		&self.payload
	}
}

/// Receives every message delivered on the subscription.
///
/// Called serially from the MQTT event loop task. Implementations deal with
/// their own failures: nothing returned here can stop the subscription.
#[async_trait]
pub trait MessageHandler: Send + Sync {
	/// Handles one delivered message.
	async fn handle(&self, message: Message);
}
