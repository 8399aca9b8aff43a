use thiserror::Error;

/// Errors raised while handing a payload to the destination store
#[derive(Debug, Error)]
pub enum ForwardError {
	/// Redis URL could not be parsed
	#[error("Invalid Redis address '{url}': {source}")]
	InvalidAddress {
		/// The rejected URL
		url: String,
		/// Parser error
		#[source]
		source: ::redis::RedisError,
	},

	/// No connection to Redis could be established
	#[error("Failed to connect to Redis: {0}")]
	Connect(#[source] ::redis::RedisError),

	/// PUBLISH command failed
	#[error("Failed to publish on channel '{channel}': {source}")]
	Publish {
		/// Destination channel
		channel: String,
		/// Underlying Redis error
		#[source]
		source: ::redis::RedisError,
	},

	/// Publisher-specific failure, used by non-Redis implementations
	#[error("Failed to publish on channel '{channel}': {reason}")]
	Rejected {
		/// Destination channel
		channel: String,
		/// Why the publish was rejected
		reason: String,
	},
}

impl ForwardError {
	/// Creates a new Publish error
	pub fn publish(channel: impl Into<String>, source: ::redis::RedisError) -> Self {
		Self::Publish {
			channel: channel.into(),
			source,
		}
	}

	/// Creates a new Rejected error
	pub fn rejected(channel: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::Rejected {
			channel: channel.into(),
			reason: reason.into(),
		}
	}
}
