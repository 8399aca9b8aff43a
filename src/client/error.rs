use std::path::PathBuf;

use rumqttc::tokio_rustls::rustls;
use thiserror::Error;

/// Failures of the first connection handshake
#[derive(Debug, Error)]
pub enum ConnectionEstablishmentError {
	#[error("Network connection failed: {0}")]
	Network(#[from] rumqttc::ConnectionError),

	#[error("Broker rejected connection: {code:?}")]
	BrokerRejected { code: rumqttc::ConnectReturnCode },

	#[error("Connection establishment timed out after {timeout_millis}ms")]
	Timeout { timeout_millis: u64 },
}

/// Why the topic subscription could not be registered
#[derive(Debug, Error)]
pub enum SubscriptionError {
	/// Subscribe request could not be queued
	#[error("Failed to request subscription: {0}")]
	Request(#[from] rumqttc::ClientError),
	/// Broker answered SUBACK with a failure code
	#[error("Broker refused subscription")]
	Refused,
}

/// Errors of the MQTT ingress session
#[derive(Debug, Error)]
pub enum IngressError {
	/// Initial connection failed
	#[error("Failed to establish connection: {0}")]
	ConnectionEstablishment(#[from] ConnectionEstablishmentError),

	/// Topic subscription could not be registered
	#[error("Failed to subscribe to '{topic}': {source}")]
	Subscription {
		/// Topic filter
		topic: String,
		/// Cause
		#[source]
		source: SubscriptionError,
	},

	/// CA bundle could not be read
	#[error("Failed to read CA file '{}': {source}", .path.display())]
	CaFile {
		/// Path of the bundle
		path: PathBuf,
		/// I/O error
		#[source]
		source: std::io::Error,
	},

	/// CA bundle contains no usable certificate
	#[error("No certificates found in CA file '{}'", .path.display())]
	NoCertificates {
		/// Path of the bundle
		path: PathBuf,
	},

	/// Certificate rejected by rustls
	#[error("Invalid certificate: {0}")]
	Certificate(#[from] rustls::Error),

	/// Event loop task panicked or was cancelled
	#[error("MQTT event loop aborted: {0}")]
	EventLoopAborted(String),
}

impl IngressError {
	/// Creates a new Subscription error
	pub fn subscription(
		topic: impl Into<String>,
		source: impl Into<SubscriptionError>,
	) -> Self {
		Self::Subscription {
			topic: topic.into(),
			source: source.into(),
		}
	}

	/// Whether the bridge cannot keep running after this error.
	///
	/// A failed connection attempt is reported and survived; a bridge
	/// without its subscription or with an unusable TLS setup is not.
	pub fn is_fatal(&self) -> bool {
		!matches!(self, Self::ConnectionEstablishment(_))
	}
}

impl From<tokio::task::JoinError> for IngressError {
	fn from(err: tokio::task::JoinError) -> Self {
		Self::EventLoopAborted(err.to_string())
	}
}
