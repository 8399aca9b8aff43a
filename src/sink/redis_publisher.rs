//! Redis pub/sub publisher

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{ChannelPublisher, ForwardError};

// Forwards run on the MQTT event loop task, so a down store must fail fast.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(2);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);
const CONNECT_RETRIES: usize = 1;

/// Publishes payloads with Redis `PUBLISH`.
///
/// The underlying [`ConnectionManager`] is created on first use and shared
/// by every forward afterwards. Once created it reconnects by itself after
/// connection errors; the command that hit the error still fails. If the
/// initial connection cannot be made, the next publish tries again.
///
/// Connecting and each command are bounded by short timeouts, so an
/// unreachable server costs a forward a few seconds at most.
pub struct RedisPublisher {
	client: Client,
	connection: OnceCell<ConnectionManager>,
}

impl RedisPublisher {
	/// Prepares a publisher for `url` without connecting.
	pub fn open(url: &str) -> Result<Self, ForwardError> {
		let client =
			Client::open(url).map_err(|source| ForwardError::InvalidAddress {
				url: url.to_owned(),
				source,
			})?;
		Ok(Self {
			client,
			connection: OnceCell::new(),
		})
	}

	/// Connects and checks the server answers `PING`.
	pub async fn connect(&self) -> Result<(), ForwardError> {
		let mut connection = self.connection().await?;
		let _: String = redis::cmd("PING")
			.query_async(&mut connection)
			.await
			.map_err(ForwardError::Connect)?;
		info!(address = ?self.client.get_connection_info().addr, "Connected to Redis");
		Ok(())
	}

	async fn connection(&self) -> Result<ConnectionManager, ForwardError> {
		self.connection
			.get_or_try_init(|| {
				ConnectionManager::new_with_config(
					self.client.clone(),
					manager_config(),
				)
			})
			.await
			.cloned()
			.map_err(ForwardError::Connect)
	}
}

fn manager_config() -> ConnectionManagerConfig {
	ConnectionManagerConfig::new()
		.set_number_of_retries(CONNECT_RETRIES)
		.set_connection_timeout(CONNECTION_TIMEOUT)
		.set_response_timeout(RESPONSE_TIMEOUT)
}

#[async_trait]
impl ChannelPublisher for RedisPublisher {
	async fn publish(
		&self,
		channel: &str,
		payload: Bytes,
	) -> Result<(), ForwardError> {
		let mut connection = self.connection().await?;
		let receivers: i64 = connection
			.publish(channel, payload.as_ref())
			.await
			.map_err(|source| ForwardError::publish(channel, source))?;
		debug!(channel, receivers, "Published to Redis");
		Ok(())
	}
}

impl std::fmt::Debug for RedisPublisher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RedisPublisher")
			.field("address", &self.client.get_connection_info().addr)
			.field("connected", &self.connection.initialized())
			.finish()
	}
}
