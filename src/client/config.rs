//! Configuration for the MQTT ingress session

use std::time::Duration;

use arcstr::ArcStr;
use rumqttc::MqttOptions;

use super::error::IngressError;
use super::tls::TlsMode;

/// Event loop tuning
#[derive(Debug, Clone)]
pub struct ClientSettings {
	/// Capacity of the request channel between client and event loop
	pub event_loop_capacity: usize,
	/// How long to wait for the first CONNACK
	pub connection_timeout_millis: u64,
}

impl Default for ClientSettings {
	fn default() -> Self {
		Self {
			event_loop_capacity: 10,
			connection_timeout_millis: 10_000,
		}
	}
}

/// Everything needed to open the ingress session
#[derive(Debug, Clone)]
pub struct IngressConfig {
	/// Underlying MQTT connection options (from rumqttc)
	pub connection: MqttOptions,
	/// Topic filter subscribed on every (re)connect
	pub topic_pattern: ArcStr,
	/// Event loop settings
	pub settings: ClientSettings,
}

impl IngressConfig {
	/// Creates a config with a clean session and default settings.
	///
	/// Messages published while the bridge is disconnected are not
	/// delivered after reconnecting.
	pub fn new(
		client_id: &str,
		host: &str,
		port: u16,
		topic_pattern: impl Into<ArcStr>,
	) -> Self {
		let mut connection = MqttOptions::new(client_id, host, port);
		connection.set_clean_session(true);
		Self {
			connection,
			topic_pattern: topic_pattern.into(),
			settings: ClientSettings::default(),
		}
	}

	/// Sets user name and password. An empty user name sends no credentials.
	pub fn with_credentials(&mut self, user: &str, password: &str) -> &mut Self {
		if !user.is_empty() {
			self.connection.set_credentials(user, password);
		}
		self
	}

	/// Sets the keep-alive interval.
	pub fn with_keep_alive(&mut self, keep_alive: Duration) -> &mut Self {
		self.connection.set_keep_alive(keep_alive);
		self
	}

	/// Sets the time allowed for the initial handshake.
	pub fn with_connection_timeout(&mut self, timeout: Duration) -> &mut Self {
		self.settings.connection_timeout_millis =
			u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
		self
	}

	/// Switches the transport to TLS.
	///
	/// # Errors
	/// Returns `IngressError::CaFile`, `IngressError::NoCertificates` or
	/// `IngressError::Certificate` if the CA bundle cannot be loaded.
	pub fn with_tls(&mut self, mode: &TlsMode) -> Result<&mut Self, IngressError> {
		self.connection.set_transport(mode.transport()?);
		Ok(self)
	}
}
