//! Process configuration from environment variables
//!
//! Variable names match the Kubernetes service environment of the MQTT
//! broker (`MQTT_MOSQUITTO_SERVICE_*`) and the Redis instance
//! (`PUBSUB_REDIS_SERVICE_*`).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::client::{IngressConfig, IngressError, TlsMode};

pub const MQTT_HOST: &str = "MQTT_MOSQUITTO_SERVICE_HOST";
pub const MQTT_PORT: &str = "MQTT_MOSQUITTO_SERVICE_PORT";
pub const MQTT_USER: &str = "MQTT_USER";
pub const MQTT_PASS: &str = "MQTT_PASS";
pub const MQTT_TOPIC: &str = "MQTT_TOPIC";
pub const MQTT_CLIENT_ID: &str = "MQTT_CLIENT_ID";
pub const MQTT_CA_FILE: &str = "MQTT_CA_FILE";
pub const MQTT_TLS_INSECURE: &str = "MQTT_TLS_INSECURE";
pub const MQTT_KEEP_ALIVE_SECS: &str = "MQTT_KEEP_ALIVE_SECS";
pub const MQTT_CONNECT_TIMEOUT_MS: &str = "MQTT_CONNECT_TIMEOUT_MS";
pub const REDIS_HOST: &str = "PUBSUB_REDIS_SERVICE_HOST";
pub const REDIS_PORT: &str = "PUBSUB_REDIS_SERVICE_PORT";

const DEFAULT_MQTT_PORT: u16 = 8883;
const DEFAULT_MQTT_TOPIC: &str = "airq/#";
const DEFAULT_KEEP_ALIVE_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
const FALLBACK_CLIENT_ID: &str = "airq-bridge";

/// Invalid or missing configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
	/// Required variable is unset or empty
	#[error("Required environment variable {key} is not set")]
	Missing {
		/// Variable name
		key: &'static str,
	},

	/// Variable is set but cannot be used
	#[error("Invalid value '{value}' for {key}: {reason}")]
	Invalid {
		/// Variable name
		key: &'static str,
		/// Offending value
		value: String,
		/// What is wrong with it
		reason: String,
	},
}

impl ConfigError {
	/// Creates a new Invalid error
	pub fn invalid(
		key: &'static str,
		value: impl Into<String>,
		reason: impl Into<String>,
	) -> Self {
		Self::Invalid {
			key,
			value: value.into(),
			reason: reason.into(),
		}
	}
}

/// Bridge configuration
#[derive(Clone, PartialEq, Eq)]
pub struct BridgeConfig {
	pub mqtt_host: String,
	pub mqtt_port: u16,
	pub mqtt_user: String,
	pub mqtt_pass: String,
	pub mqtt_topic: String,
	pub mqtt_client_id: String,
	pub tls: TlsMode,
	pub keep_alive: Duration,
	pub connect_timeout: Duration,
	pub redis_host: String,
	pub redis_port: u16,
}

impl BridgeConfig {
	/// Reads the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Reads the configuration through `lookup`, which returns the value of
	/// a variable if it is set.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where F: Fn(&str) -> Option<String> {
		let mqtt_host = required(&lookup, MQTT_HOST)?;
		let redis_host = required(&lookup, REDIS_HOST)?;
		let redis_port: u16 = parse(&lookup, REDIS_PORT)?
			.ok_or(ConfigError::Missing { key: REDIS_PORT })?;

		let mqtt_port = parse(&lookup, MQTT_PORT)?.unwrap_or(DEFAULT_MQTT_PORT);
		let mqtt_user = lookup(MQTT_USER).unwrap_or_default();
		let mqtt_pass = lookup(MQTT_PASS).unwrap_or_default();
		let mqtt_topic = lookup(MQTT_TOPIC)
			.filter(|topic| !topic.is_empty())
			.unwrap_or_else(|| DEFAULT_MQTT_TOPIC.to_string());
		let mqtt_client_id = lookup(MQTT_CLIENT_ID)
			.filter(|id| !id.is_empty())
			.unwrap_or_else(default_client_id);

		let insecure = parse_bool(&lookup, MQTT_TLS_INSECURE)?.unwrap_or(false);
		let tls = match (insecure, lookup(MQTT_CA_FILE).filter(|p| !p.is_empty())) {
			| (true, _) => TlsMode::Insecure,
			| (false, Some(path)) => TlsMode::CaFile(PathBuf::from(path)),
			| (false, None) => TlsMode::NativeRoots,
		};

		let keep_alive_secs = parse(&lookup, MQTT_KEEP_ALIVE_SECS)?
			.unwrap_or(DEFAULT_KEEP_ALIVE_SECS);
		if keep_alive_secs < 5 {
			return Err(ConfigError::invalid(
				MQTT_KEEP_ALIVE_SECS,
				keep_alive_secs.to_string(),
				"keep-alive must be at least 5 seconds",
			));
		}
		let connect_timeout_ms = parse(&lookup, MQTT_CONNECT_TIMEOUT_MS)?
			.unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS);
		if connect_timeout_ms == 0 {
			return Err(ConfigError::invalid(
				MQTT_CONNECT_TIMEOUT_MS,
				"0",
				"timeout must be greater than 0",
			));
		}

		Ok(Self {
			mqtt_host,
			mqtt_port,
			mqtt_user,
			mqtt_pass,
			mqtt_topic,
			mqtt_client_id,
			tls,
			keep_alive: Duration::from_secs(keep_alive_secs),
			connect_timeout: Duration::from_millis(connect_timeout_ms),
			redis_host,
			redis_port,
		})
	}

	/// Address handed to the Redis client.
	pub fn redis_url(&self) -> String {
		format!("redis://{}:{}/", self.redis_host, self.redis_port)
	}

	/// MQTT session settings derived from this configuration.
	///
	/// # Errors
	/// Returns `IngressError` if the TLS setup cannot be built.
	pub fn ingress_config(&self) -> Result<IngressConfig, IngressError> {
		let mut config = IngressConfig::new(
			&self.mqtt_client_id,
			&self.mqtt_host,
			self.mqtt_port,
			self.mqtt_topic.as_str(),
		);
		config
			.with_credentials(&self.mqtt_user, &self.mqtt_pass)
			.with_keep_alive(self.keep_alive)
			.with_connection_timeout(self.connect_timeout)
			.with_tls(&self.tls)?;
		Ok(config)
	}
}

impl std::fmt::Debug for BridgeConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BridgeConfig")
			.field("mqtt_host", &self.mqtt_host)
			.field("mqtt_port", &self.mqtt_port)
			.field("mqtt_user", &self.mqtt_user)
			.field("mqtt_pass", &"<redacted>")
			.field("mqtt_topic", &self.mqtt_topic)
			.field("mqtt_client_id", &self.mqtt_client_id)
			.field("tls", &self.tls)
			.field("keep_alive", &self.keep_alive)
			.field("connect_timeout", &self.connect_timeout)
			.field("redis_host", &self.redis_host)
			.field("redis_port", &self.redis_port)
			.finish()
	}
}

/// Local host name, so instances on different hosts get distinct sessions.
pub fn default_client_id() -> String {
	hostname::get()
		.ok()
		.map(|name| name.to_string_lossy().into_owned())
		.filter(|name| !name.is_empty())
		.unwrap_or_else(|| FALLBACK_CLIENT_ID.to_string())
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where F: Fn(&str) -> Option<String> {
	lookup(key)
		.filter(|value| !value.is_empty())
		.ok_or(ConfigError::Missing { key })
}

fn parse<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
	F: Fn(&str) -> Option<String>,
	T: FromStr,
	T::Err: std::fmt::Display,
{
	match lookup(key).filter(|value| !value.is_empty()) {
		| Some(value) => value
			.trim()
			.parse()
			.map(Some)
			.map_err(|err: T::Err| ConfigError::invalid(key, value.as_str(), err.to_string())),
		| None => Ok(None),
	}
}

fn parse_bool<F>(lookup: &F, key: &'static str) -> Result<Option<bool>, ConfigError>
where F: Fn(&str) -> Option<String> {
	match lookup(key).filter(|value| !value.is_empty()) {
		| Some(value) if value == "1" || value.eq_ignore_ascii_case("true") => {
			Ok(Some(true))
		}
		| Some(value) if value == "0" || value.eq_ignore_ascii_case("false") => {
			Ok(Some(false))
		}
		| Some(value) => Err(ConfigError::invalid(key, value, "expected true or false")),
		| None => Ok(None),
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	fn load(vars: &[(&str, &str)]) -> Result<BridgeConfig, ConfigError> {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		BridgeConfig::from_lookup(|key| vars.get(key).cloned())
	}

	const MINIMAL: &[(&str, &str)] = &[
		(MQTT_HOST, "mosquitto"),
		(REDIS_HOST, "redis"),
		(REDIS_PORT, "6379"),
	];

	#[test]
	fn test_defaults() {
		let config = load(MINIMAL).unwrap();

		assert_eq!(config.mqtt_host, "mosquitto");
		assert_eq!(config.mqtt_port, 8883);
		assert_eq!(config.mqtt_user, "");
		assert_eq!(config.mqtt_pass, "");
		assert_eq!(config.mqtt_topic, "airq/#");
		assert_eq!(config.mqtt_client_id, default_client_id());
		assert_eq!(config.tls, TlsMode::NativeRoots);
		assert_eq!(config.keep_alive, Duration::from_secs(30));
		assert_eq!(config.connect_timeout, Duration::from_secs(10));
		assert_eq!(config.redis_url(), "redis://redis:6379/");
	}

	#[test]
	fn test_missing_required_variables() {
		assert_eq!(
			load(&[(REDIS_HOST, "redis"), (REDIS_PORT, "6379")]),
			Err(ConfigError::Missing { key: MQTT_HOST })
		);
		assert_eq!(
			load(&[(MQTT_HOST, "mosquitto"), (REDIS_PORT, "6379")]),
			Err(ConfigError::Missing { key: REDIS_HOST })
		);
		assert_eq!(
			load(&[(MQTT_HOST, "mosquitto"), (REDIS_HOST, "redis")]),
			Err(ConfigError::Missing { key: REDIS_PORT })
		);
		assert_eq!(
			load(&[(MQTT_HOST, ""), (REDIS_HOST, "redis"), (REDIS_PORT, "6379")]),
			Err(ConfigError::Missing { key: MQTT_HOST })
		);
	}

	#[test]
	fn test_overrides() {
		let mut vars = MINIMAL.to_vec();
		vars.extend([
			(MQTT_PORT, "1883"),
			(MQTT_USER, "bridge"),
			(MQTT_PASS, "secret"),
			(MQTT_TOPIC, "airq/springfield/#"),
			(MQTT_CLIENT_ID, "bridge-1"),
			(MQTT_CA_FILE, "/etc/airq/ca.pem"),
			(MQTT_KEEP_ALIVE_SECS, "60"),
			(MQTT_CONNECT_TIMEOUT_MS, "2500"),
		]);
		let config = load(&vars).unwrap();

		assert_eq!(config.mqtt_port, 1883);
		assert_eq!(config.mqtt_user, "bridge");
		assert_eq!(config.mqtt_pass, "secret");
		assert_eq!(config.mqtt_topic, "airq/springfield/#");
		assert_eq!(config.mqtt_client_id, "bridge-1");
		assert_eq!(config.tls, TlsMode::CaFile(PathBuf::from("/etc/airq/ca.pem")));
		assert_eq!(config.keep_alive, Duration::from_secs(60));
		assert_eq!(config.connect_timeout, Duration::from_millis(2500));
	}

	#[test]
	fn test_insecure_wins_over_ca_file() {
		let mut vars = MINIMAL.to_vec();
		vars.extend([(MQTT_CA_FILE, "/etc/airq/ca.pem"), (MQTT_TLS_INSECURE, "true")]);

		assert_eq!(load(&vars).unwrap().tls, TlsMode::Insecure);
	}

	#[test]
	fn test_invalid_values() {
		let mut vars = MINIMAL.to_vec();
		vars.push((MQTT_PORT, "mqtt"));
		assert!(matches!(
			load(&vars),
			Err(ConfigError::Invalid { key: MQTT_PORT, .. })
		));

		let vars = [(MQTT_HOST, "m"), (REDIS_HOST, "r"), (REDIS_PORT, "70000")];
		assert!(matches!(
			load(&vars),
			Err(ConfigError::Invalid { key: REDIS_PORT, .. })
		));

		let mut vars = MINIMAL.to_vec();
		vars.push((MQTT_TLS_INSECURE, "maybe"));
		assert!(matches!(
			load(&vars),
			Err(ConfigError::Invalid { key: MQTT_TLS_INSECURE, .. })
		));

		let mut vars = MINIMAL.to_vec();
		vars.push((MQTT_KEEP_ALIVE_SECS, "2"));
		assert!(matches!(
			load(&vars),
			Err(ConfigError::Invalid { key: MQTT_KEEP_ALIVE_SECS, .. })
		));
	}

	#[test]
	fn test_ingress_config() {
		let mut vars = MINIMAL.to_vec();
		vars.extend([
			(MQTT_USER, "bridge"),
			(MQTT_PASS, "secret"),
			(MQTT_CLIENT_ID, "bridge-1"),
			(MQTT_TLS_INSECURE, "1"),
		]);
		let ingress = load(&vars).unwrap().ingress_config().unwrap();

		assert_eq!(ingress.topic_pattern, "airq/#");
		assert_eq!(ingress.connection.client_id(), "bridge-1");
		assert!(ingress.connection.clean_session());
		assert_eq!(
			ingress.connection.broker_address(),
			("mosquitto".to_string(), 8883)
		);
		assert_eq!(
			ingress.connection.credentials(),
			Some(("bridge".to_string(), "secret".to_string()))
		);
	}

	#[test]
	fn test_debug_redacts_password() {
		let mut vars = MINIMAL.to_vec();
		vars.push((MQTT_PASS, "hunter2"));
		let rendered = format!("{:?}", load(&vars).unwrap());

		assert!(!rendered.contains("hunter2"));
	}
}
