//! MQTT connection lifecycle
//!
//! The handle returned by
//! [`IngressSubscriber::connect`](crate::client::IngressSubscriber::connect)
//! owns the event loop task.

use rumqttc::AsyncClient;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::client::IngressError;

/// Handle to a running ingress session
///
/// Keep it alive for as long as messages should be forwarded.
pub struct IngressConnection {
	client: AsyncClient,
	event_loop_handle: Option<JoinHandle<Result<(), IngressError>>>,
}

impl IngressConnection {
	pub(crate) fn new(
		client: AsyncClient,
		event_loop_handle: JoinHandle<Result<(), IngressError>>,
	) -> Self {
		Self {
			client,
			event_loop_handle: Some(event_loop_handle),
		}
	}

	/// Waits until the event loop stops.
	///
	/// Resolves with `Ok` after a DISCONNECT and with the fatal error
	/// otherwise. Cancel safe: dropping the future keeps the session running.
	pub async fn closed(&mut self) -> Result<(), IngressError> {
		let Some(handle) = self.event_loop_handle.as_mut() else {
			return Ok(());
		};
		let result = handle.await;
		self.event_loop_handle = None;
		result?
	}

	/// Sends DISCONNECT and waits for the event loop to finish.
	///
	/// A message being forwarded at that moment completes first; nothing
	/// else is drained.
	pub async fn shutdown(mut self) -> Result<(), IngressError> {
		if let Err(e) = self.client.disconnect().await {
			warn!(error = %e, "Failed to disconnect MQTT client");
		}

		match self.event_loop_handle.take() {
			| Some(handle) => handle.await?,
			| None => Ok(()),
		}
	}
}

impl std::fmt::Debug for IngressConnection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("IngressConnection")
			.field("running", &self.event_loop_handle.is_some())
			.finish_non_exhaustive()
	}
}

impl Drop for IngressConnection {
	fn drop(&mut self) {
		if let Some(handle) = self.event_loop_handle.take() {
			if !handle.is_finished() {
				error!(
					"IngressConnection dropped without calling shutdown(). \
					 Please call shutdown() and await its completion before \
					 dropping."
				);
				handle.abort();
			}
		}
	}
}
