use std::sync::Arc;
use std::time::Duration;

use arcstr::ArcStr;
use rumqttc::Packet::{self, Disconnect, Publish, SubAck};
use rumqttc::{AsyncClient, ConnAck, ConnectReturnCode, EventLoop, QoS};
use rumqttc::{Event::Incoming, Event::Outgoing, SubscribeReasonCode};
use tokio::time;
use tracing::{debug, error, info, warn};

use super::config::IngressConfig;
use super::error::{ConnectionEstablishmentError, IngressError, SubscriptionError};
use crate::connection::IngressConnection;
use crate::routing::{Message, MessageHandler};

const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Keeps a QoS 0 subscription on the broker and feeds a [`MessageHandler`].
///
/// The session is clean, so the subscription is registered again after
/// every successful (re)connect. Messages are handed to the handler one at
/// a time on the event loop task.
pub struct IngressSubscriber {
	client: AsyncClient,
	topic_pattern: ArcStr,
	handler: Arc<dyn MessageHandler>,
}

impl IngressSubscriber {
	/// Connects to the broker, subscribes and starts delivering messages.
	///
	/// # Errors
	/// `IngressError::ConnectionEstablishment` if the first handshake fails
	/// or times out. `IngressError::Subscription` if the subscription cannot
	/// be requested.
	pub async fn connect(
		config: IngressConfig,
		handler: Arc<dyn MessageHandler>,
	) -> Result<IngressConnection, IngressError> {
		let IngressConfig {
			connection,
			topic_pattern,
			settings,
		} = config;
		let (broker_host, broker_port) = connection.broker_address();
		let (client, new_event_loop) =
			AsyncClient::new(connection, settings.event_loop_capacity);

		let timeout_millis = settings.connection_timeout_millis;
		let connection_timeout = Duration::from_millis(timeout_millis);
		let connected_event_loop = time::timeout(
			connection_timeout,
			establish_connection(new_event_loop),
		)
		.await
		.map_err(|_| ConnectionEstablishmentError::Timeout { timeout_millis })?
		.map_err(IngressError::ConnectionEstablishment)?;

		let subscriber = Self {
			client: client.clone(),
			topic_pattern,
			handler,
		};
		subscriber.subscribe().await?;
		info!(
			host = %broker_host,
			port = broker_port,
			topic = %subscriber.topic_pattern,
			"MQTT client connected"
		);

		let event_loop_handle =
			tokio::spawn(subscriber.run(connected_event_loop));
		Ok(IngressConnection::new(client, event_loop_handle))
	}

	/// Requests the subscription; the SUBACK is checked by the event loop.
	async fn subscribe(&self) -> Result<(), IngressError> {
		self.client
			.subscribe(self.topic_pattern.as_str(), QoS::AtMostOnce)
			.await
			.map_err(|err| {
				IngressError::subscription(self.topic_pattern.as_str(), err)
			})?;
		debug!(topic = %self.topic_pattern, "Subscription requested");
		Ok(())
	}

	/// Event loop: delivers messages, resubscribes after reconnects.
	///
	/// Ends with `Ok` on DISCONNECT and with an error only when the
	/// subscription is refused.
	async fn run(self, mut event_loop: EventLoop) -> Result<(), IngressError> {
		let mut error_count: u32 = 0;

		loop {
			match event_loop.poll().await {
				| Ok(Incoming(Packet::ConnAck(ConnAck {
					code: ConnectReturnCode::Success,
					..
				}))) => {
					error_count = 0;
					info!("MQTT reconnected, resubscribing");
					self.subscribe().await?;
				}
				| Ok(Incoming(SubAck(ack))) => {
					if ack
						.return_codes
						.iter()
						.any(|code| matches!(code, SubscribeReasonCode::Failure))
					{
						error!(topic = %self.topic_pattern, "Broker refused subscription");
						return Err(IngressError::subscription(
							self.topic_pattern.as_str(),
							SubscriptionError::Refused,
						));
					}
					info!(topic = %self.topic_pattern, "Subscribed");
				}
				| Ok(Incoming(Publish(p))) => {
					error_count = 0;
					self.handler.handle(Message::new(p.topic, p.payload)).await;
				}
				| Ok(Incoming(Disconnect)) => {
					info!("Received MQTT Disconnect packet from server");
					break;
				}
				| Ok(Outgoing(rumqttc::Outgoing::Disconnect)) => {
					info!("Sent MQTT Disconnect packet to server");
					break;
				}
				| Ok(notification) => {
					error_count = 0;
					debug!(notification = ?notification, "MQTT notification");
				}
				| Err(err) => {
					error_count = error_count.saturating_add(1);
					let delay = retry_delay(error_count);
					warn!(
						error = %err,
						error_count,
						delay = ?delay,
						"MQTT event loop error, reconnecting"
					);
					time::sleep(delay).await;
				}
			}
		}
		info!("MQTT event loop terminated");
		Ok(())
	}
}

async fn establish_connection(
	mut event_loop: EventLoop,
) -> Result<EventLoop, ConnectionEstablishmentError> {
	loop {
		match event_loop.poll().await {
			| Ok(Incoming(Packet::ConnAck(ConnAck { code, .. }))) => {
				if code == ConnectReturnCode::Success {
					debug!("MQTT connection established successfully");
					return Ok(event_loop);
				} else {
					debug!(code = ?code, "MQTT connection rejected by broker");
					return Err(ConnectionEstablishmentError::BrokerRejected {
						code,
					});
				}
			}
			| Ok(notification) => {
				debug!(notification = ?notification, "Bootstrap phase notification");
			}
			| Err(connection_err) => {
				debug!(error = %connection_err, "MQTT connection error during bootstrap phase");
				return Err(ConnectionEstablishmentError::Network(connection_err));
			}
		}
	}
}

/// Exponential backoff: 100ms doubling per consecutive error, capped at 30s.
fn retry_delay(error_count: u32) -> Duration {
	let exponent = error_count.saturating_sub(1).min(10);
	(INITIAL_RETRY_DELAY * 2_u32.pow(exponent)).min(MAX_RETRY_DELAY)
}

#[cfg(test)]
mod tests {
	use tokio::io::{AsyncReadExt, AsyncWriteExt};
	use tokio::net::{TcpListener, TcpStream};
	use tokio::sync::mpsc;

	use super::*;

	const CONNECT: u8 = 0x10;
	const SUBSCRIBE: u8 = 0x82;
	const CONNACK_ACCEPTED: [u8; 4] = [0x20, 2, 0, 0];
	const SUBACK_QOS0: u8 = 0x00;
	const SUBACK_FAILURE: u8 = 0x80;
	const STEP_TIMEOUT: Duration = Duration::from_secs(5);

	struct Discard;

	#[async_trait::async_trait]
	impl MessageHandler for Discard {
		async fn handle(&self, _message: Message) {}
	}

	struct Collect(mpsc::UnboundedSender<Message>);

	#[async_trait::async_trait]
	impl MessageHandler for Collect {
		async fn handle(&self, message: Message) {
			let _ = self.0.send(message);
		}
	}

	/// Reads one MQTT packet, returning its first header byte and body.
	async fn read_packet(socket: &mut TcpStream) -> (u8, Vec<u8>) {
		let header = socket.read_u8().await.unwrap();
		let mut remaining = 0usize;
		let mut shift = 0;
		loop {
			let byte = socket.read_u8().await.unwrap();
			remaining |= usize::from(byte & 0x7f) << shift;
			if byte & 0x80 == 0 {
				break;
			}
			shift += 7;
		}
		let mut body = vec![0; remaining];
		socket.read_exact(&mut body).await.unwrap();
		(header, body)
	}

	async fn accept_session(listener: &TcpListener) -> TcpStream {
		let (mut socket, _) = listener.accept().await.unwrap();
		let (header, _) = read_packet(&mut socket).await;
		assert_eq!(header, CONNECT);
		socket.write_all(&CONNACK_ACCEPTED).await.unwrap();
		socket
	}

	/// Reads a SUBSCRIBE, checks filter and QoS, answers with `code`.
	async fn answer_subscribe(socket: &mut TcpStream, code: u8) {
		let (header, body) = read_packet(socket).await;
		assert_eq!(header, SUBSCRIBE);
		let filter_len = usize::from(u16::from_be_bytes([body[2], body[3]]));
		assert_eq!(&body[4 .. 4 + filter_len], b"airq/#");
		assert_eq!(body[4 + filter_len], 0, "subscription must use QoS 0");
		socket
			.write_all(&[0x90, 3, body[0], body[1], code])
			.await
			.unwrap();
	}

	fn publish_packet(topic: &str, payload: &[u8]) -> Vec<u8> {
		let mut packet = vec![0x30, (2 + topic.len() + payload.len()) as u8];
		packet.extend_from_slice(&(topic.len() as u16).to_be_bytes());
		packet.extend_from_slice(topic.as_bytes());
		packet.extend_from_slice(payload);
		packet
	}

	#[test]
	fn test_retry_delay_doubles_until_cap() {
		assert_eq!(retry_delay(1), Duration::from_millis(100));
		assert_eq!(retry_delay(2), Duration::from_millis(200));
		assert_eq!(retry_delay(5), Duration::from_millis(1_600));
		assert_eq!(retry_delay(9), Duration::from_millis(25_600));
		assert_eq!(retry_delay(10), MAX_RETRY_DELAY);
		assert_eq!(retry_delay(u32::MAX), MAX_RETRY_DELAY);
	}

	#[tokio::test]
	async fn test_unreachable_broker_is_not_fatal() {
		// Nothing listens on port 1 of the loopback interface.
		let mut config = IngressConfig::new("test", "127.0.0.1", 1, "airq/#");
		config.settings.connection_timeout_millis = 2_000;

		let Err(err) = IngressSubscriber::connect(config, Arc::new(Discard)).await
		else {
			panic!("connecting to a closed port must fail");
		};

		assert!(matches!(err, IngressError::ConnectionEstablishment(_)));
		assert!(!err.is_fatal());
	}

	#[tokio::test]
	async fn test_delivers_and_resubscribes_after_reconnect() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();
		let (tx, mut rx) = mpsc::unbounded_channel();
		let config = IngressConfig::new("test", "127.0.0.1", port, "airq/#");

		let (connection, mut socket) = tokio::join!(
			IngressSubscriber::connect(config, Arc::new(Collect(tx))),
			accept_session(&listener),
		);
		let mut connection = connection.unwrap();

		answer_subscribe(&mut socket, SUBACK_QOS0).await;
		socket
			.write_all(&publish_packet("airq/a/b/c", b"23.5"))
			.await
			.unwrap();
		let message = time::timeout(STEP_TIMEOUT, rx.recv())
			.await
			.unwrap()
			.unwrap();
		assert_eq!(message.topic(), "airq/a/b/c");
		assert_eq!(message.payload().as_ref(), b"23.5");

		// Broker goes away; the client reconnects and must subscribe again.
		drop(socket);
		let mut socket = time::timeout(STEP_TIMEOUT, accept_session(&listener))
			.await
			.unwrap();
		time::timeout(STEP_TIMEOUT, answer_subscribe(&mut socket, SUBACK_QOS0))
			.await
			.unwrap();

		socket
			.write_all(&publish_packet("airq/d/e/f", b"7"))
			.await
			.unwrap();
		let message = time::timeout(STEP_TIMEOUT, rx.recv())
			.await
			.unwrap()
			.unwrap();
		assert_eq!(message.topic(), "airq/d/e/f");

		time::timeout(STEP_TIMEOUT, connection.shutdown())
			.await
			.unwrap()
			.unwrap();
	}

	#[tokio::test]
	async fn test_refused_subscription_is_fatal() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();
		let config = IngressConfig::new("test", "127.0.0.1", port, "airq/#");

		let (connection, mut socket) = tokio::join!(
			IngressSubscriber::connect(config, Arc::new(Discard)),
			accept_session(&listener),
		);
		let mut connection = connection.unwrap();

		answer_subscribe(&mut socket, SUBACK_FAILURE).await;
		let result = time::timeout(STEP_TIMEOUT, connection.closed())
			.await
			.unwrap();

		assert!(matches!(
			result,
			Err(IngressError::Subscription {
				source: SubscriptionError::Refused,
				..
			})
		));
		assert!(result.unwrap_err().is_fatal());
	}
}
