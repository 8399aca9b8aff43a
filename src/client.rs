//! MQTT ingress side of the bridge
//!
//! Connects to the broker over TLS, keeps the topic subscription alive
//! across reconnects and hands every delivered message to a
//! [`MessageHandler`](crate::routing::MessageHandler).

pub mod config;
/// Ingress error types
pub mod error;
/// Subscription event loop
pub mod subscriber;
pub mod tls;

pub use config::{ClientSettings, IngressConfig};
pub use error::{ConnectionEstablishmentError, IngressError, SubscriptionError};
pub use subscriber::IngressSubscriber;
pub use tls::TlsMode;

// Connection handle lives at the crate root: crate::IngressConnection
