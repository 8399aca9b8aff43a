use thiserror::Error;

use crate::sink::ForwardError;
use crate::topic::SchemaError;

/// Why a single message was dropped
#[derive(Debug, Error)]
pub enum RouteError {
	/// Topic does not match the routing key schema
	#[error("Invalid topic: {0}")]
	Schema(#[from] SchemaError),

	/// Destination publish failed
	#[error("Forward failed: {0}")]
	Forward(#[from] ForwardError),
}
