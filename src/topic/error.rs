//! Topic schema errors

use thiserror::Error;

/// Reasons a topic does not match `airq/<city>/<building>/<room>`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
	/// Topic does not split into exactly four sections
	#[error(
		"MQTT topic '{topic}' has {found} sections, requires 4: airq, city, \
		 building, room"
	)]
	SectionCount {
		/// The rejected topic
		topic: String,
		/// Number of sections found
		found: usize,
	},

	/// First section is not the reserved namespace
	#[error("MQTT topic '{topic}' needs to start with {expected}")]
	Namespace {
		/// The rejected topic
		topic: String,
		/// Namespace the topic must start with
		expected: &'static str,
	},

	/// One of city, building or room is empty
	#[error(
		"MQTT topic '{topic}' has an empty section at position {position}, \
		 expected airq/city/building/room"
	)]
	EmptySection {
		/// The rejected topic
		topic: String,
		/// Zero-based index of the first empty section
		position: usize,
	},
}

impl SchemaError {
	/// Creates a new SectionCount error
	pub fn section_count(topic: impl Into<String>, found: usize) -> Self {
		Self::SectionCount {
			topic: topic.into(),
			found,
		}
	}

	/// Creates a new Namespace error
	pub fn namespace(topic: impl Into<String>) -> Self {
		Self::Namespace {
			topic: topic.into(),
			expected: super::NAMESPACE,
		}
	}

	/// Creates a new EmptySection error
	pub fn empty_section(topic: impl Into<String>, position: usize) -> Self {
		Self::EmptySection {
			topic: topic.into(),
			position,
		}
	}

	/// The topic that failed validation.
	pub fn topic(&self) -> &str {
		match self {
			| Self::SectionCount { topic, .. }
			| Self::Namespace { topic, .. }
			| Self::EmptySection { topic, .. } => topic,
		}
	}
}
