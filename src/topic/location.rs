//! Validated sensor location extracted from a topic

use std::fmt;
use std::str::FromStr;

use super::{NAMESPACE, SECTION_COUNT, SchemaError};

/// Sensor location parsed from `airq/<city>/<building>/<room>`.
///
/// Sections are kept verbatim: no case folding or trimming is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
	city: String,
	building: String,
	room: String,
}

impl Location {
	/// Validates `topic` against the routing key schema.
	///
	/// Checks are applied in order: section count, namespace, then emptiness
	/// of city, building and room.
	pub fn parse(topic: &str) -> Result<Self, SchemaError> {
		let sections: Vec<&str> = topic.split('/').collect();
		if sections.len() != SECTION_COUNT {
			return Err(SchemaError::section_count(topic, sections.len()));
		}

		if sections[0] != NAMESPACE {
			return Err(SchemaError::namespace(topic));
		}

		if let Some(position) = sections[1 ..]
			.iter()
			.position(|section| section.is_empty())
		{
			return Err(SchemaError::empty_section(topic, position + 1));
		}

		Ok(Self {
			city: sections[1].to_owned(),
			building: sections[2].to_owned(),
			room: sections[3].to_owned(),
		})
	}

	/// City section of the topic.
	pub fn city(&self) -> &str {
		&self.city
	}

	/// Building section of the topic.
	pub fn building(&self) -> &str {
		&self.building
	}

	/// Room section of the topic.
	pub fn room(&self) -> &str {
		&self.room
	}

	/// Destination channel: `<prefix>:<city>:<building>:<room>`.
	pub fn channel_name(&self, prefix: &str) -> String {
		format!("{prefix}:{}:{}:{}", self.city, self.building, self.room)
	}
}

impl FromStr for Location {
	type Err = SchemaError;

	fn from_str(topic: &str) -> Result<Self, Self::Err> {
		Self::parse(topic)
	}
}

impl fmt::Display for Location {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{NAMESPACE}/{}/{}/{}", self.city, self.building, self.room)
	}
}
