use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// The kind of a configured track; doubles as its key in the track map.
///
/// `Data` tracks carry RAW envelopes; the others carry LOC envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
	Audio,
	Video,
	Data,
}

impl TrackKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Audio => "audio",
			Self::Video => "video",
			Self::Data => "data",
		}
	}

	/// The LOC media kind, or None for raw data tracks.
	pub fn media(self) -> Option<loc::MediaKind> {
		match self {
			Self::Audio => Some(loc::MediaKind::Audio),
			Self::Video => Some(loc::MediaKind::Video),
			Self::Data => None,
		}
	}
}

impl fmt::Display for TrackKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One configured track.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
	/// The numeric ID used in object headers.
	///
	/// Assigned by the publisher; the subscriber adopts whatever the
	/// subscribe response echoes back.
	#[serde(default)]
	pub id: u64,

	pub namespace: String,
	pub name: String,
	pub auth_info: String,

	/// High-priority tracks outrank low-priority ones at the transport
	/// scheduler; typically audio is high and video is low.
	#[serde(default)]
	pub is_hipri: bool,

	/// Publisher only: the bound on concurrently open object streams.
	#[serde(default = "default_max_in_flight", rename = "maxInFlightRequests")]
	pub max_in_flight: u32,
}

fn default_max_in_flight() -> u32 {
	100
}

/// Publisher initialization, from the host's init message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublisherConfig {
	pub url_host_port: String,

	#[serde(default)]
	pub is_sending_stats: bool,

	#[serde(rename = "moqTracks")]
	pub tracks: BTreeMap<TrackKind, Track>,
}

impl PublisherConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		validate(&self.url_host_port, &self.tracks)
	}
}

/// Subscriber initialization, from the host's init message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberConfig {
	pub url_host_port: String,

	#[serde(default)]
	pub url_path: String,

	#[serde(default)]
	pub is_sending_stats: bool,

	#[serde(rename = "moqTracks")]
	pub tracks: BTreeMap<TrackKind, Track>,
}

impl SubscriberConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		validate(&self.url_host_port, &self.tracks)
	}
}

fn validate(url_host_port: &str, tracks: &BTreeMap<TrackKind, Track>) -> Result<(), ConfigError> {
	if url_host_port.is_empty() {
		return Err(ConfigError::MissingUrl);
	}

	if tracks.is_empty() {
		return Err(ConfigError::NoTracks);
	}

	for (kind, track) in tracks {
		if track.namespace.is_empty() {
			return Err(ConfigError::MissingField(*kind, "namespace"));
		}
		if track.name.is_empty() {
			return Err(ConfigError::MissingField(*kind, "name"));
		}
		if track.auth_info.is_empty() {
			return Err(ConfigError::MissingField(*kind, "authInfo"));
		}
	}

	Ok(())
}
