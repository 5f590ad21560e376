use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use derive_more::Debug;

use loc::ChunkKind;

use crate::TrackKind;

/// An engine → host message.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
	Info(String),
	Debug(String),
	Warning(String),
	Error(String),

	/// A chunk was not sent.
	Dropped {
		track: TrackKind,
		p_id: u64,
		reason: DropReason,
	},

	/// An incoming object stream was discarded; the session continues.
	DroppedStream { reason: String },

	/// Publisher stats, emitted per accepted chunk when enabled.
	SendStats {
		clkms: i64,
		in_flight: BTreeMap<TrackKind, usize>,
	},

	/// Subscriber stats, emitted per received object when enabled.
	DownloadStats { clkms: i64, objects: u64 },

	/// A decoded chunk from the audio track.
	Audio(EncodedChunk),

	/// A decoded chunk from the video track.
	Video(EncodedChunk),

	/// An opaque payload from the data track.
	Data { seq_id: i64, payload: Bytes },
}

/// Why a chunk was dropped instead of sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
	TransportNotOpen,
	NoSubscribers,
	TooManyInFlight,
	FirstObjectNotKey,
	WriteFailed,
}

impl DropReason {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::TransportNotOpen => "transport not open",
			Self::NoSubscribers => "no subscribers",
			Self::TooManyInFlight => "too many inflight",
			Self::FirstObjectNotKey => "first object must be key",
			Self::WriteFailed => "write failed",
		}
	}
}

impl fmt::Display for DropReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A chunk ready for a downstream decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedChunk {
	pub kind: ChunkKind,

	/// The presentation timestamp in microseconds.
	pub timestamp: i64,

	/// The chunk duration in microseconds.
	pub duration: u32,

	pub seq_id: i64,

	/// Wall-clock capture time of the first frame, in milliseconds.
	pub capture_clkms: i64,

	#[debug("{} bytes", metadata.len())]
	pub metadata: Bytes,

	#[debug("{} bytes", payload.len())]
	pub payload: Bytes,
}

/// The wall clock in milliseconds, as carried in stats events.
pub(crate) fn now_ms() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_millis() as i64
}
