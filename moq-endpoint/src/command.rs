use bytes::Bytes;
use derive_more::Debug;

use loc::ChunkKind;

use crate::{PublisherConfig, SubscriberConfig, TrackKind};

/// A host → engine message.
#[derive(Debug, Clone)]
pub enum Command {
	/// Initialize as a publisher and connect; only legal before any other init.
	InitPublisher(PublisherConfig),

	/// Initialize as a subscriber and connect.
	InitSubscriber(SubscriberConfig),

	/// An encoded chunk to publish on the given track.
	Chunk { track: TrackKind, chunk: IngestChunk },

	/// Graceful shutdown: settle in-flight objects, then close the transport.
	Stop,
}

/// One encoded chunk handed to the publisher.
#[derive(Debug, Clone)]
pub struct IngestChunk {
	/// Caller-supplied ID, unique per chunk, identifying the in-flight write.
	pub p_id: u64,

	pub kind: ChunkKind,

	/// The encoder sequence number; negative means "send immediately".
	pub seq_id: i64,

	/// The encoder timestamp in microseconds.
	pub timestamp: i64,

	/// The clock-compensated timestamp carried on the wire, in microseconds.
	pub compensated_ts: i64,

	/// The chunk duration in microseconds.
	pub duration: u32,

	/// Overrides `duration` on the wire when set.
	pub estimated_duration: Option<u32>,

	/// Wall-clock capture time of the first frame, in milliseconds.
	pub first_frame_clkms: i64,

	#[debug("{} bytes", metadata.len())]
	pub metadata: Bytes,

	#[debug("{} bytes", payload.len())]
	pub payload: Bytes,
}

impl IngestChunk {
	/// The duration carried in the LOC envelope.
	pub fn wire_duration(&self) -> u32 {
		self.estimated_duration.unwrap_or(self.duration)
	}
}
