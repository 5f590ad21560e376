use bytes::Bytes;
use derive_more::Debug;

use moq_wire::coding::{Decode, Encode};

use crate::PackError;

/// The kind of media carried by a LOC envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
	Audio,
	Video,
}

impl MediaKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Audio => "audio",
			Self::Video => "video",
		}
	}

	fn parse(s: &str) -> Result<Self, PackError> {
		match s {
			"audio" => Ok(Self::Audio),
			"video" => Ok(Self::Video),
			other => Err(PackError::UnknownMediaType(other.to_string())),
		}
	}
}

/// Whether a chunk can be decoded on its own or depends on the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
	Key,
	Delta,
}

impl ChunkKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Key => "key",
			Self::Delta => "delta",
		}
	}

	fn parse(s: &str) -> Result<Self, PackError> {
		match s {
			"key" => Ok(Self::Key),
			"delta" => Ok(Self::Delta),
			other => Err(PackError::UnknownChunkType(other.to_string())),
		}
	}
}

/// A media chunk envelope: timing and keyframe metadata plus the encoded payload.
///
/// Fields are encoded in declaration order. Strings are length-prefixed,
/// signed integers are zigzag varints, and buffers are length-prefixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocPacket {
	pub media: MediaKind,

	/// The presentation timestamp in microseconds.
	pub timestamp: i64,

	/// The chunk duration in microseconds.
	pub duration: u32,

	pub chunk: ChunkKind,

	/// The encoder sequence number; -1 means unknown.
	pub seq_id: i64,

	/// Wall-clock capture time of the first frame, in milliseconds.
	pub first_frame_clkms: i64,

	/// Codec-specific metadata, possibly empty.
	#[debug("{} bytes", metadata.len())]
	pub metadata: Bytes,

	/// The encoded media payload.
	#[debug("{} bytes", data.len())]
	pub data: Bytes,
}

impl LocPacket {
	pub fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.media.as_str().encode(w);
		self.timestamp.encode(w);
		self.duration.encode(w);
		self.chunk.as_str().encode(w);
		self.seq_id.encode(w);
		self.first_frame_clkms.encode(w);
		self.metadata.encode(w);
		self.data.encode(w);
	}

	pub fn encode_bytes(&self) -> Bytes {
		let mut buf = bytes::BytesMut::new();
		self.encode(&mut buf);
		buf.freeze()
	}

	pub fn decode<B: bytes::Buf>(r: &mut B) -> Result<Self, PackError> {
		let media = MediaKind::parse(&String::decode(r)?)?;
		let timestamp = i64::decode(r)?;
		let duration = u32::decode(r)?;
		let chunk = ChunkKind::parse(&String::decode(r)?)?;

		Ok(Self {
			media,
			timestamp,
			duration,
			chunk,
			seq_id: i64::decode(r)?,
			first_frame_clkms: i64::decode(r)?,
			metadata: Bytes::decode(r)?,
			data: Bytes::decode(r)?,
		})
	}
}
