use bytes::Bytes;
use derive_more::Debug;

use moq_wire::coding::{Decode, Encode};

use crate::PackError;

/// The media type string identifying a RAW envelope on the wire.
const MEDIA_TYPE: &str = "data";

/// An opaque data envelope: the minimal metadata needed to demultiplex it.
///
/// Same primitive grammar as [crate::LocPacket], but the chunk type is an
/// uninterpreted string and there is no timing information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
	pub chunk_type: String,

	pub seq_id: i64,

	#[debug("{} bytes", data.len())]
	pub data: Bytes,
}

impl RawPacket {
	pub fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		MEDIA_TYPE.encode(w);
		self.chunk_type.encode(w);
		self.seq_id.encode(w);
		self.data.encode(w);
	}

	pub fn encode_bytes(&self) -> Bytes {
		let mut buf = bytes::BytesMut::new();
		self.encode(&mut buf);
		buf.freeze()
	}

	pub fn decode<B: bytes::Buf>(r: &mut B) -> Result<Self, PackError> {
		let media_type = String::decode(r)?;
		if media_type != MEDIA_TYPE {
			return Err(PackError::UnknownMediaType(media_type));
		}

		Ok(Self {
			chunk_type: String::decode(r)?,
			seq_id: i64::decode(r)?,
			data: Bytes::decode(r)?,
		})
	}
}

#[cfg(test)]
mod tests {
	use bytes::Buf;

	use super::*;

	#[test]
	fn roundtrip() {
		let packet = RawPacket {
			chunk_type: "key".into(),
			seq_id: 7,
			data: Bytes::from_static(b"hello"),
		};

		let mut buf = packet.encode_bytes();
		assert_eq!(RawPacket::decode(&mut buf).unwrap(), packet);
		assert!(!buf.has_remaining());
	}

	#[test]
	fn rejects_media_envelope() {
		let mut buf = bytes::BytesMut::new();
		"audio".encode(&mut buf);

		match RawPacket::decode(&mut buf.freeze()) {
			Err(PackError::UnknownMediaType(s)) => assert_eq!(s, "audio"),
			other => panic!("expected unknown media type: {:?}", other),
		}
	}

	#[test]
	fn truncated() {
		let packet = RawPacket {
			chunk_type: "key".into(),
			seq_id: -3,
			data: Bytes::from_static(&[1, 2, 3, 4]),
		};

		let buf = packet.encode_bytes();
		for len in 0..buf.len() {
			let mut short = buf.slice(0..len);
			assert!(matches!(RawPacket::decode(&mut short), Err(PackError::Truncated)));
		}
	}
}
