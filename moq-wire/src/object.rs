use crate::coding::{Decode, DecodeError, Encode};

/// The header written at the start of every unidirectional object stream.
///
/// The payload is the remainder of the stream; the stream FIN frames it, so
/// there is no trailing length or delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
	pub track_id: u64,
	pub group_seq: u64,
	pub object_seq: u64,

	/// The priority this object was scheduled with; higher wins.
	///
	/// Encoded as a varint, so "send now" (`u64::MAX`) saturates on the wire.
	pub send_order: u64,
}

impl Encode for ObjectHeader {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.track_id.encode(w);
		self.group_seq.encode(w);
		self.object_seq.encode(w);
		self.send_order.encode(w);
	}
}

impl Decode for ObjectHeader {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(Self {
			track_id: u64::decode(r)?,
			group_seq: u64::decode(r)?,
			object_seq: u64::decode(r)?,
			send_order: u64::decode(r)?,
		})
	}
}
