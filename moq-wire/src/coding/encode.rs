use bytes::{Bytes, BytesMut};

/// The largest value representable as a QUIC variable-length integer.
pub const VARINT_MAX: u64 = (1 << 62) - 1;

/// Write the value to the buffer.
pub trait Encode: Sized {
	/// Encode the value to the given writer.
	///
	/// This will panic if the [bytes::BufMut] does not have enough capacity.
	fn encode<W: bytes::BufMut>(&self, w: &mut W);

	/// Encode the value into a [Bytes] buffer.
	///
	/// NOTE: This will allocate.
	fn encode_bytes(&self) -> Bytes {
		let mut buf = BytesMut::new();
		self.encode(&mut buf);
		buf.freeze()
	}
}

impl Encode for u8 {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		w.put_u8(*self);
	}
}

impl Encode for u64 {
	/// Encode as a QUIC varint, always choosing the shortest legal width.
	///
	/// Values above [VARINT_MAX] saturate; the only producer of such values is
	/// the "send now" priority, for which saturation is the correct outcome.
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		let v = (*self).min(VARINT_MAX);

		if v < (1 << 6) {
			w.put_u8(v as u8);
		} else if v < (1 << 14) {
			w.put_u16(v as u16 | (0b01 << 14));
		} else if v < (1 << 30) {
			w.put_u32(v as u32 | (0b10 << 30));
		} else {
			w.put_u64(v | (0b11 << 62));
		}
	}
}

impl Encode for u32 {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		(*self as u64).encode(w);
	}
}

impl Encode for usize {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		(*self as u64).encode(w);
	}
}

impl Encode for i64 {
	/// Signed integers are zigzag mapped onto varints so small magnitudes stay small.
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		((self.wrapping_shl(1) ^ (self >> 63)) as u64).encode(w);
	}
}

impl Encode for String {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.as_str().encode(w)
	}
}

impl Encode for &str {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.len().encode(w);
		w.put(self.as_bytes());
	}
}

impl Encode for Vec<u8> {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.len().encode(w);
		w.put_slice(self);
	}
}

impl Encode for bytes::Bytes {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.len().encode(w);
		w.put_slice(self);
	}
}
