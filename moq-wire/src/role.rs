use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::coding::{Decode, DecodeError, Encode};

/// The role advertised by an endpoint during SETUP.
#[derive(Debug, Copy, Clone, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Role {
	Publisher = 1,
	Subscriber = 2,
	Both = 3,
}

impl Role {
	/// Whether a peer advertising `peer` can serve an endpoint with this role.
	pub fn accepts(self, peer: Role) -> bool {
		match self {
			Self::Publisher => matches!(peer, Self::Subscriber | Self::Both),
			Self::Subscriber => matches!(peer, Self::Publisher | Self::Both),
			Self::Both => true,
		}
	}
}

impl Encode for Role {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		u8::from(*self).encode(w)
	}
}

impl Decode for Role {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Self::try_from(u8::decode(r)?).map_err(|_| DecodeError::InvalidValue)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn compatibility() {
		assert!(Role::Publisher.accepts(Role::Subscriber));
		assert!(Role::Publisher.accepts(Role::Both));
		assert!(!Role::Publisher.accepts(Role::Publisher));

		assert!(Role::Subscriber.accepts(Role::Publisher));
		assert!(Role::Subscriber.accepts(Role::Both));
		assert!(!Role::Subscriber.accepts(Role::Subscriber));

		assert!(Role::Both.accepts(Role::Publisher));
		assert!(Role::Both.accepts(Role::Subscriber));
	}

	#[test]
	fn rejects_unknown() {
		let mut buf = bytes::Bytes::from_static(&[0x04]);
		assert!(Role::decode(&mut buf).is_err());
	}
}
