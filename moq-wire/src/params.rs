use std::collections::{HashMap, hash_map};

use num_enum::{FromPrimitive, IntoPrimitive};

use crate::Role;
use crate::coding::*;

const MAX_PARAMS: u64 = 64;

/// Known parameter keys; unknown keys are carried through untouched.
#[derive(Debug, Copy, Clone, FromPrimitive, IntoPrimitive, Eq, Hash, PartialEq)]
#[repr(u64)]
pub enum ParameterKey {
	Role = 0x00,
	AuthInfo = 0x02,
	#[num_enum(catch_all)]
	Unknown(u64),
}

/// A count-prefixed list of `(key: varint, value: length-prefixed bytes)` pairs.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
	entries: HashMap<ParameterKey, Vec<u8>>,
}

impl Decode for Parameters {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let count = u64::decode(r)?;
		if count > MAX_PARAMS {
			return Err(DecodeError::TooMany);
		}

		let mut entries = HashMap::new();
		for _ in 0..count {
			let key = ParameterKey::from(u64::decode(r)?);
			match entries.entry(key) {
				hash_map::Entry::Occupied(_) => return Err(DecodeError::Duplicate),
				hash_map::Entry::Vacant(entry) => entry.insert(Vec::<u8>::decode(r)?),
			};
		}

		Ok(Self { entries })
	}
}

impl Encode for Parameters {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		self.entries.len().encode(w);

		for (key, value) in self.entries.iter() {
			u64::from(*key).encode(w);
			value.encode(w);
		}
	}
}

impl Parameters {
	pub fn get(&self, key: ParameterKey) -> Option<&[u8]> {
		self.entries.get(&key).map(|v| v.as_slice())
	}

	pub fn set(&mut self, key: ParameterKey, value: Vec<u8>) {
		self.entries.insert(key, value);
	}

	/// The ROLE parameter, if present and recognized.
	pub fn role(&self) -> Option<Role> {
		let value = self.get(ParameterKey::Role)?;
		match value {
			[role] => Role::try_from(*role).ok(),
			_ => None,
		}
	}

	pub fn set_role(&mut self, role: Role) {
		self.set(ParameterKey::Role, vec![role.into()]);
	}

	/// The AUTH_INFO parameter, if present and valid UTF-8.
	pub fn auth_info(&self) -> Option<&str> {
		std::str::from_utf8(self.get(ParameterKey::AuthInfo)?).ok()
	}

	pub fn set_auth_info(&mut self, auth: &str) {
		self.set(ParameterKey::AuthInfo, auth.as_bytes().to_vec());
	}
}
