use crate::Parameters;
use crate::coding::{Decode, DecodeError, Encode};

/// The wire version advertised during SETUP.
pub const VERSION: u64 = 0xff000001;

/// A control message, sent on the control stream as a tag followed by its fields.
pub trait Message: Sized {
	const TAG: u64;

	fn decode_msg<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError>;
	fn encode_msg<W: bytes::BufMut>(&self, w: &mut W);
}

// Every message encodes as its tag followed by its body, and decodes by
// insisting on its own tag. Use [ControlMessage] to decode an arbitrary one.
macro_rules! message_codec {
	($($name:ident),* $(,)?) => {
		$(
			impl Encode for $name {
				fn encode<W: bytes::BufMut>(&self, w: &mut W) {
					Self::TAG.encode(w);
					self.encode_msg(w);
				}
			}

			impl Decode for $name {
				fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
					let tag = u64::decode(r)?;
					if tag != Self::TAG {
						return Err(DecodeError::InvalidMessage(tag));
					}

					Self::decode_msg(r)
				}
			}
		)*
	};
}

message_codec!(Subscribe, SubscribeOk, SubscribeError, Announce, AnnounceOk, Setup, SetupOk);

/// Sent by the subscriber to request all future objects for the given track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subscribe {
	pub track_namespace: String,
	pub track_name: String,
	pub params: Parameters,
}

impl Message for Subscribe {
	const TAG: u64 = 0x01;

	fn decode_msg<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(Self {
			track_namespace: String::decode(r)?,
			track_name: String::decode(r)?,
			params: Parameters::decode(r)?,
		})
	}

	fn encode_msg<W: bytes::BufMut>(&self, w: &mut W) {
		self.track_namespace.encode(w);
		self.track_name.encode(w);
		self.params.encode(w);
	}
}

/// Sent by the publisher to accept a subscription, echoing the track and
/// assigning the numeric ID used by object headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribeOk {
	pub track_namespace: String,
	pub track_name: String,
	pub track_id: u64,
	pub expires: u64,
}

impl Message for SubscribeOk {
	const TAG: u64 = 0x02;

	fn decode_msg<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(Self {
			track_namespace: String::decode(r)?,
			track_name: String::decode(r)?,
			track_id: u64::decode(r)?,
			expires: u64::decode(r)?,
		})
	}

	fn encode_msg<W: bytes::BufMut>(&self, w: &mut W) {
		self.track_namespace.encode(w);
		self.track_name.encode(w);
		self.track_id.encode(w);
		self.expires.encode(w);
	}
}

/// Sent by the publisher to reject a subscription.
///
/// Decoded for completeness; this implementation never emits it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribeError {
	pub track_namespace: String,
	pub track_name: String,
	pub error_code: u64,
	pub reason: String,
}

impl Message for SubscribeError {
	const TAG: u64 = 0x03;

	fn decode_msg<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(Self {
			track_namespace: String::decode(r)?,
			track_name: String::decode(r)?,
			error_code: u64::decode(r)?,
			reason: String::decode(r)?,
		})
	}

	fn encode_msg<W: bytes::BufMut>(&self, w: &mut W) {
		self.track_namespace.encode(w);
		self.track_name.encode(w);
		self.error_code.encode(w);
		self.reason.encode(w);
	}
}

/// Sent by the publisher to announce the availability of a namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Announce {
	pub track_namespace: String,
	pub params: Parameters,
}

impl Message for Announce {
	const TAG: u64 = 0x06;

	fn decode_msg<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(Self {
			track_namespace: String::decode(r)?,
			params: Parameters::decode(r)?,
		})
	}

	fn encode_msg<W: bytes::BufMut>(&self, w: &mut W) {
		self.track_namespace.encode(w);
		self.params.encode(w);
	}
}

/// Acknowledges an [Announce], echoing the namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnounceOk {
	pub track_namespace: String,
}

impl Message for AnnounceOk {
	const TAG: u64 = 0x07;

	fn decode_msg<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(Self {
			track_namespace: String::decode(r)?,
		})
	}

	fn encode_msg<W: bytes::BufMut>(&self, w: &mut W) {
		self.track_namespace.encode(w);
	}
}

/// The first message on the control stream, advertising the version and role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Setup {
	pub version: u64,
	pub params: Parameters,
}

impl Message for Setup {
	const TAG: u64 = 0x40;

	fn decode_msg<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(Self {
			version: u64::decode(r)?,
			params: Parameters::decode(r)?,
		})
	}

	fn encode_msg<W: bytes::BufMut>(&self, w: &mut W) {
		self.version.encode(w);
		self.params.encode(w);
	}
}

/// The reply to [Setup], confirming the version and the peer's role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetupOk {
	pub version: u64,
	pub params: Parameters,
}

impl Message for SetupOk {
	const TAG: u64 = 0x41;

	fn decode_msg<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		Ok(Self {
			version: u64::decode(r)?,
			params: Parameters::decode(r)?,
		})
	}

	fn encode_msg<W: bytes::BufMut>(&self, w: &mut W) {
		self.version.encode(w);
		self.params.encode(w);
	}
}

/// Any control message, decoded by dispatching on the tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlMessage {
	Subscribe(Subscribe),
	SubscribeOk(SubscribeOk),
	SubscribeError(SubscribeError),
	Announce(Announce),
	AnnounceOk(AnnounceOk),
	Setup(Setup),
	SetupOk(SetupOk),
}

impl Decode for ControlMessage {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let tag = u64::decode(r)?;
		Ok(match tag {
			Subscribe::TAG => Self::Subscribe(Subscribe::decode_msg(r)?),
			SubscribeOk::TAG => Self::SubscribeOk(SubscribeOk::decode_msg(r)?),
			SubscribeError::TAG => Self::SubscribeError(SubscribeError::decode_msg(r)?),
			Announce::TAG => Self::Announce(Announce::decode_msg(r)?),
			AnnounceOk::TAG => Self::AnnounceOk(AnnounceOk::decode_msg(r)?),
			Setup::TAG => Self::Setup(Setup::decode_msg(r)?),
			SetupOk::TAG => Self::SetupOk(SetupOk::decode_msg(r)?),
			_ => return Err(DecodeError::InvalidMessage(tag)),
		})
	}
}

impl Encode for ControlMessage {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		match self {
			Self::Subscribe(msg) => msg.encode(w),
			Self::SubscribeOk(msg) => msg.encode(w),
			Self::SubscribeError(msg) => msg.encode(w),
			Self::Announce(msg) => msg.encode(w),
			Self::AnnounceOk(msg) => msg.encode(w),
			Self::Setup(msg) => msg.encode(w),
			Self::SetupOk(msg) => msg.encode(w),
		}
	}
}
