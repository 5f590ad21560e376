use moq_wire::coding::DecodeError;

/// An error decoding an object payload.
///
/// These are always scoped to a single object; the stream carrying it is
/// discarded and the session continues.
#[derive(thiserror::Error, Debug, Clone)]
pub enum PackError {
	#[error("truncated envelope")]
	Truncated,

	#[error("unknown media type: {0}")]
	UnknownMediaType(String),

	#[error("unknown chunk type: {0}")]
	UnknownChunkType(String),

	#[error("decode error: {0}")]
	Decode(DecodeError),
}

impl From<DecodeError> for PackError {
	fn from(err: DecodeError) -> Self {
		match err {
			DecodeError::Short => Self::Truncated,
			err => Self::Decode(err),
		}
	}
}
