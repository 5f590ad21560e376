use std::sync::Arc;

use crate::coding::DecodeError;

/// An error that can be shared across tasks.
pub trait SendSyncError: std::error::Error + Send + Sync {}
impl<T: std::error::Error + Send + Sync> SendSyncError for T {}

/// A fatal error on a stream or session.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
	#[error("decode error: {0}")]
	Decode(#[from] DecodeError),

	#[error("transport error: {0}")]
	Transport(Arc<dyn SendSyncError>),

	#[error("cancelled")]
	Cancel,
}

impl Error {
	/// The error code used when closing or resetting a stream/session.
	pub fn to_code(&self) -> u32 {
		match self {
			Self::Cancel => 0,
			Self::Decode(_) => 1,
			Self::Transport(_) => 2,
		}
	}
}
