use moq_wire::Role;

use crate::TrackKind;

/// A malformed init message; reported to the host, init is aborted.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ConfigError {
	#[error("no tracks configured")]
	NoTracks,

	#[error("missing urlHostPort")]
	MissingUrl,

	#[error("track {0} is missing {1}")]
	MissingField(TrackKind, &'static str),
}

/// The SETUP/ANNOUNCE/SUBSCRIBE exchange failed; the session is closed.
#[derive(thiserror::Error, Debug, Clone)]
pub enum HandshakeError {
	#[error("peer selected an unsupported version: {0:#x}")]
	VersionMismatch(u64),

	#[error("peer did not advertise a role")]
	MissingRole,

	#[error("peer role is incompatible: {0:?}")]
	UnsupportedRole(Role),

	#[error("namespace mismatch in reply: expected {expected}, got {actual}")]
	NamespaceMismatch { expected: String, actual: String },

	#[error("track mismatch in reply: expected {expected}, got {actual}")]
	TrackMismatch { expected: String, actual: String },

	#[error("subscribe refused ({code}): {reason}")]
	SubscribeRefused { code: u64, reason: String },

	#[error("unexpected message: {0}")]
	UnexpectedMessage(String),

	#[error("timed out")]
	Timeout,
}

/// A fatal engine error; soft per-chunk drops are reported as events instead.
#[derive(thiserror::Error, Debug, Clone)]
pub enum EngineError {
	#[error("config error: {0}")]
	Config(#[from] ConfigError),

	#[error("handshake error: {0}")]
	Handshake(#[from] HandshakeError),

	#[error(transparent)]
	Wire(#[from] moq_wire::Error),
}
