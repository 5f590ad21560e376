//! # loc: media envelopes for MoQ objects
//!
//! Two object payload formats sit on top of the `moq-wire` primitives:
//!
//! - [LocPacket]: a media chunk with timing, keyframe, and capture-clock
//!   metadata, used for audio and video tracks.
//! - [RawPacket]: an opaque blob with minimal metadata, used for data tracks.
//!
//! Both are plain length-prefixed encodings that round-trip over a byte
//! stream; the surrounding object stream provides the outer framing.

mod data;
mod error;
mod media;

pub use data::*;
pub use error::*;
pub use media::*;
