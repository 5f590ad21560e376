//! # moq-wire: Media over QUIC wire format
//!
//! The low-level encoding shared by the publisher and subscriber endpoints:
//!
//! - QUIC variable-length integers, length-prefixed strings and byte buffers.
//! - The control messages exchanged on the bidirectional control stream
//!   (SETUP, ANNOUNCE, SUBSCRIBE and their replies).
//! - The [ObjectHeader] that prefixes every object on its own unidirectional
//!   stream.
//! - Buffered [coding::Reader] / [coding::Writer] wrappers over a generic
//!   [transport::Session].
//!
//! Media payloads themselves are opaque at this layer; see the `loc` crate
//! for the envelopes carried inside objects.

mod error;
mod message;
mod object;
mod params;
mod role;

pub mod coding;
pub mod transport;

pub use error::*;
pub use message::*;
pub use object::*;
pub use params::*;
pub use role::*;
