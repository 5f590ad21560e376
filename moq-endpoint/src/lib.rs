//! # moq-endpoint: MoQ publisher and subscriber engines
//!
//! The endpoint logic of a Media over QUIC publisher/subscriber pair. The
//! host drives an [Endpoint] through a pair of channels:
//!
//! - [Command]s in: initialize as a publisher or subscriber, feed encoded
//!   chunks, and stop.
//! - [Event]s out: decoded chunks, drop notifications, stats, and log-level
//!   events.
//!
//! The publisher announces its tracks, accepts subscriptions on the control
//! stream, and writes each chunk as one object on its own unidirectional
//! stream, prioritized by a computed send order. The subscriber subscribes to
//! its configured tracks and demultiplexes incoming object streams back into
//! chunks. Objects are expendable: backpressure drops the newest chunk rather
//! than queueing it, and a failed object stream never tears down the session.
//!
//! The transport is abstracted behind [moq_wire::transport::Session]; the
//! host supplies a [Connector] that establishes (and verifies) the QUIC
//! session.

mod command;
mod config;
mod engine;
mod error;
mod event;
mod publisher;
mod subscriber;

#[cfg(test)]
mod mock;

pub use command::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use event::*;
