//! A minimal WebTransport-shaped session abstraction.
//!
//! The endpoint engines are generic over these traits so the host decides how
//! the QUIC session is established (and how the server certificate is
//! verified). The only addition over a stock WebTransport surface is the
//! `send_order` hint on [Session::open_uni]: higher values are scheduled
//! first by the transport.

use std::future::Future;

use bytes::{Buf, BytesMut};

/// An established transport session.
pub trait Session: Clone + Send + Sync + 'static {
	type SendStream: SendStream;
	type RecvStream: RecvStream;
	type Error: std::error::Error + Send + Sync + 'static;

	/// Open a bidirectional stream, used for control messages.
	fn open_bi(&self) -> impl Future<Output = Result<(Self::SendStream, Self::RecvStream), Self::Error>> + Send;

	/// Open a unidirectional stream with the given send order; higher wins.
	fn open_uni(&self, send_order: u64) -> impl Future<Output = Result<Self::SendStream, Self::Error>> + Send;

	/// Accept the next incoming unidirectional stream.
	fn accept_uni(&self) -> impl Future<Output = Result<Self::RecvStream, Self::Error>> + Send;

	/// Close the session, aborting all streams.
	fn close(&self, code: u32, reason: &str);

	/// Block until the session is closed.
	fn closed(&self) -> impl Future<Output = Self::Error> + Send;
}

/// The write half of a stream.
pub trait SendStream: Send + 'static {
	type Error: std::error::Error + Send + Sync + 'static;

	/// Write some data from the buffer, returning the number of bytes written.
	fn write_buf<B: Buf + Send>(&mut self, buf: &mut B) -> impl Future<Output = Result<usize, Self::Error>> + Send;

	/// Mark the stream as finished; no further writes are allowed.
	fn finish(&mut self) -> Result<(), Self::Error>;

	/// Abort the stream with the given error code.
	fn reset(&mut self, code: u32);

	/// Wait until the peer has acknowledged the entire stream.
	fn closed(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// The read half of a stream.
pub trait RecvStream: Send + 'static {
	type Error: std::error::Error + Send + Sync + 'static;

	/// Read more data into the buffer, returning None at the end of the stream.
	fn read_buf(&mut self, buf: &mut BytesMut) -> impl Future<Output = Result<Option<usize>, Self::Error>> + Send;

	/// Tell the peer to stop sending, discarding any buffered data.
	fn stop(&mut self, code: u32);
}
