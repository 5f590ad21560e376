use std::{fmt::Debug, sync::Arc};

use crate::{transport, Error, coding::*};

/// A wrapper around a [transport::SendStream] that will reset on Drop.
pub struct Writer<S: transport::SendStream> {
	stream: Option<S>,
	buffer: bytes::BytesMut,
}

impl<S: transport::SendStream> Writer<S> {
	pub fn new(stream: S) -> Self {
		Self {
			stream: Some(stream),
			buffer: Default::default(),
		}
	}

	/// Encode the given message to the stream.
	pub async fn encode<T: Encode + Debug>(&mut self, msg: &T) -> Result<(), Error> {
		self.buffer.clear();
		msg.encode(&mut self.buffer);

		while !self.buffer.is_empty() {
			self.stream
				.as_mut()
				.unwrap()
				.write_buf(&mut self.buffer)
				.await
				.map_err(|e| Error::Transport(Arc::new(e)))?;
		}

		Ok(())
	}

	/// Write the entire [bytes::Buf] to the stream.
	///
	/// NOTE: This can avoid performing a copy when using [bytes::Bytes].
	pub async fn write_all<B: bytes::Buf + Send>(&mut self, buf: &mut B) -> Result<(), Error> {
		while buf.has_remaining() {
			self.stream
				.as_mut()
				.unwrap()
				.write_buf(buf)
				.await
				.map_err(|e| Error::Transport(Arc::new(e)))?;
		}

		Ok(())
	}

	/// Mark the stream as finished.
	pub fn finish(&mut self) -> Result<(), Error> {
		self.stream
			.as_mut()
			.unwrap()
			.finish()
			.map_err(|e| Error::Transport(Arc::new(e)))
	}

	/// Wait for the stream to be closed, or the [Self::finish] to be acknowledged by the peer.
	pub async fn closed(&mut self) -> Result<(), Error> {
		self.stream
			.as_mut()
			.unwrap()
			.closed()
			.await
			.map_err(|e| Error::Transport(Arc::new(e)))?;
		Ok(())
	}

	/// Abort the stream with the given error.
	pub fn abort(&mut self, err: &Error) {
		self.stream.as_mut().unwrap().reset(err.to_code());
	}
}

impl<S: transport::SendStream> Drop for Writer<S> {
	fn drop(&mut self) {
		if let Some(mut stream) = self.stream.take() {
			// Unlike the Quinn default, we abort the stream on drop.
			stream.reset(Error::Cancel.to_code());
		}
	}
}
