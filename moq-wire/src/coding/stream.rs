use std::sync::Arc;

use crate::transport;
use crate::Error;
use crate::coding::{Reader, Writer};

/// A [Writer] and [Reader] pair for a single bidirectional stream.
pub struct Stream<S: transport::Session> {
	pub writer: Writer<S::SendStream>,
	pub reader: Reader<S::RecvStream>,
}

impl<S: transport::Session> Stream<S> {
	/// Open a new bidirectional stream.
	pub async fn open(session: &S) -> Result<Self, Error> {
		let (send, recv) = session.open_bi().await.map_err(|err| Error::Transport(Arc::new(err)))?;

		let writer = Writer::new(send);
		let reader = Reader::new(recv);

		Ok(Stream { writer, reader })
	}
}
