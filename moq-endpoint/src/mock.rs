//! An in-memory transport for tests: control bytes are scripted by the test,
//! opened object streams are recorded with their send order, and object
//! streams can be held open forever to pin the in-flight window.

use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::sync::{Mutex as AsyncMutex, mpsc};

use moq_wire::coding::{Decode, Encode};
use moq_wire::{ControlMessage, ObjectHeader, transport};

#[derive(thiserror::Error, Debug, Clone)]
pub enum MockError {
	#[error("session closed")]
	Closed,
}

/// Everything written to one stream, shared with the test.
#[derive(Default)]
pub struct StreamRecord {
	pub send_order: Option<u64>,
	pub data: BytesMut,
	pub finished: bool,
}

pub struct MockSendStream {
	record: Arc<Mutex<StreamRecord>>,
	/// When set, `closed()` never resolves, keeping the object in flight.
	hold_open: bool,
}

impl transport::SendStream for MockSendStream {
	type Error = MockError;

	async fn write_buf<B: Buf + Send>(&mut self, buf: &mut B) -> Result<usize, MockError> {
		let n = buf.remaining();
		self.record.lock().unwrap().data.put(&mut *buf);
		Ok(n)
	}

	fn finish(&mut self) -> Result<(), MockError> {
		self.record.lock().unwrap().finished = true;
		Ok(())
	}

	fn reset(&mut self, _code: u32) {}

	async fn closed(&mut self) -> Result<(), MockError> {
		if self.hold_open {
			std::future::pending::<()>().await;
		}
		Ok(())
	}
}

pub struct MockRecvStream {
	rx: mpsc::UnboundedReceiver<Bytes>,
}

impl MockRecvStream {
	/// A stream that yields the given bytes and then ends.
	pub fn of(data: Bytes) -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		if !data.is_empty() {
			tx.send(data).unwrap();
		}
		Self { rx }
	}
}

impl transport::RecvStream for MockRecvStream {
	type Error = MockError;

	async fn read_buf(&mut self, buf: &mut BytesMut) -> Result<Option<usize>, MockError> {
		match self.rx.recv().await {
			Some(data) => {
				buf.extend_from_slice(&data);
				Ok(Some(data.len()))
			}
			None => Ok(None),
		}
	}

	fn stop(&mut self, _code: u32) {}
}

struct MockInner {
	control_recv: Mutex<Option<MockRecvStream>>,
	control_send: Arc<Mutex<StreamRecord>>,
	uni: Mutex<Vec<Arc<Mutex<StreamRecord>>>>,
	incoming: AsyncMutex<mpsc::UnboundedReceiver<MockRecvStream>>,
	closes: Mutex<Vec<(u32, String)>>,
	hold_objects: bool,
}

#[derive(Clone)]
pub struct MockSession {
	inner: Arc<MockInner>,
}

impl transport::Session for MockSession {
	type SendStream = MockSendStream;
	type RecvStream = MockRecvStream;
	type Error = MockError;

	async fn open_bi(&self) -> Result<(MockSendStream, MockRecvStream), MockError> {
		let recv = self.inner.control_recv.lock().unwrap().take().ok_or(MockError::Closed)?;
		let send = MockSendStream {
			record: self.inner.control_send.clone(),
			hold_open: false,
		};

		Ok((send, recv))
	}

	async fn open_uni(&self, send_order: u64) -> Result<MockSendStream, MockError> {
		let record = Arc::new(Mutex::new(StreamRecord {
			send_order: Some(send_order),
			..Default::default()
		}));
		self.inner.uni.lock().unwrap().push(record.clone());

		Ok(MockSendStream {
			record,
			hold_open: self.inner.hold_objects,
		})
	}

	async fn accept_uni(&self) -> Result<MockRecvStream, MockError> {
		self.inner.incoming.lock().await.recv().await.ok_or(MockError::Closed)
	}

	fn close(&self, code: u32, reason: &str) {
		self.inner.closes.lock().unwrap().push((code, reason.to_string()));
	}

	async fn closed(&self) -> MockError {
		std::future::pending::<MockError>().await
	}
}

/// The test's side of a [MockSession].
pub struct MockHandle {
	inner: Arc<MockInner>,
	/// Feeds bytes to the engine's control stream reader.
	pub peer: mpsc::UnboundedSender<Bytes>,
	/// Feeds incoming object streams to `accept_uni`.
	pub objects_in: mpsc::UnboundedSender<MockRecvStream>,
}

impl MockHandle {
	/// Script one control message from the peer.
	pub fn send_control<T: Encode + Debug>(&self, msg: &T) {
		self.peer.send(msg.encode_bytes()).unwrap();
	}

	/// Every control message the engine has written so far.
	pub fn sent_control(&self) -> Vec<ControlMessage> {
		let mut data = self.inner.control_send.lock().unwrap().data.clone().freeze();
		let mut out = Vec::new();
		while data.has_remaining() {
			out.push(ControlMessage::decode(&mut data).unwrap());
		}
		out
	}

	/// Snapshots of every opened object stream, in open order.
	pub fn objects(&self) -> Vec<(u64, Bytes, bool)> {
		self.inner
			.uni
			.lock()
			.unwrap()
			.iter()
			.map(|record| {
				let record = record.lock().unwrap();
				(
					record.send_order.unwrap_or_default(),
					record.data.clone().freeze(),
					record.finished,
				)
			})
			.collect()
	}

	pub fn closes(&self) -> Vec<(u32, String)> {
		self.inner.closes.lock().unwrap().clone()
	}

	/// Deliver one object stream carrying the header and payload.
	pub fn push_object(&self, header: &ObjectHeader, payload: &[u8]) {
		let mut buf = BytesMut::new();
		header.encode(&mut buf);
		buf.extend_from_slice(payload);
		self.objects_in.send(MockRecvStream::of(buf.freeze())).unwrap();
	}
}

/// A session/handle pair. With `hold_objects`, object streams never settle
/// until aborted.
pub fn session(hold_objects: bool) -> (MockSession, MockHandle) {
	let (peer, control_rx) = mpsc::unbounded_channel();
	let (objects_in, incoming) = mpsc::unbounded_channel();

	let inner = Arc::new(MockInner {
		control_recv: Mutex::new(Some(MockRecvStream { rx: control_rx })),
		control_send: Default::default(),
		uni: Default::default(),
		incoming: AsyncMutex::new(incoming),
		closes: Default::default(),
		hold_objects,
	});

	(
		MockSession { inner: inner.clone() },
		MockHandle {
			inner,
			peer,
			objects_in,
		},
	)
}
