use std::collections::BTreeMap;

use tokio::sync::mpsc;

use loc::{LocPacket, RawPacket};
use moq_wire::coding::{Reader, Stream};
use moq_wire::{ControlMessage, ObjectHeader, Parameters, Role, Setup, SetupOk, Subscribe, VERSION, transport};

use crate::engine::{RunEnd, SETUP_TIMEOUT};
use crate::{Command, EncodedChunk, EngineError, Event, HandshakeError, SubscriberConfig, Track, TrackKind, now_ms};

/// The subscriber engine: subscribes to its configured tracks and
/// demultiplexes incoming object streams into chunk events.
pub(crate) struct Subscriber<S: transport::Session> {
	session: S,
	tracks: BTreeMap<TrackKind, Track>,
	events: mpsc::UnboundedSender<Event>,
	is_sending_stats: bool,
	objects: u64,

	// Held so the control stream stays open; dropping the writer would reset it.
	_control: Stream<S>,
}

impl<S: transport::Session> std::fmt::Debug for Subscriber<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscriber").finish_non_exhaustive()
	}
}

impl<S: transport::Session> Subscriber<S> {
	/// Perform the SETUP exchange and subscribe to every configured track.
	pub async fn connect(
		session: S,
		config: SubscriberConfig,
		events: mpsc::UnboundedSender<Event>,
	) -> Result<Self, EngineError> {
		let mut stream = Stream::open(&session).await?;
		let mut tracks = config.tracks;

		tokio::time::timeout(SETUP_TIMEOUT, Self::handshake(&mut stream, &mut tracks))
			.await
			.map_err(|_| HandshakeError::Timeout)??;

		Ok(Self {
			session,
			tracks,
			events,
			is_sending_stats: config.is_sending_stats,
			objects: 0,
			_control: stream,
		})
	}

	async fn handshake(stream: &mut Stream<S>, tracks: &mut BTreeMap<TrackKind, Track>) -> Result<(), EngineError> {
		let mut params = Parameters::default();
		params.set_role(Role::Subscriber);

		stream.writer.encode(&Setup { version: VERSION, params }).await?;

		let ok: SetupOk = stream.reader.decode().await?;
		if ok.version != VERSION {
			return Err(HandshakeError::VersionMismatch(ok.version).into());
		}

		let peer = ok.params.role().ok_or(HandshakeError::MissingRole)?;
		if !Role::Subscriber.accepts(peer) {
			return Err(HandshakeError::UnsupportedRole(peer).into());
		}
		tracing::debug!(?peer, "setup complete");

		for (kind, track) in tracks.iter_mut() {
			let mut params = Parameters::default();
			params.set_auth_info(&track.auth_info);

			stream
				.writer
				.encode(&Subscribe {
					track_namespace: track.namespace.clone(),
					track_name: track.name.clone(),
					params,
				})
				.await?;

			// The control stream is serialized, so the next reply is ours.
			match stream.reader.decode::<ControlMessage>().await? {
				ControlMessage::SubscribeOk(ok) => {
					if ok.track_namespace != track.namespace || ok.track_name != track.name {
						return Err(HandshakeError::TrackMismatch {
							expected: format!("{}/{}", track.namespace, track.name),
							actual: format!("{}/{}", ok.track_namespace, ok.track_name),
						}
						.into());
					}

					track.id = ok.track_id;
					tracing::debug!(%kind, id = ok.track_id, "subscribed");
				}
				ControlMessage::SubscribeError(err) => {
					return Err(HandshakeError::SubscribeRefused {
						code: err.error_code,
						reason: err.reason,
					}
					.into());
				}
				msg => return Err(HandshakeError::UnexpectedMessage(format!("{msg:?}")).into()),
			}
		}

		Ok(())
	}

	/// Accept object streams until the host stops us or the transport dies.
	pub async fn run(mut self, commands: &mut mpsc::UnboundedReceiver<Command>) -> RunEnd {
		loop {
			tokio::select! {
				cmd = commands.recv() => match cmd {
					Some(Command::Stop) | None => {
						self.session.close(0, "stopped");
						return RunEnd::Stopped;
					}
					Some(cmd) => {
						tracing::warn!(?cmd, "ignoring command while running");
						let _ = self.events.send(Event::Warning("already running".to_string()));
					}
				},
				res = self.session.accept_uni() => match res {
					Ok(stream) => self.recv_object(stream).await,
					Err(err) => {
						tracing::info!(%err, "transport closed");
						let _ = self.events.send(Event::Info(format!("transport closed: {err}")));
						return RunEnd::Closed;
					}
				},
			}
		}
	}

	/// Parse one object stream and emit its chunk.
	///
	/// Any failure discards this stream only; the session continues.
	async fn recv_object(&mut self, stream: S::RecvStream) {
		let started = tokio::time::Instant::now();
		let mut reader = Reader::new(stream);

		let header: ObjectHeader = match reader.decode().await {
			Ok(header) => header,
			Err(err) => {
				tracing::warn!(%err, "dropping object stream: bad header");
				let _ = self.events.send(Event::DroppedStream {
					reason: format!("bad header: {err}"),
				});
				return;
			}
		};

		let Some(kind) = self
			.tracks
			.iter()
			.find(|(_, t)| t.id == header.track_id)
			.map(|(kind, _)| *kind)
		else {
			tracing::warn!(track_id = header.track_id, "dropping object stream: unknown track");
			let _ = self.events.send(Event::DroppedStream {
				reason: format!("unknown track id: {}", header.track_id),
			});
			return;
		};

		let mut payload = match reader.read_remaining().await {
			Ok(payload) => payload,
			Err(err) => {
				let _ = self.events.send(Event::DroppedStream {
					reason: format!("truncated object: {err}"),
				});
				return;
			}
		};

		// Microseconds; data objects have no timing and get a zero budget.
		let duration = match kind.media() {
			None => match RawPacket::decode(&mut payload) {
				Ok(packet) => {
					let _ = self.events.send(Event::Data {
						seq_id: packet.seq_id,
						payload: packet.data,
					});
					0
				}
				Err(err) => {
					let _ = self.events.send(Event::DroppedStream {
						reason: format!("bad data envelope: {err}"),
					});
					return;
				}
			},
			Some(_) => match LocPacket::decode(&mut payload) {
				Ok(packet) => {
					let duration = packet.duration;
					let chunk = EncodedChunk {
						kind: packet.chunk,
						timestamp: packet.timestamp,
						duration: packet.duration,
						seq_id: packet.seq_id,
						capture_clkms: packet.first_frame_clkms,
						metadata: packet.metadata,
						payload: packet.data,
					};

					let event = match kind {
						TrackKind::Audio => Event::Audio(chunk),
						_ => Event::Video(chunk),
					};
					let _ = self.events.send(event);
					duration
				}
				Err(err) => {
					let _ = self.events.send(Event::DroppedStream {
						reason: format!("bad media envelope: {err}"),
					});
					return;
				}
			},
		};

		self.objects += 1;
		if self.is_sending_stats {
			let _ = self.events.send(Event::DownloadStats {
				clkms: now_ms(),
				objects: self.objects,
			});
		}

		// The latency probe: the budget is the duration scaled down to
		// milliseconds, so an object has its own playout time to arrive.
		let elapsed = started.elapsed().as_millis() as u64;
		let budget = (duration / 1000) as u64;
		if elapsed > budget {
			let _ = self.events.send(Event::Warning(format!(
				"object took {elapsed}ms, over its {budget}ms budget"
			)));
		} else {
			let _ = self.events.send(Event::Debug(format!("object took {elapsed}ms")));
		}
	}
}

#[cfg(test)]
mod tests {
	use bytes::Bytes;
	use tokio::sync::mpsc;

	use loc::{ChunkKind, MediaKind};
	use moq_wire::{SetupOk, SubscribeError, SubscribeOk};

	use super::*;
	use crate::mock::{self, MockHandle, MockSession};
	use crate::Command;

	const TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

	fn track(namespace: &str, name: &str) -> Track {
		Track {
			id: 0,
			namespace: namespace.to_string(),
			name: name.to_string(),
			auth_info: "secret".to_string(),
			is_hipri: false,
			max_in_flight: 10,
		}
	}

	fn config(tracks: Vec<(TrackKind, Track)>) -> SubscriberConfig {
		SubscriberConfig {
			url_host_port: "relay.example:4433".to_string(),
			url_path: "/moq".to_string(),
			is_sending_stats: false,
			tracks: tracks.into_iter().collect(),
		}
	}

	fn setup_ok(role: Role) -> SetupOk {
		let mut params = Parameters::default();
		params.set_role(role);
		SetupOk { version: VERSION, params }
	}

	fn subscribe_ok(namespace: &str, name: &str, track_id: u64) -> SubscribeOk {
		SubscribeOk {
			track_namespace: namespace.to_string(),
			track_name: name.to_string(),
			track_id,
			expires: 0,
		}
	}

	fn loc_payload(seq_id: i64) -> Bytes {
		LocPacket {
			media: MediaKind::Audio,
			timestamp: 1000,
			duration: 20_000,
			chunk: ChunkKind::Key,
			seq_id,
			first_frame_clkms: 1_700_000_000_000,
			metadata: Bytes::new(),
			data: Bytes::from_static(&[0xaa]),
		}
		.encode_bytes()
	}

	async fn next_event(events: &mut mpsc::UnboundedReceiver<Event>) -> Event {
		tokio::time::timeout(TIMEOUT, events.recv())
			.await
			.expect("timed out waiting for event")
			.expect("event channel closed")
	}

	/// Connect with audio assigned ID 7 and data assigned ID 9.
	async fn connected() -> (
		Subscriber<MockSession>,
		MockHandle,
		mpsc::UnboundedReceiver<Event>,
	) {
		let (session, handle) = mock::session(false);
		handle.send_control(&setup_ok(Role::Publisher));
		handle.send_control(&subscribe_ok("ns", "audio", 7));
		handle.send_control(&subscribe_ok("ns", "data", 9));

		let config = config(vec![
			(TrackKind::Audio, track("ns", "audio")),
			(TrackKind::Data, track("ns", "data")),
		]);

		let (events_tx, events_rx) = mpsc::unbounded_channel();
		let subscriber = Subscriber::connect(session, config, events_tx).await.unwrap();

		(subscriber, handle, events_rx)
	}

	#[tokio::test]
	async fn subscribes_each_track() {
		let (_subscriber, handle, _events) = connected().await;

		let sent = handle.sent_control();
		assert_eq!(sent.len(), 3);

		match &sent[0] {
			ControlMessage::Setup(setup) => {
				assert_eq!(setup.version, VERSION);
				assert_eq!(setup.params.role(), Some(Role::Subscriber));
			}
			other => panic!("expected setup: {:?}", other),
		}

		// Track map order: audio before data.
		match &sent[1] {
			ControlMessage::Subscribe(msg) => {
				assert_eq!(msg.track_namespace, "ns");
				assert_eq!(msg.track_name, "audio");
				assert_eq!(msg.params.auth_info(), Some("secret"));
			}
			other => panic!("expected subscribe: {:?}", other),
		}
		match &sent[2] {
			ControlMessage::Subscribe(msg) => assert_eq!(msg.track_name, "data"),
			other => panic!("expected subscribe: {:?}", other),
		}
	}

	#[tokio::test]
	async fn emits_audio_chunk() {
		let (subscriber, handle, mut events) = connected().await;
		let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
		let engine = tokio::spawn(async move { subscriber.run(&mut cmd_rx).await });

		// The ID comes from the subscribe response, not the config.
		handle.push_object(
			&ObjectHeader {
				track_id: 7,
				group_seq: 1,
				object_seq: 0,
				send_order: 42,
			},
			&loc_payload(42),
		);

		match next_event(&mut events).await {
			Event::Audio(chunk) => {
				assert_eq!(chunk.kind, ChunkKind::Key);
				assert_eq!(chunk.timestamp, 1000);
				assert_eq!(chunk.duration, 20_000);
				assert_eq!(chunk.seq_id, 42);
				assert_eq!(chunk.capture_clkms, 1_700_000_000_000);
				assert_eq!(chunk.payload, Bytes::from_static(&[0xaa]));
			}
			other => panic!("expected audio chunk: {:?}", other),
		}

		// Well under the 20ms budget, so only a debug probe.
		match next_event(&mut events).await {
			Event::Debug(_) => {}
			other => panic!("expected debug event: {:?}", other),
		}

		cmd_tx.send(Command::Stop).unwrap();
		assert_eq!(engine.await.unwrap(), RunEnd::Stopped);
		assert_eq!(handle.closes(), vec![(0, "stopped".to_string())]);
	}

	#[tokio::test]
	async fn emits_data_payload() {
		let (subscriber, handle, mut events) = connected().await;
		let (_cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
		tokio::spawn(async move { subscriber.run(&mut cmd_rx).await });

		let payload = RawPacket {
			chunk_type: "key".to_string(),
			seq_id: 3,
			data: Bytes::from_static(b"blob"),
		}
		.encode_bytes();

		handle.push_object(
			&ObjectHeader {
				track_id: 9,
				group_seq: 1,
				object_seq: 0,
				send_order: 0,
			},
			&payload,
		);

		assert_eq!(
			next_event(&mut events).await,
			Event::Data {
				seq_id: 3,
				payload: Bytes::from_static(b"blob")
			}
		);
	}

	#[tokio::test]
	async fn drops_unknown_track_stream() {
		let (subscriber, handle, mut events) = connected().await;
		let (_cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
		tokio::spawn(async move { subscriber.run(&mut cmd_rx).await });

		handle.push_object(
			&ObjectHeader {
				track_id: 99,
				group_seq: 1,
				object_seq: 0,
				send_order: 0,
			},
			&loc_payload(0),
		);

		match next_event(&mut events).await {
			Event::DroppedStream { reason } => assert!(reason.contains("unknown track id")),
			other => panic!("expected dropped stream: {:?}", other),
		}

		// The next stream is unaffected.
		handle.push_object(
			&ObjectHeader {
				track_id: 7,
				group_seq: 1,
				object_seq: 0,
				send_order: 0,
			},
			&loc_payload(1),
		);
		assert!(matches!(next_event(&mut events).await, Event::Audio(_)));
	}

	#[tokio::test]
	async fn drops_malformed_envelope() {
		let (subscriber, handle, mut events) = connected().await;
		let (_cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
		tokio::spawn(async move { subscriber.run(&mut cmd_rx).await });

		handle.push_object(
			&ObjectHeader {
				track_id: 7,
				group_seq: 1,
				object_seq: 0,
				send_order: 0,
			},
			&[0xff, 0xff],
		);

		match next_event(&mut events).await {
			Event::DroppedStream { reason } => assert!(reason.contains("bad media envelope")),
			other => panic!("expected dropped stream: {:?}", other),
		}
	}

	#[tokio::test]
	async fn rejects_subscriber_peer() {
		let (session, handle) = mock::session(false);
		handle.send_control(&setup_ok(Role::Subscriber));

		let (events_tx, _events_rx) = mpsc::unbounded_channel();
		let err = Subscriber::connect(session, config(vec![(TrackKind::Audio, track("ns", "audio"))]), events_tx)
			.await
			.unwrap_err();

		assert!(matches!(
			err,
			EngineError::Handshake(HandshakeError::UnsupportedRole(Role::Subscriber))
		));
	}

	#[tokio::test]
	async fn rejects_track_mismatch() {
		let (session, handle) = mock::session(false);
		handle.send_control(&setup_ok(Role::Both));
		handle.send_control(&subscribe_ok("ns", "other", 7));

		let (events_tx, _events_rx) = mpsc::unbounded_channel();
		let err = Subscriber::connect(session, config(vec![(TrackKind::Audio, track("ns", "audio"))]), events_tx)
			.await
			.unwrap_err();

		assert!(matches!(
			err,
			EngineError::Handshake(HandshakeError::TrackMismatch { .. })
		));
	}

	#[tokio::test]
	async fn surfaces_subscribe_refusal() {
		let (session, handle) = mock::session(false);
		handle.send_control(&setup_ok(Role::Both));
		handle.send_control(&SubscribeError {
			track_namespace: "ns".to_string(),
			track_name: "audio".to_string(),
			error_code: 403,
			reason: "bad auth".to_string(),
		});

		let (events_tx, _events_rx) = mpsc::unbounded_channel();
		let err = Subscriber::connect(session, config(vec![(TrackKind::Audio, track("ns", "audio"))]), events_tx)
			.await
			.unwrap_err();

		match err {
			EngineError::Handshake(HandshakeError::SubscribeRefused { code, reason }) => {
				assert_eq!(code, 403);
				assert_eq!(reason, "bad auth");
			}
			other => panic!("expected refusal: {:?}", other),
		}
	}
}
