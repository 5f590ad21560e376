use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use loc::{ChunkKind, LocPacket, RawPacket};
use moq_wire::coding::{Reader, Stream, Writer};
use moq_wire::{
	Announce, AnnounceOk, ControlMessage, ObjectHeader, Parameters, Role, Setup, SetupOk, Subscribe, SubscribeOk,
	VERSION, transport,
};

use crate::engine::{RunEnd, SETUP_TIMEOUT};
use crate::{
	Command, DropReason, EngineError, Event, HandshakeError, IngestChunk, PublisherConfig, Track, TrackKind, now_ms,
};

/// The largest integer a JavaScript peer can represent exactly.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// High-priority tracks are offset by half that range, so any hi-pri object
/// outranks every lo-pri one while send orders stay representable everywhere.
const HIPRI_OFFSET: u64 = MAX_SAFE_INTEGER / 2;

/// The priority hint for one object; higher is scheduled first.
pub(crate) fn send_order(is_hipri: bool, seq_id: i64) -> u64 {
	if seq_id < 0 {
		// Send immediately, ahead of everything else.
		u64::MAX
	} else if is_hipri {
		seq_id as u64 + HIPRI_OFFSET
	} else {
		seq_id as u64
	}
}

/// The group/object counters for one track, created on its first keyframe.
#[derive(Default)]
struct SeqState {
	group: u64,
	object: u64,
}

/// Everything the publisher knows about one track.
struct PubTrack {
	track: Track,
	subscribers: u32,
	seq: Option<SeqState>,
	/// In-flight object streams by p_id, bounded by `track.max_in_flight`.
	pending: HashSet<u64>,
}

impl PubTrack {
	fn new(track: Track) -> Self {
		Self {
			track,
			subscribers: 0,
			seq: None,
			pending: HashSet::new(),
		}
	}
}

/// The publisher engine: announces tracks, accepts subscriptions, and writes
/// each chunk as one prioritized object stream.
pub(crate) struct Publisher<S: transport::Session> {
	session: S,
	control: Writer<S::SendStream>,
	tracks: BTreeMap<TrackKind, PubTrack>,
	tasks: JoinSet<(TrackKind, u64, Result<(), moq_wire::Error>)>,
	events: mpsc::UnboundedSender<Event>,
	is_sending_stats: bool,
}

impl<S: transport::Session> std::fmt::Debug for Publisher<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Publisher").finish_non_exhaustive()
	}
}

impl<S: transport::Session> Publisher<S> {
	/// Perform the SETUP and ANNOUNCE exchange on a fresh control stream.
	///
	/// Returns the engine and the read half of the control stream, which
	/// [Self::run] consumes to accept subscriptions.
	pub async fn connect(
		session: S,
		config: PublisherConfig,
		events: mpsc::UnboundedSender<Event>,
	) -> Result<(Self, Reader<S::RecvStream>), EngineError> {
		let mut stream = Stream::open(&session).await?;

		tokio::time::timeout(SETUP_TIMEOUT, Self::handshake(&mut stream, &config))
			.await
			.map_err(|_| HandshakeError::Timeout)??;

		let Stream { writer, reader } = stream;

		let publisher = Self {
			session,
			control: writer,
			tracks: config.tracks.into_iter().map(|(k, t)| (k, PubTrack::new(t))).collect(),
			tasks: JoinSet::new(),
			events,
			is_sending_stats: config.is_sending_stats,
		};

		Ok((publisher, reader))
	}

	async fn handshake(stream: &mut Stream<S>, config: &PublisherConfig) -> Result<(), EngineError> {
		let mut params = Parameters::default();
		params.set_role(Role::Publisher);

		stream.writer.encode(&Setup { version: VERSION, params }).await?;

		let ok: SetupOk = stream.reader.decode().await?;
		if ok.version != VERSION {
			return Err(HandshakeError::VersionMismatch(ok.version).into());
		}

		let peer = ok.params.role().ok_or(HandshakeError::MissingRole)?;
		if !Role::Publisher.accepts(peer) {
			return Err(HandshakeError::UnsupportedRole(peer).into());
		}
		tracing::debug!(?peer, "setup complete");

		// One announce per distinct namespace, even when tracks share one.
		let mut namespaces = BTreeMap::new();
		for track in config.tracks.values() {
			namespaces.entry(track.namespace.as_str()).or_insert(track.auth_info.as_str());
		}

		for (namespace, auth_info) in namespaces {
			let mut params = Parameters::default();
			params.set_auth_info(auth_info);

			stream
				.writer
				.encode(&Announce {
					track_namespace: namespace.to_string(),
					params,
				})
				.await?;

			let ok: AnnounceOk = stream.reader.decode().await?;
			if ok.track_namespace != namespace {
				return Err(HandshakeError::NamespaceMismatch {
					expected: namespace.to_string(),
					actual: ok.track_namespace,
				}
				.into());
			}

			tracing::debug!(%namespace, "announced");
		}

		Ok(())
	}

	/// Pump chunks out and subscriptions in until the host stops us or the
	/// transport dies.
	pub async fn run(mut self, reader: Reader<S::RecvStream>, commands: &mut mpsc::UnboundedReceiver<Command>) -> RunEnd {
		// Decode control messages on their own task so the main loop can
		// select over them alongside commands and completions.
		let (ctrl_tx, mut ctrl_rx) = mpsc::unbounded_channel();
		let mut forward = tokio::spawn(forward_control(reader, ctrl_tx));

		let end = loop {
			tokio::select! {
				cmd = commands.recv() => match cmd {
					Some(Command::Chunk { track, chunk }) => self.send_chunk(track, chunk),
					Some(Command::Stop) | None => break RunEnd::Stopped,
					Some(cmd) => {
						tracing::warn!(?cmd, "ignoring init while running");
						let _ = self.events.send(Event::Warning("already running".to_string()));
					}
				},
				msg = ctrl_rx.recv() => match msg {
					Some(ControlMessage::Subscribe(msg)) => {
						if let Err(err) = self.recv_subscribe(msg).await {
							let _ = self.events.send(Event::Error(format!("control stream failed: {err}")));
							break RunEnd::Closed;
						}
					}
					Some(msg) => {
						// Only subscriptions are valid after setup.
						tracing::error!(?msg, "unexpected control message");
						let _ = self.events.send(Event::Error("unexpected control message".to_string()));
						break RunEnd::Closed;
					}
					None => {
						self.control_gone(&mut forward).await;
						break RunEnd::Closed;
					}
				},
				Some(res) = self.tasks.join_next() => self.complete(res),
			}
		};

		forward.abort();
		self.shutdown().await;
		end
	}

	/// Package and dispatch one chunk, or drop it with a reason.
	fn send_chunk(&mut self, track: TrackKind, chunk: IngestChunk) {
		let p_id = chunk.p_id;

		let Some(state) = self.tracks.get_mut(&track) else {
			tracing::error!(%track, "chunk for unconfigured track");
			let _ = self.events.send(Event::Error(format!("chunk for unconfigured track: {track}")));
			return;
		};

		if state.subscribers == 0 {
			let _ = self.events.send(Event::Dropped {
				track,
				p_id,
				reason: DropReason::NoSubscribers,
			});
			return;
		}

		if state.pending.len() >= state.track.max_in_flight as usize {
			tracing::debug!(%track, p_id, "in-flight window full");
			let _ = self.events.send(Event::Dropped {
				track,
				p_id,
				reason: DropReason::TooManyInFlight,
			});
			return;
		}

		// A subscriber can only join at a keyframe, so a track must start with one.
		if state.seq.is_none() && chunk.kind == ChunkKind::Delta {
			let _ = self.events.send(Event::Dropped {
				track,
				p_id,
				reason: DropReason::FirstObjectNotKey,
			});
			return;
		}

		let seq = state.seq.get_or_insert_with(SeqState::default);
		if chunk.kind == ChunkKind::Key {
			seq.group += 1;
			seq.object = 0;
		}

		let header = ObjectHeader {
			track_id: state.track.id,
			group_seq: seq.group,
			object_seq: seq.object,
			send_order: send_order(state.track.is_hipri, chunk.seq_id),
		};
		seq.object += 1;

		let payload = match track.media() {
			None => RawPacket {
				chunk_type: chunk.kind.as_str().to_string(),
				seq_id: chunk.seq_id,
				data: chunk.payload,
			}
			.encode_bytes(),
			Some(media) => LocPacket {
				media,
				timestamp: chunk.compensated_ts,
				duration: chunk.wire_duration(),
				chunk: chunk.kind,
				seq_id: chunk.seq_id,
				first_frame_clkms: chunk.first_frame_clkms,
				metadata: chunk.metadata,
				data: chunk.payload,
			}
			.encode_bytes(),
		};

		state.pending.insert(p_id);

		tracing::debug!(
			%track,
			p_id,
			group = header.group_seq,
			object = header.object_seq,
			send_order = header.send_order,
			"dispatching object"
		);

		let session = self.session.clone();
		self.tasks
			.spawn(async move { (track, p_id, write_object(session, header, payload).await) });

		if self.is_sending_stats {
			let in_flight = self.tracks.iter().map(|(k, t)| (*k, t.pending.len())).collect();
			let _ = self.events.send(Event::SendStats {
				clkms: now_ms(),
				in_flight,
			});
		}
	}

	/// An object stream settled; free its in-flight slot.
	fn complete(&mut self, res: Result<(TrackKind, u64, Result<(), moq_wire::Error>), tokio::task::JoinError>) {
		let (track, p_id, res) = match res {
			Ok(res) => res,
			Err(err) => {
				if !err.is_cancelled() {
					tracing::error!(%err, "object task failed");
				}
				return;
			}
		};

		if let Some(state) = self.tracks.get_mut(&track) {
			state.pending.remove(&p_id);
		}

		if let Err(err) = res {
			tracing::warn!(%track, p_id, %err, "object stream failed");
			let _ = self.events.send(Event::Dropped {
				track,
				p_id,
				reason: DropReason::WriteFailed,
			});
		}
	}

	/// Validate an incoming subscription and reply on a match.
	///
	/// A bad namespace/name or auth mismatch is logged and ignored: no reply
	/// goes out and no subscriber is counted.
	async fn recv_subscribe(&mut self, msg: Subscribe) -> Result<(), moq_wire::Error> {
		let found = self
			.tracks
			.values_mut()
			.find(|state| state.track.namespace == msg.track_namespace && state.track.name == msg.track_name);

		let Some(state) = found else {
			tracing::warn!(namespace = %msg.track_namespace, track = %msg.track_name, "subscribe for unknown track");
			let _ = self.events.send(Event::Error(format!(
				"subscribe for unknown track: {}/{}",
				msg.track_namespace, msg.track_name
			)));
			return Ok(());
		};

		if msg.params.auth_info() != Some(state.track.auth_info.as_str()) {
			tracing::warn!(namespace = %msg.track_namespace, track = %msg.track_name, "subscribe with bad auth");
			let _ = self.events.send(Event::Error(format!(
				"auth mismatch for {}/{}",
				msg.track_namespace, msg.track_name
			)));
			return Ok(());
		}

		state.subscribers += 1;
		let track_id = state.track.id;
		tracing::info!(namespace = %msg.track_namespace, track = %msg.track_name, subscribers = state.subscribers, "subscriber added");

		self.control
			.encode(&SubscribeOk {
				track_namespace: msg.track_namespace,
				track_name: msg.track_name,
				track_id,
				expires: 0,
			})
			.await
	}

	/// The control stream ended; report how.
	async fn control_gone(&mut self, forward: &mut tokio::task::JoinHandle<Result<(), moq_wire::Error>>) {
		match forward.await {
			Ok(Ok(())) => {
				let _ = self.events.send(Event::Info("transport closed".to_string()));
			}
			Ok(Err(err)) => {
				let _ = self.events.send(Event::Error(format!("transport closed: {err}")));
			}
			Err(err) => tracing::error!(%err, "control task failed"),
		}
	}

	/// Abort every in-flight object stream, wait for them to settle, then
	/// close the transport once.
	async fn shutdown(&mut self) {
		self.tasks.abort_all();
		while let Some(res) = self.tasks.join_next().await {
			match res {
				Ok((track, p_id, Err(err))) => tracing::debug!(%track, p_id, %err, "in-flight object aborted"),
				Ok(_) => {}
				Err(err) if err.is_cancelled() => {}
				Err(err) => tracing::error!(%err, "object task failed"),
			}
		}

		for state in self.tracks.values_mut() {
			state.pending.clear();
		}

		self.session.close(0, "stopped");
	}
}

/// Write one object: open a unidirectional stream at the given priority,
/// write the header and payload, then wait for the close to settle.
async fn write_object<S: transport::Session>(
	session: S,
	header: ObjectHeader,
	payload: Bytes,
) -> Result<(), moq_wire::Error> {
	let stream = session
		.open_uni(header.send_order)
		.await
		.map_err(|e| moq_wire::Error::Transport(Arc::new(e)))?;

	let mut writer = Writer::new(stream);
	writer.encode(&header).await?;

	let mut payload = payload;
	writer.write_all(&mut payload).await?;
	writer.finish()?;
	writer.closed().await?;

	Ok(())
}

/// Forward decoded control messages until the stream ends or fails.
async fn forward_control<R: transport::RecvStream>(
	mut reader: Reader<R>,
	tx: mpsc::UnboundedSender<ControlMessage>,
) -> Result<(), moq_wire::Error> {
	while let Some(msg) = reader.decode_maybe::<ControlMessage>().await? {
		tracing::debug!(message = ?msg, "received control message");
		if tx.send(msg).is_err() {
			break;
		}
	}

	Ok(())
}
