use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;

use moq_wire::transport;
use moq_wire::transport::Session as _;

use crate::publisher::Publisher;
use crate::subscriber::Subscriber;
use crate::{Command, DropReason, Event};

/// How long the SETUP/ANNOUNCE/SUBSCRIBE exchange may take.
pub(crate) const SETUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Why an engine's run loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunEnd {
	/// The host asked us to stop.
	Stopped,
	/// The transport or control stream died.
	Closed,
}

/// Establishes transport sessions on behalf of the engine.
///
/// Certificate verification (fingerprint pinning included) happens behind
/// this trait; the engine only ever sees a verified session.
pub trait Connector: Send + 'static {
	type Session: transport::Session;
	type Error: std::error::Error + Send + Sync + 'static;

	fn connect(&mut self, url: &str) -> impl Future<Output = Result<Self::Session, Self::Error>> + Send;
}

/// The engine lifecycle. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
	Created,
	Instantiated,
	Running,
	Stopped,
}

/// The host-facing endpoint: a state machine fed by [Command]s that runs a
/// publisher or subscriber engine once initialized.
pub struct Endpoint<C: Connector> {
	connector: C,
	commands: mpsc::UnboundedReceiver<Command>,
	events: mpsc::UnboundedSender<Event>,
	state: State,
}

impl<C: Connector> Endpoint<C> {
	pub fn new(
		connector: C,
		commands: mpsc::UnboundedReceiver<Command>,
		events: mpsc::UnboundedSender<Event>,
	) -> Self {
		Self {
			connector,
			commands,
			events,
			state: State::Created,
		}
	}

	/// Process commands until the host drops its sender.
	pub async fn run(mut self) {
		while let Some(cmd) = self.commands.recv().await {
			if self.state == State::Created {
				self.state = State::Instantiated;
			}

			match cmd {
				Command::Stop => {
					self.state = State::Stopped;
					let _ = self.events.send(Event::Info("stopped".to_string()));
				}
				_ if self.state == State::Stopped => {
					let _ = self.events.send(Event::Info("stopped".to_string()));
				}
				Command::InitPublisher(config) => self.init_publisher(config).await,
				Command::InitSubscriber(config) => self.init_subscriber(config).await,
				Command::Chunk { track, chunk } => {
					// Not running: nothing is on the wire yet.
					let _ = self.events.send(Event::Dropped {
						track,
						p_id: chunk.p_id,
						reason: DropReason::TransportNotOpen,
					});
				}
			}
		}
	}

	/// Connect and run as a publisher. On failure the state stays
	/// `Instantiated` so the host may retry with a fixed config.
	async fn init_publisher(&mut self, config: crate::PublisherConfig) {
		if let Err(err) = config.validate() {
			let _ = self.events.send(Event::Error(format!("invalid config: {err}")));
			return;
		}

		let url = format!("https://{}", config.url_host_port);
		let session = match self.connector.connect(&url).await {
			Ok(session) => session,
			Err(err) => {
				let _ = self.events.send(Event::Error(format!("connect failed: {err}")));
				return;
			}
		};

		let (publisher, reader) = match Publisher::connect(session.clone(), config, self.events.clone()).await {
			Ok(ok) => ok,
			Err(err) => {
				tracing::error!(%err, "publisher handshake failed");
				let _ = self.events.send(Event::Error(format!("handshake failed: {err}")));
				session.close(1, "handshake failed");
				return;
			}
		};

		self.state = State::Running;
		let _ = self.events.send(Event::Info("publisher running".to_string()));

		publisher.run(reader, &mut self.commands).await;
		self.state = State::Stopped;
	}

	/// Connect and run as a subscriber; same failure semantics as the publisher.
	async fn init_subscriber(&mut self, config: crate::SubscriberConfig) {
		if let Err(err) = config.validate() {
			let _ = self.events.send(Event::Error(format!("invalid config: {err}")));
			return;
		}

		let url = format!("https://{}{}", config.url_host_port, config.url_path);
		let session = match self.connector.connect(&url).await {
			Ok(session) => session,
			Err(err) => {
				let _ = self.events.send(Event::Error(format!("connect failed: {err}")));
				return;
			}
		};

		let subscriber = match Subscriber::connect(session.clone(), config, self.events.clone()).await {
			Ok(ok) => ok,
			Err(err) => {
				tracing::error!(%err, "subscriber handshake failed");
				let _ = self.events.send(Event::Error(format!("handshake failed: {err}")));
				session.close(1, "handshake failed");
				return;
			}
		};

		self.state = State::Running;
		let _ = self.events.send(Event::Info("subscriber running".to_string()));

		subscriber.run(&mut self.commands).await;
		self.state = State::Stopped;
	}
}
