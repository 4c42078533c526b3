//! The run loop and state machine (spec §4.6).

use scarab_core::event::{SIMULATION_SHUTDOWN, TIME_UPDATED};
use scarab_core::{Clock, Event, EntityId, EventQueue, SimTime};
use scarab_entity::registry::EntityHandle;
use scarab_net::{ControlCommand, ControlServer, EventLogger};
use scarab_router::{EventRouter, EventSink, RouterError};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::SimulationConfig;

/// `ready → running ↔ paused → shutting_down → terminated` (spec §3
/// "Lifecycles", §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Ready,
    Running,
    Paused,
    ShuttingDown,
    Terminated,
}

/// Owns the Clock, the Event Queue, the Event Router, the Control Server,
/// and any configured Event Logger, and drives the stepping loop (spec
/// §4.6, Design Note 9: "Simulation owns Router and Queue and Server").
pub struct Simulation {
    clock: Clock,
    queue: EventQueue,
    router: EventRouter,
    sinks: Vec<Box<dyn EventSink>>,
    config: SimulationConfig,
    state: RunState,
}

impl Simulation {
    /// Build a simulation in the `ready` state. Binding the control
    /// server's socket is deferred to [`Simulation::run`], since it
    /// requires an async runtime.
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        let mut sinks: Vec<Box<dyn EventSink>> = Vec::new();
        if let Some(logger_config) = &config.logger {
            let logger = match &logger_config.path {
                Some(path) => EventLogger::to_file(logger_config.filter, path),
                None => Some(EventLogger::to_stdout(logger_config.filter)),
            };
            if let Some(logger) = logger {
                sinks.push(Box::new(logger));
            }
        }

        Self {
            clock: Clock::new(),
            queue: EventQueue::new(),
            router: EventRouter::new(),
            sinks,
            config,
            state: RunState::Ready,
        }
    }

    /// Register an entity at the current sim-time.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Registration`] on duplicate registration, or
    /// [`RouterError::QueueOverflow`] (fatal).
    pub fn register(&mut self, entity: EntityHandle) -> Result<EntityId, RouterError> {
        self.router.register(entity, self.clock.now(), &mut self.queue)
    }

    /// Deregister an entity at the current sim-time.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Registration`] if `id` is unknown, or
    /// [`RouterError::QueueOverflow`] (fatal).
    pub fn unregister(&mut self, id: EntityId) -> Result<(), RouterError> {
        self.router.unregister(id, self.clock.now(), &mut self.queue)
    }

    /// Enqueue a user event.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::QueueOverflow`] (fatal) on sequence exhaustion.
    pub fn send(&mut self, event: Event) -> Result<(), RouterError> {
        self.router.send(event, &mut self.queue)
    }

    /// Current sim-time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    async fn resolve_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        tokio::net::lookup_host((self.config.host.as_str(), self.config.port))
            .await?
            .next()
            .ok_or_else(|| anyhow::anyhow!("could not resolve {}:{}", self.config.host, self.config.port))
    }

    /// Bind the control server and run the stepping loop to completion
    /// (spec §4.6). Returns once the simulation reaches `terminated`,
    /// either by exhausting `number_steps` or receiving `shutdown`.
    ///
    /// Stays in `ready` after binding until a `start` command arrives over
    /// the Control Server — the broadcast channel has no replay, so an
    /// observer that connects after stepping begins would miss the
    /// `created`/`time.updated` events every §8 scenario depends on it
    /// seeing.
    ///
    /// # Errors
    ///
    /// Propagates a bind failure ([`scarab_net::NetError::Bind`]) or any
    /// fatal [`RouterError`] (queue sequence overflow) as an
    /// `InvariantViolation`.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let addr = self.resolve_addr().await?;
        let (server, mut command_rx) = ControlServer::bind(addr).await?;
        self.sinks.push(Box::new(server.clone()));

        self.block_until_started(&mut command_rx).await;

        if self.state == RunState::ShuttingDown || self.config.number_steps == 0 {
            self.emit_shutdown()?;
            server.close_all();
            self.state = RunState::Terminated;
            return Ok(());
        }

        loop {
            if self.state == RunState::Paused {
                self.block_until_resumed(&mut command_rx).await;
                if self.state == RunState::ShuttingDown {
                    break;
                }
            }

            let step_start = tokio::time::Instant::now();

            let (previous, t) = self.clock.advance();
            self.queue.push(
                Event::new(TIME_UPDATED, t).with_payload(json!({ "previous_time": previous })),
            )?;
            self.router.dispatch_due(&mut self.queue, t, &mut self.sinks)?;

            self.drain_commands(&mut command_rx);

            let elapsed = step_start.elapsed();
            if elapsed < self.config.step_length {
                tokio::time::sleep(self.config.step_length - elapsed).await;
            }

            if t >= self.config.number_steps || self.state == RunState::ShuttingDown {
                break;
            }
        }

        self.emit_shutdown()?;
        server.close_all();
        self.state = RunState::Terminated;
        Ok(())
    }

    fn emit_shutdown(&mut self) -> Result<(), RouterError> {
        let now = self.clock.now();
        self.queue.push(Event::new(SIMULATION_SHUTDOWN, now))?;
        self.router.dispatch_due(&mut self.queue, now, &mut self.sinks)
    }

    /// Apply a single control command's state transition (spec §4.5/§4.6).
    /// `start`/`pause`/`resume`/`shutdown` repeated in the same state are
    /// no-ops (spec §8 idempotence).
    fn apply_command(&mut self, command: ControlCommand) {
        self.state = match (self.state, command) {
            (RunState::Ready, ControlCommand::Start) => RunState::Running,
            (RunState::Running, ControlCommand::Pause) => RunState::Paused,
            (RunState::Paused, ControlCommand::Resume) => RunState::Running,
            (_, ControlCommand::Shutdown) => RunState::ShuttingDown,
            (state, _) => state,
        };
        debug!(?command, state = ?self.state, "applied control command");
    }

    fn drain_commands(&mut self, command_rx: &mut mpsc::Receiver<ControlCommand>) {
        while let Ok(command) = command_rx.try_recv() {
            self.apply_command(command);
        }
    }

    /// Block on the command channel until `start` (or `shutdown`) arrives
    /// (spec §4.6, `ready → running`): the step loop must not advance the
    /// clock or dispatch anything before an observer has had a chance to
    /// connect.
    async fn block_until_started(&mut self, command_rx: &mut mpsc::Receiver<ControlCommand>) {
        while self.state == RunState::Ready {
            match command_rx.recv().await {
                Some(command) => self.apply_command(command),
                None => {
                    info!("command channel closed while ready, shutting down");
                    self.state = RunState::ShuttingDown;
                }
            }
        }
    }

    /// Block on the command channel until `resume`, `shutdown`, or a
    /// spurious wake (spec §4.6 step 1).
    async fn block_until_resumed(&mut self, command_rx: &mut mpsc::Receiver<ControlCommand>) {
        while self.state == RunState::Paused {
            match command_rx.recv().await {
                Some(command) => self.apply_command(command),
                None => {
                    info!("command channel closed while paused, shutting down");
                    self.state = RunState::ShuttingDown;
                }
            }
        }
    }
}
