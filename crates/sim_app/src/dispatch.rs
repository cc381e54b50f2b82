//! The command dispatch loop.
//!
//! A single-threaded loop that owns the [`Kernel`] and consumes the
//! per-faction inbound queues:
//!
//! 1. Every faction in the store (entities holding [`Faction`]) is visited in
//!    ascending id order. The head of its inbound queue is peeked, validated
//!    and dequeued; at most one message per faction is taken per pass.
//! 2. Recognized commands are applied. `advance` is the only way the engine
//!    runs, so the store is never mutated between polls by anything else.
//! 3. A pass that processed anything is followed immediately by another.
//!    An empty pass blocks on the queues' wake signal for up to the idle
//!    wait.
//! 4. `quit` ends the loop once the pass it arrived in has finished. A
//!    [`StopHandle`] ends it from outside, between passes.
//!
//! A bad message from one faction never stops the others: validation
//! failures and malformed payloads are answered with `rejected`, and so are
//! unrecognized message types unless the policy is [`UnrecognizedPolicy::Halt`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sim_component::Entity;
use sim_kernel::{Kernel, StoreError};
use sim_net::{AdvanceReply, Command, CommandQueues, InspectReply, Message, NetError, kinds};
use tracing::{debug, error, info, warn};

use crate::components::Faction;

pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(50);

/// What to do with a message whose kind the kernel does not understand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnrecognizedPolicy {
    /// Log an error, answer `rejected`, keep going.
    #[default]
    Skip,
    /// Log an error and stop the loop with
    /// [`DispatchError::UnrecognizedMessageType`].
    Halt,
}

/// Settings for a [`DispatchLoop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Longest time an idle loop blocks before polling again.
    pub idle_wait: Duration,
    pub unrecognized: UnrecognizedPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            idle_wait: DEFAULT_IDLE_WAIT,
            unrecognized: UnrecognizedPolicy::Skip,
        }
    }
}

/// Decides whether a faction's message may be applied.
pub trait MessageValidator: Send {
    /// # Errors
    ///
    /// Returns the reason the message is refused.
    fn validate(&self, faction: Entity, message: &Message) -> Result<(), String>;
}

/// Accepts every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl MessageValidator for AcceptAll {
    fn validate(&self, _faction: Entity, _message: &Message) -> Result<(), String> {
        Ok(())
    }
}

/// Failures that end the dispatch loop.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("{faction} sent unrecognized message type '{kind}'")]
    UnrecognizedMessageType { faction: Entity, kind: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Net(#[from] NetError),
}

/// Result of one pass over the faction queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// This many messages were taken; poll again straight away.
    Processed(usize),
    /// Nothing to do.
    Idle,
    /// A `quit` was received during this pass.
    Quit,
}

/// Running totals over the lifetime of a [`DispatchLoop`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Messages dequeued, including rejected ones and the `quit` itself.
    pub processed: u64,
    /// Times the loop found nothing to do and blocked.
    pub idle_waits: u64,
}

enum Flow {
    Continue,
    Quit,
}

/// Asks a running [`DispatchLoop`] to stop after its current pass, waking it
/// if it is idle.
#[derive(Debug, Clone)]
pub struct StopHandle {
    stop: Arc<AtomicBool>,
    queues: Arc<CommandQueues>,
}

impl StopHandle {
    /// Stop the loop after its current pass and wake it if idle.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.queues.wake();
    }
}

/// Consumes faction queues and applies each command to the kernel.
pub struct DispatchLoop<V = AcceptAll> {
    kernel: Kernel,
    queues: Arc<CommandQueues>,
    config: DispatchConfig,
    validator: V,
    summary: DispatchSummary,
    stop: Arc<AtomicBool>,
}

impl DispatchLoop<AcceptAll> {
    /// A loop that accepts every well-formed command.
    #[must_use]
    pub fn new(kernel: Kernel, queues: Arc<CommandQueues>, config: DispatchConfig) -> Self {
        Self::with_validator(kernel, queues, config, AcceptAll)
    }
}

impl<V: MessageValidator> DispatchLoop<V> {
    /// A loop that checks each command with `validator` before applying it.
    #[must_use]
    pub fn with_validator(
        kernel: Kernel,
        queues: Arc<CommandQueues>,
        config: DispatchConfig,
        validator: V,
    ) -> Self {
        Self {
            kernel,
            queues,
            config,
            validator,
            summary: DispatchSummary::default(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The kernel this loop drives.
    #[must_use]
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Give up the loop and keep the simulation.
    #[must_use]
    pub fn into_kernel(self) -> Kernel {
        self.kernel
    }

    /// A handle that can stop [`run`](Self::run) from another thread.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop: Arc::clone(&self.stop),
            queues: Arc::clone(&self.queues),
        }
    }

    /// Poll until `quit` or a stop request and return the running totals.
    /// Never blocks between passes that processed something.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if a pass fails; see [`poll_once`].
    ///
    /// [`poll_once`]: DispatchLoop::poll_once
    pub fn run(&mut self) -> Result<DispatchSummary, DispatchError> {
        info!(
            idle_wait_ms = self.config.idle_wait.as_millis() as u64,
            policy = ?self.config.unrecognized,
            "dispatch loop started"
        );
        loop {
            if self.stop.load(Ordering::Acquire) {
                info!("dispatch loop stop requested");
                break;
            }
            match self.poll_once()? {
                PollOutcome::Processed(_) => {}
                PollOutcome::Idle => {
                    self.summary.idle_waits += 1;
                    self.idle();
                }
                PollOutcome::Quit => break,
            }
        }
        info!(
            processed = self.summary.processed,
            idle_waits = self.summary.idle_waits,
            now = self.kernel.clock().now(),
            "dispatch loop stopped"
        );
        Ok(self.summary)
    }

    fn idle(&self) {
        if self.queues.has_pending() {
            // Messages are waiting, but only on queues of entities that are
            // not factions, so the pending count cannot end the wait.
            debug!(
                pending = self.queues.pending_count(),
                "pending messages have no faction"
            );
            self.queues.wait_for_wake(self.config.idle_wait);
        } else {
            self.queues.wait_for_pending(self.config.idle_wait);
        }
    }

    /// Take and apply at most one message from each faction.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnrecognizedMessageType`] under
    /// [`UnrecognizedPolicy::Halt`], or a store/queue error that prevents a
    /// command from being applied or answered.
    pub fn poll_once(&mut self) -> Result<PollOutcome, DispatchError> {
        if !self.queues.has_pending() {
            return Ok(PollOutcome::Idle);
        }

        let factions = self.kernel.read(|store| store.entities_with::<Faction>())?;
        let mut processed = 0;
        let mut quit = false;

        for faction in factions {
            let Some(message) = self.queues.peek_inbound(faction) else {
                continue;
            };
            let verdict = self.validator.validate(faction, &message);
            self.queues.pop_inbound(faction);
            processed += 1;
            self.summary.processed += 1;

            if let Err(reason) = verdict {
                warn!(%faction, kind = %message.kind, %reason, "message failed validation");
                self.queues
                    .push_outbound(faction, message.reject(reason)?)?;
                continue;
            }

            if let Flow::Quit = self.dispatch(faction, &message)? {
                quit = true;
            }
        }

        Ok(if quit {
            PollOutcome::Quit
        } else if processed > 0 {
            PollOutcome::Processed(processed)
        } else {
            PollOutcome::Idle
        })
    }

    fn dispatch(&mut self, faction: Entity, message: &Message) -> Result<Flow, DispatchError> {
        let command = match Command::decode(message) {
            Ok(command) => command,
            Err(NetError::UnrecognizedMessageType(kind)) => {
                error!(%faction, %kind, "unrecognized message type");
                return match self.config.unrecognized {
                    UnrecognizedPolicy::Skip => {
                        let reply = message.reject(format!("unrecognized message type '{kind}'"))?;
                        self.queues.push_outbound(faction, reply)?;
                        Ok(Flow::Continue)
                    }
                    UnrecognizedPolicy::Halt => {
                        Err(DispatchError::UnrecognizedMessageType { faction, kind })
                    }
                };
            }
            Err(err) => {
                warn!(%faction, kind = %message.kind, error = %err, "malformed message");
                self.queues
                    .push_outbound(faction, message.reject(err.to_string())?)?;
                return Ok(Flow::Continue);
            }
        };

        debug!(%faction, ?command, "dispatching");
        match command {
            Command::Quit => {
                info!(%faction, "quit requested");
                return Ok(Flow::Quit);
            }
            Command::Echo => {
                self.queues.push_outbound(faction, message.clone())?;
            }
            Command::Advance { seconds } => {
                let report = self.kernel.advance(seconds)?;
                let body = AdvanceReply {
                    requested_secs: report.requested_secs,
                    advanced_secs: report.advanced_secs,
                    subpulses: report.subpulses,
                    interrupted: report.interrupted,
                    now: report.now,
                };
                self.queues
                    .push_outbound(faction, message.reply(kinds::ADVANCED, &body)?)?;
            }
            Command::Inspect { entity } => {
                let reply = match self.kernel.read(|store| store.components_of(entity))? {
                    Ok(components) => {
                        let components = components
                            .iter()
                            .map(|component| component.to_record(entity))
                            .collect::<Result<Vec<_>, _>>()
                            .map_err(NetError::Encode)?;
                        message.reply(kinds::COMPONENTS, &InspectReply { entity, components })?
                    }
                    Err(err) => message.reject(err.to_string())?,
                };
                self.queues.push_outbound(faction, reply)?;
            }
        }
        Ok(Flow::Continue)
    }
}
