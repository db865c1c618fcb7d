//! The connection state machine.
//!
//! ```text
//! Disconnected --start--> Connecting --joined--> Connected
//!                             ^  |                   |
//!                   backoff   |  | fail/timeout      | drop
//!                             |  v                   v
//!                          (retry) <----------- Reconnecting
//!                             |
//!                   budget exhausted --> Failed
//! ```
//!
//! `end()` returns to `Disconnected` from any state. A voluntary disconnect
//! from the remote side also returns to `Disconnected`, without retrying.

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::identity::SessionIdentity;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use vesper_types::{ConnectionState, DisconnectReason};

/// Which timer is pending. At most one is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Bounds one attempt while connecting or reconnecting.
    Watchdog,
    /// Delay before the next attempt.
    Backoff,
}

/// Connectivity events of a joined media session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Reconnecting,
    Reconnected,
    Disconnected(DisconnectReason),
}

/// Everything that can change a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// User-initiated start. Ends any active session first.
    Start,
    /// User-initiated teardown.
    End,
    /// Attempt `epoch` fetched a credential and joined.
    AttemptSucceeded { epoch: u64 },
    /// Attempt `epoch` failed before joining.
    AttemptFailed { epoch: u64, error: SessionError },
    /// Timer `generation` elapsed.
    TimerFired { generation: u64 },
    /// The session joined by attempt `epoch` reported a connectivity event.
    Transport { epoch: u64, event: ConnectionEvent },
}

/// Side effects requested by [`Session::apply`], in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Abandon any in-flight attempt and leave the media session.
    Teardown,
    /// Clear transcripts and citations.
    ResetStreams,
    /// Fetch a credential for `identity` and join; report back with `epoch`.
    BeginAttempt {
        epoch: u64,
        identity: SessionIdentity,
    },
    /// Replace the pending timer with a new one.
    ArmTimer {
        generation: u64,
        kind: TimerKind,
        after: Duration,
    },
    /// Drop the pending timer.
    CancelTimer,
}

/// Read-only view of a [`Session`] for observers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    pub room_name: Option<String>,
    pub participant_name: Option<String>,
    pub agent_name: String,
    pub retry_count: u32,
    /// Attempts made since the last `start()`, including the current one.
    pub attempts: u32,
    #[serde(serialize_with = "serialize_error")]
    pub last_error: Option<SessionError>,
}

impl SessionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

fn serialize_error<S: serde::Serializer>(
    error: &Option<SessionError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    generation: u64,
    kind: TimerKind,
}

/// One conversation's connection lifecycle.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    state: ConnectionState,
    identity: Option<SessionIdentity>,
    retry_count: u32,
    attempts: u32,
    last_error: Option<SessionError>,
    epoch: u64,
    timer: Option<PendingTimer>,
    next_generation: u64,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
            identity: None,
            retry_count: 0,
            attempts: 0,
            last_error: None,
            epoch: 0,
            timer: None,
            next_generation: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    /// Epoch of the current attempt. Results tagged with any other epoch
    /// are stale.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref()
    }

    pub fn pending_timer(&self) -> Option<TimerKind> {
        self.timer.map(|t| t.kind)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            room_name: self.identity.as_ref().map(|i| i.room_name.clone()),
            participant_name: self.identity.as_ref().map(|i| i.participant_name.clone()),
            agent_name: self.config.agent_name.clone(),
            retry_count: self.retry_count,
            attempts: self.attempts,
            last_error: self.last_error.clone(),
        }
    }

    /// Applies one input and returns the effects to execute.
    pub fn apply(&mut self, input: Input) -> Vec<Effect> {
        let before = self.state;
        let mut effects = Vec::new();

        match input {
            Input::Start => self.on_start(&mut effects),
            Input::End => self.on_end(&mut effects),
            Input::AttemptSucceeded { epoch } => {
                if self.accepts_attempt_result(epoch) {
                    self.on_connected(&mut effects);
                } else {
                    debug!(epoch, current = self.epoch, "ignoring stale attempt success");
                }
            }
            Input::AttemptFailed { epoch, error } => {
                if self.accepts_attempt_result(epoch) {
                    warn!(epoch, error = %error, "connection attempt failed");
                    self.last_error = Some(error);
                    self.fail_attempt(&mut effects);
                } else {
                    debug!(epoch, current = self.epoch, "ignoring stale attempt failure");
                }
            }
            Input::TimerFired { generation } => self.on_timer(generation, &mut effects),
            Input::Transport { epoch, event } => {
                if epoch == self.epoch {
                    self.on_transport(event, &mut effects);
                } else {
                    debug!(epoch, current = self.epoch, ?event, "ignoring stale transport event");
                }
            }
        }

        if self.state != before {
            info!(
                from = %before,
                to = %self.state,
                retry_count = self.retry_count,
                "session state changed"
            );
        }
        effects
    }

    fn on_start(&mut self, effects: &mut Vec<Effect>) {
        if self.state.is_active() || self.timer.is_some() {
            info!(state = %self.state, "ending previous session before start");
            self.timer = None;
            effects.push(Effect::CancelTimer);
            effects.push(Effect::Teardown);
        }
        effects.push(Effect::ResetStreams);
        self.retry_count = 0;
        self.attempts = 0;
        self.last_error = None;
        self.state = ConnectionState::Connecting;
        self.begin_attempt(effects);
    }

    fn on_end(&mut self, effects: &mut Vec<Effect>) {
        if self.state == ConnectionState::Disconnected && self.timer.is_none() {
            return;
        }
        self.epoch += 1;
        self.timer = None;
        self.retry_count = 0;
        self.state = ConnectionState::Disconnected;
        effects.push(Effect::CancelTimer);
        effects.push(Effect::Teardown);
        effects.push(Effect::ResetStreams);
    }

    /// An attempt result counts only while that attempt is the one running.
    fn accepts_attempt_result(&self, epoch: u64) -> bool {
        epoch == self.epoch
            && self.state.is_pending()
            && self.pending_timer() != Some(TimerKind::Backoff)
    }

    fn on_connected(&mut self, effects: &mut Vec<Effect>) {
        self.state = ConnectionState::Connected;
        self.retry_count = 0;
        if self.timer.take().is_some() {
            effects.push(Effect::CancelTimer);
        }
    }

    fn on_timer(&mut self, generation: u64, effects: &mut Vec<Effect>) {
        let timer = match self.timer {
            Some(t) if t.generation == generation => t,
            _ => {
                debug!(generation, "ignoring superseded timer");
                return;
            }
        };
        self.timer = None;

        match timer.kind {
            TimerKind::Watchdog => {
                let timeout_ms = self.config.retry.connect_watchdog_ms;
                warn!(timeout_ms, state = %self.state, "connect watchdog fired");
                self.last_error = Some(SessionError::ConnectionTimeout { timeout_ms });
                self.fail_attempt(effects);
            }
            TimerKind::Backoff => self.begin_attempt(effects),
        }
    }

    /// Handles connectivity events of the joined session.
    ///
    /// A voluntary remote disconnect ends in `Disconnected` like `end()`, but
    /// unlike `end()` it does not emit [`Effect::ResetStreams`]: transcripts
    /// and citations stay readable until the next `start()` clears them.
    fn on_transport(&mut self, event: ConnectionEvent, effects: &mut Vec<Effect>) {
        match (self.state, event) {
            (ConnectionState::Connected, ConnectionEvent::Reconnecting) => {
                self.state = ConnectionState::Reconnecting;
                self.arm(TimerKind::Watchdog, self.config.retry.watchdog(), effects);
            }
            (ConnectionState::Reconnecting, ConnectionEvent::Reconnected) => {
                self.on_connected(effects);
            }
            (state, ConnectionEvent::Disconnected(reason)) if state.is_active() => {
                if reason.is_voluntary() {
                    info!(%reason, "remote ended the session");
                    self.epoch += 1;
                    self.timer = None;
                    self.retry_count = 0;
                    self.state = ConnectionState::Disconnected;
                    effects.push(Effect::CancelTimer);
                    effects.push(Effect::Teardown);
                    return;
                }
                if state == ConnectionState::Connected {
                    self.state = ConnectionState::Reconnecting;
                }
                self.last_error = Some(SessionError::TransportDropped(reason.to_string()));
                self.fail_attempt(effects);
            }
            (state, event) => {
                debug!(%state, ?event, "transport event has no effect in this state");
            }
        }
    }

    fn begin_attempt(&mut self, effects: &mut Vec<Effect>) {
        self.epoch += 1;
        self.attempts += 1;
        let identity = SessionIdentity::fresh(&self.config);
        info!(
            attempt = self.attempts,
            room = %identity.room_name,
            participant = %identity.participant_name,
            "starting connection attempt"
        );
        self.identity = Some(identity.clone());
        effects.push(Effect::BeginAttempt {
            epoch: self.epoch,
            identity,
        });
        self.arm(TimerKind::Watchdog, self.config.retry.watchdog(), effects);
    }

    /// Retry policy shared by every kind of attempt failure.
    fn fail_attempt(&mut self, effects: &mut Vec<Effect>) {
        self.epoch += 1;
        if self.timer.take().is_some() {
            effects.push(Effect::CancelTimer);
        }
        effects.push(Effect::Teardown);

        if self.retry_count < self.config.retry.max_retries {
            self.retry_count += 1;
            let delay = self.config.retry.backoff(self.retry_count);
            info!(
                retry = self.retry_count,
                delay_ms = delay.as_millis() as u64,
                "scheduling connection retry"
            );
            self.arm(TimerKind::Backoff, delay, effects);
        } else {
            let last = self
                .last_error
                .take()
                .unwrap_or(SessionError::ConnectionTimeout {
                    timeout_ms: self.config.retry.connect_watchdog_ms,
                });
            warn!(attempts = self.attempts, error = %last, "retry budget exhausted");
            self.last_error = Some(SessionError::ConnectionFailed {
                attempts: self.attempts,
                last: Box::new(last),
            });
            self.state = ConnectionState::Failed;
        }
    }

    fn arm(&mut self, kind: TimerKind, after: Duration, effects: &mut Vec<Effect>) {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.timer = Some(PendingTimer { generation, kind });
        effects.push(Effect::ArmTimer {
            generation,
            kind,
            after,
        });
    }
}
