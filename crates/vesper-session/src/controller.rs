//! Async driver for [`Session`].

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::identity::SessionIdentity;
use crate::machine::{ConnectionEvent, Effect, Input, Session, SessionSnapshot, TimerKind};
use crate::transport::{MediaTransport, TransportEvent};
use serde::Serialize;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};
use vesper_transcript::{CitationSet, Reconciler, TranscriptSnapshot, TranscriptUpdate};
use vesper_types::{ConnectionState, DisconnectReason};
use vesper_voice::CredentialProvider;

/// What the presentation layer renders: both transcript streams and the
/// current citations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamSnapshot {
    pub transcripts: TranscriptSnapshot,
    pub citations: CitationSet,
}

struct Core {
    session: Session,
    attempt_task: Option<JoinHandle<()>>,
    timer_task: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct Streams {
    reconciler: Reconciler,
    citations: CitationSet,
}

impl Streams {
    fn snapshot(&self) -> StreamSnapshot {
        StreamSnapshot {
            transcripts: self.reconciler.snapshot(),
            citations: self.citations.clone(),
        }
    }
}

struct Inner {
    /// Lock order: `core` before `streams`.
    core: Mutex<Core>,
    streams: Mutex<Streams>,
    state_tx: watch::Sender<SessionSnapshot>,
    streams_tx: watch::Sender<StreamSnapshot>,
    credentials: Arc<dyn CredentialProvider>,
    transport: Arc<dyn MediaTransport>,
    clock_origin: Instant,
}

/// Drives one [`Session`] on the current Tokio runtime.
///
/// Cloning yields another handle to the same session. Methods that start
/// work spawn tasks and must be called from within a runtime.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        credentials: Arc<dyn CredentialProvider>,
        transport: Arc<dyn MediaTransport>,
    ) -> Self {
        let session = Session::new(config);
        let (state_tx, _) = watch::channel(session.snapshot());
        let (streams_tx, _) = watch::channel(StreamSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                core: Mutex::new(Core {
                    session,
                    attempt_task: None,
                    timer_task: None,
                }),
                streams: Mutex::new(Streams::default()),
                state_tx,
                streams_tx,
                credentials,
                transport,
                clock_origin: Instant::now(),
            }),
        }
    }

    /// Starts a new session, ending the active one first.
    pub fn start(&self) {
        self.inner.dispatch(Input::Start);
    }

    /// Ends the session immediately. Pending attempts and timers are
    /// cancelled; calling it again is a no-op.
    pub fn end(&self) {
        self.inner.dispatch(Input::End);
    }

    /// Starts a session and waits until it connects, fails, or is ended.
    pub async fn connect(&self) -> Result<SessionSnapshot, SessionError> {
        self.start();
        let settled = self.wait_until(|s| !s.state.is_pending()).await;

        match settled.state {
            ConnectionState::Connected => Ok(settled),
            ConnectionState::Failed => Err(settled
                .last_error
                .unwrap_or(SessionError::Ended)),
            _ => Err(SessionError::Ended),
        }
    }

    /// Waits for the first state snapshot matching `predicate`, starting
    /// with the current one.
    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> SessionSnapshot {
        let mut rx = self.subscribe_state();
        // `self` keeps the sender alive, so the channel cannot close here.
        let matched = match rx.wait_for(predicate).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        matched
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state_tx.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state_tx.borrow().state
    }

    pub fn last_error(&self) -> Option<SessionError> {
        self.inner.state_tx.borrow().last_error.clone()
    }

    /// Receives a new snapshot after every state-changing input.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state_tx.subscribe()
    }

    /// Receives a new snapshot whenever transcripts or citations change.
    pub fn subscribe_streams(&self) -> watch::Receiver<StreamSnapshot> {
        self.inner.streams_tx.subscribe()
    }

    pub fn streams(&self) -> StreamSnapshot {
        self.inner.streams_tx.borrow().clone()
    }
}

impl Inner {
    /// Applies `input` to the session and executes the resulting effects.
    fn dispatch(self: &Arc<Self>, input: Input) {
        let mut core = self.core.lock().unwrap_or_else(|e| e.into_inner());
        let effects = core.session.apply(input);
        for effect in effects {
            self.execute(&mut core, effect);
        }
        let snapshot = core.session.snapshot();
        self.state_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn execute(self: &Arc<Self>, core: &mut Core, effect: Effect) {
        match effect {
            Effect::Teardown => {
                if let Some(task) = core.attempt_task.take() {
                    task.abort();
                }
                self.transport.leave();
            }
            Effect::ResetStreams => {
                let mut streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
                streams.reconciler.clear();
                streams.citations.clear();
                self.publish_streams(&streams);
            }
            Effect::BeginAttempt { epoch, identity } => {
                if let Some(task) = core.attempt_task.take() {
                    task.abort();
                }
                core.attempt_task = Some(self.spawn_attempt(epoch, identity));
            }
            Effect::ArmTimer {
                generation,
                kind,
                after,
            } => {
                if let Some(task) = core.timer_task.take() {
                    task.abort();
                }
                core.timer_task = Some(self.spawn_timer(generation, kind, after));
            }
            Effect::CancelTimer => {
                if let Some(task) = core.timer_task.take() {
                    task.abort();
                }
            }
        }
    }

    fn spawn_timer(self: &Arc<Self>, generation: u64, kind: TimerKind, after: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(inner) = weak.upgrade() {
                debug!(generation, ?kind, "timer elapsed");
                inner.dispatch(Input::TimerFired { generation });
            }
        })
    }

    fn spawn_attempt(self: &Arc<Self>, epoch: u64, identity: SessionIdentity) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let credentials = Arc::clone(&self.credentials);
        let transport = Arc::clone(&self.transport);
        tokio::spawn(run_attempt(weak, epoch, identity, credentials, transport))
    }

    fn publish_streams(&self, streams: &Streams) {
        self.streams_tx.send_replace(streams.snapshot());
    }

    fn is_current(&self, epoch: u64) -> bool {
        let core = self.core.lock().unwrap_or_else(|e| e.into_inner());
        core.session.epoch() == epoch
    }

    fn arrival_ms(&self) -> u64 {
        self.clock_origin.elapsed().as_millis() as u64
    }

    /// Routes one event of the session joined by attempt `epoch`.
    fn handle_transport_event(self: &Arc<Self>, epoch: u64, event: TransportEvent) {
        let connection_event = match event {
            TransportEvent::Reconnecting => ConnectionEvent::Reconnecting,
            TransportEvent::Reconnected => ConnectionEvent::Reconnected,
            TransportEvent::Disconnected(reason) => ConnectionEvent::Disconnected(reason),
            TransportEvent::Transcription { role, fragments } => {
                let arrival_ms = self.arrival_ms();
                self.with_current_streams(epoch, |streams| {
                    let mut changed = false;
                    for fragment in fragments {
                        let update =
                            TranscriptUpdate::new(role, fragment.id, fragment.text, fragment.is_final);
                        changed |= streams.reconciler.apply(update, arrival_ms);
                    }
                    changed
                });
                return;
            }
            TransportEvent::Data { topic, payload } => {
                self.with_current_streams(epoch, |streams| {
                    streams.citations.handle_data(topic.as_deref(), &payload)
                });
                return;
            }
        };
        self.dispatch(Input::Transport {
            epoch,
            event: connection_event,
        });
    }

    /// Runs `update` against the streams if `epoch` is still current, and
    /// publishes a snapshot when it reports a change.
    fn with_current_streams(&self, epoch: u64, update: impl FnOnce(&mut Streams) -> bool) {
        let core = self.core.lock().unwrap_or_else(|e| e.into_inner());
        if core.session.epoch() != epoch {
            debug!(epoch, "dropping stream event from superseded attempt");
            return;
        }
        let mut streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
        if update(&mut streams) {
            self.publish_streams(&streams);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let core = self.core.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = core.attempt_task.take() {
            task.abort();
        }
        if let Some(task) = core.timer_task.take() {
            task.abort();
        }
        if core.session.state().is_active() {
            self.transport.leave();
        }
    }
}

/// One connection attempt: fetch a credential, join, then pump the joined
/// session's events until the stream ends or the task is aborted.
async fn run_attempt(
    weak: Weak<Inner>,
    epoch: u64,
    identity: SessionIdentity,
    credentials: Arc<dyn CredentialProvider>,
    transport: Arc<dyn MediaTransport>,
) {
    let joined = async {
        let credential = credentials
            .fetch_credential(&identity.credential_request())
            .await?;
        let events = transport.join(&credential, &identity).await?;
        Ok::<_, SessionError>(events)
    }
    .await;

    let mut events = match joined {
        Ok(events) => events,
        Err(error) => {
            if let Some(inner) = weak.upgrade() {
                inner.dispatch(Input::AttemptFailed { epoch, error });
            }
            return;
        }
    };

    match weak.upgrade() {
        Some(inner) => {
            inner.dispatch(Input::AttemptSucceeded { epoch });
            if !inner.is_current(epoch) {
                return;
            }
        }
        None => {
            transport.leave();
            return;
        }
    }

    while let Some(event) = events.recv().await {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        inner.handle_transport_event(epoch, event);
    }

    warn!(epoch, "media session event stream closed");
    if let Some(inner) = weak.upgrade() {
        inner.dispatch(Input::Transport {
            epoch,
            event: ConnectionEvent::Disconnected(DisconnectReason::TransportFailure(
                "event stream closed".to_string(),
            )),
        });
    }
}
