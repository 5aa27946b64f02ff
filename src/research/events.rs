//! Progress event delivery
//!
//! The pipeline pushes immutable [`RunEvent`]s through an [`EventSink`] the
//! caller injects. Sinks must not block: emission is fire-and-continue.

use crate::types::{AgentRole, EventPayload, ProgressEvent, RunEvent, RunOutcome};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Receiver of a run's event stream.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RunEvent);
}

impl<F> EventSink for F
where
    F: Fn(RunEvent) + Send + Sync,
{
    fn emit(&self, event: RunEvent) {
        self(event)
    }
}

/// Forwards events into an unbounded channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: RunEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("event receiver dropped; discarding event");
        }
    }
}

/// Keeps the whole event log in memory.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<RunEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().clone()
    }

    pub fn progress(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                RunEvent::Progress(progress) => Some(progress.clone()),
                RunEvent::Finished(_) => None,
            })
            .collect()
    }

    /// The last outcome received, if any.
    pub fn outcome(&self) -> Option<RunOutcome> {
        self.events.lock().iter().rev().find_map(|event| match event {
            RunEvent::Finished(outcome) => Some(outcome.clone()),
            RunEvent::Progress(_) => None,
        })
    }

    pub fn messages(&self) -> Vec<String> {
        self.progress().into_iter().map(|p| p.message).collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: RunEvent) {
        self.events.lock().push(event);
    }
}

struct EmitState {
    seq: u64,
    last_timestamp: DateTime<Utc>,
    finished: bool,
}

/// Stamps events with sequence numbers and non-decreasing timestamps and
/// guarantees nothing is emitted after the outcome.
///
/// The lock is held only while stamping and handing the event to the sink,
/// never across an await, so sequence order, timestamp order and delivery
/// order always agree.
pub(crate) struct EventEmitter {
    run_id: Uuid,
    sink: Arc<dyn EventSink>,
    state: Mutex<EmitState>,
}

impl EventEmitter {
    pub(crate) fn new(run_id: Uuid, sink: Arc<dyn EventSink>) -> Self {
        Self {
            run_id,
            sink,
            state: Mutex::new(EmitState {
                seq: 0,
                last_timestamp: DateTime::<Utc>::MIN_UTC,
                finished: false,
            }),
        }
    }

    pub(crate) fn progress(&self, role: AgentRole, message: impl Into<String>) {
        self.push(role, message.into(), None);
    }

    pub(crate) fn progress_with(
        &self,
        role: AgentRole,
        message: impl Into<String>,
        payload: EventPayload,
    ) {
        self.push(role, message.into(), Some(payload));
    }

    fn push(&self, role: AgentRole, message: String, payload: Option<EventPayload>) {
        let mut state = self.state.lock();
        if state.finished {
            tracing::warn!(run_id = %self.run_id, %role, "dropping progress event after run outcome");
            return;
        }

        let now = Utc::now();
        let timestamp = if now < state.last_timestamp {
            state.last_timestamp
        } else {
            now
        };
        state.last_timestamp = timestamp;

        let event = ProgressEvent {
            run_id: self.run_id,
            seq: state.seq,
            role,
            message,
            payload,
            timestamp,
        };
        state.seq += 1;

        tracing::debug!(run_id = %self.run_id, seq = event.seq, %role, "{}", event.message);
        self.sink.emit(RunEvent::Progress(event));
    }

    /// Emit the terminal outcome. Returns `false` if one was already emitted.
    pub(crate) fn finish(&self, outcome: RunOutcome) -> bool {
        let mut state = self.state.lock();
        if state.finished {
            tracing::error!(run_id = %self.run_id, "attempted to emit a second run outcome");
            return false;
        }
        state.finished = true;
        self.sink.emit(RunEvent::Finished(outcome));
        true
    }
}
