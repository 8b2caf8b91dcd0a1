//! Cross-context synchronization channel
//!
//! Pub/sub between same-origin browsing contexts of one logical session
//! (interviewer and interviewee screens). Messages are JSON objects tagged by
//! `type` with a `publishedAt` stamp added at publish time, never by the
//! receiver.
//!
//! Two interchangeable transports, selected by capability probing at
//! construction: a live broadcast hub that delivers to every other endpoint,
//! and a durable-storage fallback that keeps a single last-write-wins key.
//! The fallback delivers at most the latest message to a context that was not
//! listening at publish time; receivers treat messages as present-or-absent.
//! Malformed or unknown-`type` payloads are dropped silently: the channel
//! must never crash a consumer on a peer's message.

use crate::types::{MetricsSample, PolicyEvent};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// Shared key / channel name for one logical interview session
pub const CHANNEL_NAME: &str = "moodlens-interview";

/// Who produced a broadcast question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionSource {
    Automated,
    Manual,
}

/// Discrete proctor-side signal relayed from the interviewee context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ProctorSignal {
    /// Interviewee tab or window was hidden
    TabHidden,
    /// Interviewee window lost focus
    FocusLost,
}

/// Wire messages exchanged between contexts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncMessage {
    /// Interviewer pushed a new question to the interviewee screen
    #[serde(rename = "question:update")]
    QuestionUpdate {
        question: String,
        source: QuestionSource,
    },
    /// Interviewer ended the session
    #[serde(rename = "session:end")]
    SessionEnd,
    /// Interviewee emitted a metrics sample
    #[serde(rename = "metrics:update")]
    MetricsUpdate { metrics: MetricsSample },
    /// Interviewee runtime status changed
    #[serde(rename = "interviewee:status")]
    IntervieweeStatus { status_text: String },
    /// Interviewee raised a proctor signal
    #[serde(rename = "proctor:event")]
    ProctorEvent {
        signal: ProctorSignal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        policy_event: Option<PolicyEvent>,
    },
}

/// A wire message with its publish stamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Stamped by the publisher (epoch milliseconds)
    #[serde(rename = "publishedAt")]
    pub published_at: i64,
    #[serde(flatten)]
    pub message: SyncMessage,
}

impl Envelope {
    /// Decode a raw payload. Malformed JSON and unknown `type` values both
    /// yield `None`; neither is an error for the receiver.
    pub fn decode(raw: &str) -> Option<Envelope> {
        match serde_json::from_str(raw) {
            Ok(envelope) => Some(envelope),
            Err(err) => {
                debug!("dropping malformed sync payload: {err}");
                None
            }
        }
    }
}

/// Transport backend behind a [`SyncChannel`]
pub trait SyncTransport {
    /// Deliver a raw payload to peer contexts
    fn send(&mut self, raw: &str);
    /// Drain payloads received since the last call
    fn drain(&mut self) -> Vec<String>;
    /// Release transport resources
    fn close(&mut self);
}

#[derive(Default)]
struct HubState {
    next_id: u64,
    inboxes: HashMap<u64, VecDeque<String>>,
}

/// In-process broadcast hub: the live transport.
///
/// Every endpoint receives what every other endpoint sends; a sender never
/// hears its own messages.
#[derive(Clone, Default)]
pub struct BroadcastHub {
    state: Rc<RefCell<HubState>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new endpoint on this hub
    pub fn endpoint(&self) -> BroadcastEndpoint {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.inboxes.insert(id, VecDeque::new());
        BroadcastEndpoint {
            state: Rc::clone(&self.state),
            id,
        }
    }
}

/// One context's connection to a [`BroadcastHub`]
pub struct BroadcastEndpoint {
    state: Rc<RefCell<HubState>>,
    id: u64,
}

impl SyncTransport for BroadcastEndpoint {
    fn send(&mut self, raw: &str) {
        let mut state = self.state.borrow_mut();
        let own_id = self.id;
        for (id, inbox) in state.inboxes.iter_mut() {
            if *id != own_id {
                inbox.push_back(raw.to_string());
            }
        }
    }

    fn drain(&mut self) -> Vec<String> {
        let mut state = self.state.borrow_mut();
        match state.inboxes.get_mut(&self.id) {
            Some(inbox) => inbox.drain(..).collect(),
            None => Vec::new(),
        }
    }

    fn close(&mut self) {
        self.state.borrow_mut().inboxes.remove(&self.id);
    }
}

#[derive(Default)]
struct StorageState {
    revision: u64,
    value: Option<String>,
}

/// Shared durable-storage key: the fallback transport.
///
/// A single last-write-wins slot. Each endpoint observes at most the latest
/// value written since it last looked; there is no history or replay.
#[derive(Clone, Default)]
pub struct StorageCell {
    state: Rc<RefCell<StorageState>>,
}

impl StorageCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an endpoint observing this cell
    pub fn endpoint(&self) -> StorageEndpoint {
        StorageEndpoint {
            state: Rc::clone(&self.state),
            last_seen: self.state.borrow().revision,
        }
    }

    /// Write a raw value directly, bypassing any channel. Exists so tests and
    /// hosts can model a peer writing garbage to the shared key.
    pub fn write_raw(&self, raw: &str) {
        let mut state = self.state.borrow_mut();
        state.revision += 1;
        state.value = Some(raw.to_string());
    }
}

/// One context's view of a [`StorageCell`]
pub struct StorageEndpoint {
    state: Rc<RefCell<StorageState>>,
    last_seen: u64,
}

impl SyncTransport for StorageEndpoint {
    fn send(&mut self, raw: &str) {
        let mut state = self.state.borrow_mut();
        state.revision += 1;
        state.value = Some(raw.to_string());
        // A writer does not re-observe its own write.
        self.last_seen = state.revision;
    }

    fn drain(&mut self) -> Vec<String> {
        let state = self.state.borrow();
        if state.revision == self.last_seen {
            return Vec::new();
        }
        self.last_seen = state.revision;
        state.value.iter().cloned().collect()
    }

    fn close(&mut self) {}
}

/// Cross-context pub/sub channel for one session.
///
/// `publish` stamps `publishedAt` and is fire-and-forget; `poll` drains and
/// decodes inbound payloads, silently dropping anything malformed. After
/// `close` the channel is a silent sink.
pub struct SyncChannel {
    transport: Box<dyn SyncTransport>,
    closed: bool,
}

impl SyncChannel {
    /// Build a channel over an explicit transport
    pub fn with_transport(transport: Box<dyn SyncTransport>) -> Self {
        Self {
            transport,
            closed: false,
        }
    }

    /// Capability-probing constructor: prefer the live broadcast hub, fall
    /// back to the shared storage cell when no hub is available.
    pub fn connect(hub: Option<&BroadcastHub>, storage: &StorageCell) -> Self {
        match hub {
            Some(hub) => Self::with_transport(Box::new(hub.endpoint())),
            None => Self::with_transport(Box::new(storage.endpoint())),
        }
    }

    /// Stamp and deliver a message to every other context. No-op after close.
    pub fn publish(&mut self, message: SyncMessage, now_ms: i64) {
        if self.closed {
            return;
        }
        let envelope = Envelope {
            published_at: now_ms,
            message,
        };
        match serde_json::to_string(&envelope) {
            Ok(raw) => self.transport.send(&raw),
            Err(err) => debug!("dropping unencodable sync message: {err}"),
        }
    }

    /// Drain inbound messages, dropping malformed payloads silently
    pub fn poll(&mut self) -> Vec<Envelope> {
        if self.closed {
            return Vec::new();
        }
        self.transport
            .drain()
            .iter()
            .filter_map(|raw| Envelope::decode(raw))
            .collect()
    }

    /// Release transport resources; the channel becomes a silent sink
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.transport.close();
        self.closed = true;
    }
}
