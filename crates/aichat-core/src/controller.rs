//! Conversation state machine.
//!
//! The controller owns the transcript and the in-flight request. It is driven
//! from a single loop: `submit` on user action, `apply` for each reply pulled
//! from `next_reply`. Worker tasks only ever post a [`Reply`]; they never see
//! the transcript.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::dispatcher::{Dispatcher, Outcome};
use crate::state::{ChatMessage, Transcript};

pub type RequestId = u64;

/// Posted by a worker task when its dispatch finishes
#[derive(Debug)]
pub struct Reply {
    pub id: RequestId,
    pub outcome: Outcome,
}

#[derive(Debug)]
struct InFlight {
    id: RequestId,
    started: Instant,
    handle: JoinHandle<()>,
}

impl InFlight {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[derive(Debug, Default)]
enum ConversationState {
    #[default]
    Idle,
    AwaitingResponse(InFlight),
}

/// What happened to a send request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    /// Input was empty after trimming; nothing changed
    Empty,
    /// A request is already in flight; nothing changed
    Busy,
    Dispatched(RequestId),
}

pub struct Controller {
    dispatcher: Arc<Dispatcher>,
    transcript: Transcript,
    state: ConversationState,
    next_id: RequestId,
    reply_tx: mpsc::UnboundedSender<Reply>,
    reply_rx: mpsc::UnboundedReceiver<Reply>,
}

impl Controller {
    pub fn new(dispatcher: Dispatcher) -> Self {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        Self {
            dispatcher: Arc::new(dispatcher),
            transcript: Transcript::new(),
            state: ConversationState::Idle,
            next_id: 1,
            reply_tx,
            reply_rx,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, ConversationState::AwaitingResponse(_))
    }

    /// How long the current request has been waiting, if any
    pub fn elapsed(&self) -> Option<Duration> {
        match &self.state {
            ConversationState::AwaitingResponse(in_flight) => Some(in_flight.elapsed()),
            ConversationState::Idle => None,
        }
    }

    /// Start a request for `input`.
    ///
    /// Must be called from within a tokio runtime. Every trigger path goes
    /// through here, so the busy check holds even if the UI let a second
    /// send through.
    pub fn submit(&mut self, input: &str) -> SubmitStatus {
        if input.trim().is_empty() {
            return SubmitStatus::Empty;
        }
        if self.is_busy() {
            debug!("send ignored: request already in flight");
            return SubmitStatus::Busy;
        }

        let id = self.next_id;
        self.next_id += 1;

        self.transcript.push(ChatMessage::user(input));

        let dispatcher = Arc::clone(&self.dispatcher);
        let reply_tx = self.reply_tx.clone();
        let message = input.to_string();
        let handle = tokio::spawn(async move {
            let outcome = dispatcher.dispatch(&message).await;
            if reply_tx.send(Reply { id, outcome }).is_err() {
                debug!(id, "controller dropped before reply was delivered");
            }
        });

        info!(id, "request dispatched");
        self.state = ConversationState::AwaitingResponse(InFlight {
            id,
            started: Instant::now(),
            handle,
        });
        SubmitStatus::Dispatched(id)
    }

    /// Wait for the next reply posted by a worker.
    ///
    /// The controller holds a sender itself, so this only resolves when a
    /// worker actually replies.
    pub async fn next_reply(&mut self) -> Option<Reply> {
        self.reply_rx.recv().await
    }

    /// Apply a reply to the transcript and return to idle.
    ///
    /// Returns false for replies that don't belong to the in-flight request.
    pub fn apply(&mut self, reply: Reply) -> bool {
        let in_flight = match std::mem::take(&mut self.state) {
            ConversationState::AwaitingResponse(in_flight) if in_flight.id == reply.id => in_flight,
            other => {
                debug!(id = reply.id, "ignoring stale reply");
                self.state = other;
                return false;
            }
        };

        info!(
            id = reply.id,
            success = reply.outcome.is_success(),
            elapsed_ms = in_flight.elapsed().as_millis() as u64,
            "reply applied"
        );
        self.transcript.push(ChatMessage::assistant(reply.outcome.text()));
        true
    }

    /// Abort any in-flight request. Used on exit.
    pub fn shutdown(&mut self) {
        if let ConversationState::AwaitingResponse(in_flight) = std::mem::take(&mut self.state) {
            debug!(id = in_flight.id, "aborting in-flight request");
            in_flight.handle.abort();
        }
    }
}
