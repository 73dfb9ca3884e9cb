//! Conversation state machine and outbound-request lifecycle.
//!
//! The controller is owned by a single writer (the UI loop or the one-shot
//! `ask` command). Requests run on a spawned task and hand their raw result
//! back over a oneshot channel, which is drained by [`ConversationController::poll_reply`]
//! or awaited by [`ConversationController::settle`].

use crate::error::ChatError;
use crate::events::ChatMessage;
use crate::llm::{CompletionEndpoint, RATE_LIMIT_NOTICE, RawReply};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

/// Everything the presentation layer renders
#[derive(Debug, Default)]
pub struct ConversationState {
    log: Vec<ChatMessage>,
    pending_input: String,
    awaiting_reply: bool,
}

impl ConversationState {
    pub fn log(&self) -> &[ChatMessage] {
        &self.log
    }

    pub fn awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }
}

/// What `submit` did with the current draft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The draft was logged and a request is in flight
    Dispatched,
    /// Nothing to send
    EmptyDraft,
    /// A request is already in flight; the draft is kept
    Busy,
}

type PendingReply = oneshot::Receiver<Result<RawReply, ChatError>>;

pub struct ConversationController {
    state: ConversationState,
    endpoint: Arc<dyn CompletionEndpoint>,
    in_flight: Option<PendingReply>,
}

impl ConversationController {
    pub fn new(endpoint: Arc<dyn CompletionEndpoint>) -> Self {
        Self {
            state: ConversationState::default(),
            endpoint,
            in_flight: None,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn log(&self) -> &[ChatMessage] {
        self.state.log()
    }

    #[cfg(test)]
    pub fn draft(&self) -> &str {
        &self.state.pending_input
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.state.awaiting_reply()
    }

    /// Replace the draft. Allowed while a request is in flight.
    pub fn update_draft(&mut self, text: impl Into<String>) {
        self.state.pending_input = text.into();
    }

    /// Log the draft as a user message and dispatch it to the endpoint.
    ///
    /// Must be called from within a tokio runtime. The user message is in
    /// the log before this returns, independent of how the request ends.
    pub fn submit(&mut self) -> SubmitOutcome {
        if self.state.pending_input.is_empty() {
            return SubmitOutcome::EmptyDraft;
        }
        if self.state.awaiting_reply {
            tracing::debug!("submit ignored, a reply is still pending");
            return SubmitOutcome::Busy;
        }

        let prompt = std::mem::take(&mut self.state.pending_input);
        self.state.log.push(ChatMessage::user(prompt.clone()));
        self.state.awaiting_reply = true;

        let (tx, rx) = oneshot::channel();
        let endpoint = Arc::clone(&self.endpoint);
        tokio::spawn(async move {
            let result = endpoint.generate(&prompt).await;
            let _ = tx.send(result);
        });
        self.in_flight = Some(rx);

        SubmitOutcome::Dispatched
    }

    /// Apply the in-flight reply if it has arrived. Returns true if the state changed.
    pub fn poll_reply(&mut self) -> bool {
        let Some(rx) = self.in_flight.as_mut() else {
            return false;
        };

        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Closed) => Err(ChatError::Interrupted),
        };
        self.in_flight = None;
        self.apply_reply(result);
        true
    }

    /// Wait for the in-flight reply, if any, and apply it
    pub async fn settle(&mut self) {
        let Some(rx) = self.in_flight.take() else {
            return;
        };

        let result = rx.await.unwrap_or(Err(ChatError::Interrupted));
        self.apply_reply(result);
    }

    fn apply_reply(&mut self, result: Result<RawReply, ChatError>) {
        match result.and_then(RawReply::into_text) {
            Ok(text) => {
                tracing::info!(chars = text.chars().count(), "assistant reply received");
                self.state.log.push(ChatMessage::assistant(text));
            }
            Err(ChatError::RateLimited) => {
                tracing::warn!("completion endpoint rate limited the request");
                self.state.log.push(ChatMessage::assistant(RATE_LIMIT_NOTICE));
            }
            Err(ChatError::RequestFailed { status, body }) => {
                tracing::error!(status, %body, "completion request failed");
            }
            Err(ChatError::NoCandidates) => {
                tracing::warn!("no content returned from API");
            }
            Err(err) => {
                tracing::error!(error = %err, "error fetching completion");
            }
        }
        self.state.awaiting_reply = false;
    }
}
