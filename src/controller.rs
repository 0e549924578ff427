//! Conversation controller: one request/response cycle at a time.
//!
//! ```text
//! Idle --submit(text)--> Sending --stream ended / request failed--> Idle
//! ```
//!
//! `submit` borrows the controller mutably for the whole cycle, so a second
//! submission cannot start until the first has returned to `Idle`.

use tracing::{debug, error, info, warn};

use crate::conversation::{Conversation, InteractionState, MessageHandle, Role};
use crate::decoder::{DecodeStats, StreamDecoder};
use crate::render::RenderSink;
use crate::transport::Transport;

/// Shown when the request fails before any response body arrives.
pub const APOLOGY_TEXT: &str = "Sorry, connection error.";

/// Shown in the bot message until the first content arrives.
pub const PLACEHOLDER_TEXT: &str = "...";

/// How a `submit` call ended. Every variant leaves the controller idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing happened.
    Ignored,
    /// The response stream ended normally.
    Completed { events: usize },
    /// No response body; the apology message was appended.
    RequestFailed,
    /// Reading the body failed part way; partial text was kept.
    StreamFailed { events: usize },
}

pub struct Controller<T> {
    transport: T,
    conversation: Conversation,
    state: InteractionState,
    last_stats: Option<DecodeStats>,
}

impl<T: Transport> Controller<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            conversation: Conversation::new(),
            state: InteractionState::Idle,
            last_stats: None,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    /// Decoder counters from the most recent streamed response.
    pub fn last_stats(&self) -> Option<DecodeStats> {
        self.last_stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `text` and stream the reply into the conversation and `sink`.
    pub async fn submit<S: RenderSink>(&mut self, text: &str, sink: &mut S) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Ignored;
        }

        self.conversation.push(Role::User, text);
        sink.append_message(Role::User, text);
        sink.scroll_to_latest();
        self.state = InteractionState::Sending;
        sink.set_input_enabled(false);

        let outcome = self.exchange(text, sink).await;

        self.conversation.seal();
        self.state = InteractionState::Idle;
        sink.set_input_enabled(true);
        if !matches!(outcome, SubmitOutcome::RequestFailed) {
            sink.focus_input();
        }
        outcome
    }

    async fn exchange<S: RenderSink>(&mut self, text: &str, sink: &mut S) -> SubmitOutcome {
        let body = match self.transport.send(text).await {
            Ok(body) => body,
            Err(e) => {
                if e.is_request_failure() {
                    warn!(error = %e, "chat request failed");
                } else {
                    error!(error = %e, "transport failed before the response body");
                }
                self.conversation.push(Role::Bot, APOLOGY_TEXT);
                sink.append_message(Role::Bot, APOLOGY_TEXT);
                sink.scroll_to_latest();
                return SubmitOutcome::RequestFailed;
            }
        };

        self.conversation.open_bot();
        let handle: MessageHandle = sink.append_message(Role::Bot, PLACEHOLDER_TEXT);
        sink.scroll_to_latest();

        let mut decoder = StreamDecoder::new(body);
        let mut events = 0;
        let mut failed = false;
        while let Some(next) = decoder.next_event().await {
            match next {
                Ok(event) => {
                    events += 1;
                    if let Some(full) = self.conversation.append_to_open(&event.content) {
                        sink.update_last_message(handle, full.trim());
                        sink.scroll_to_latest();
                    }
                }
                Err(e) => {
                    warn!(error = %e, events, "response stream interrupted");
                    failed = true;
                }
            }
        }

        let stats = decoder.stats();
        self.last_stats = Some(stats);
        debug!(?stats, "decode finished");

        if failed {
            SubmitOutcome::StreamFailed { events }
        } else {
            info!(events, "response complete");
            SubmitOutcome::Completed { events }
        }
    }
}
