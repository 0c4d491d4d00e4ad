//! Client stream consumer
//!
//! Owns the conversation state machine. Submitting a turn appends the user
//! message and an empty streaming placeholder before any network activity,
//! then a spawned task drives the relay response: chunks are decoded into
//! payloads, fragments are appended to the placeholder in arrival order
//! through the history store, and every update is republished as a
//! `ChatEvent`. The task always leaves the placeholder in a terminal state,
//! whether the stream completed, failed, broke mid-transfer, or was
//! cancelled by the user.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use muse_core::history::HistoryStore;
use muse_core::message::Message;
use muse_core::sse::{delta_fragment, is_terminator, SseLineDecoder};
use muse_core::wire::{ChatRequest, HISTORY_WINDOW};
use muse_core::{MuseError, MuseResult};

use crate::auth::TokenProvider;
use crate::events::ChatEvent;

/// Fixed user-facing text for failed requests. Upstream detail never
/// reaches the conversation.
pub const STREAM_ERROR_MESSAGE: &str =
    "Sorry, something went wrong while generating a reply. Please try again.";

/// Chat session settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Relay chat endpoint, e.g. `http://localhost:8080/api/chat`
    pub relay_url: String,
    /// Persona identifier sent as `ai_name`
    pub persona: String,
}

/// How one read loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
enum StreamOutcome {
    /// Upstream stream drained to its end
    Completed,
    /// The user aborted mid-stream
    Cancelled,
    /// The connection dropped mid-transfer
    Interrupted(String),
    /// The request itself failed (non-success status or send error)
    Failed,
}

struct ActiveStream {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// One conversation's consumer state machine
pub struct ChatSession {
    config: SessionConfig,
    http: reqwest::Client,
    auth: Option<Arc<dyn TokenProvider>>,
    history: Arc<Mutex<HistoryStore>>,
    events: UnboundedSender<ChatEvent>,
    active: Option<ActiveStream>,
}

impl ChatSession {
    /// Create a session and the receiver for its ordered state updates
    pub fn new(
        config: SessionConfig,
        history: HistoryStore,
    ) -> (Self, UnboundedReceiver<ChatEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                config,
                http: reqwest::Client::new(),
                auth: None,
                history: Arc::new(Mutex::new(history)),
                events,
                active: None,
            },
            receiver,
        )
    }

    /// Attach the authentication collaborator
    pub fn with_auth(mut self, auth: Arc<dyn TokenProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Shared handle to the conversation state
    pub fn history(&self) -> Arc<Mutex<HistoryStore>> {
        self.history.clone()
    }

    /// True while a reply stream is in flight
    pub fn is_streaming(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    /// Abort the in-flight stream, if any.
    ///
    /// The read task finalizes the placeholder with whatever content has
    /// arrived, flagged cancelled; partial answers stay visible.
    pub fn cancel(&self) {
        if let Some(active) = &self.active {
            active.token.cancel();
        }
    }

    /// Submit a user turn; returns the id of the assistant placeholder the
    /// streamed reply will fill.
    ///
    /// Only one stream may be outstanding per conversation. A second send
    /// while one is active is rejected rather than queued, which keeps a
    /// single writer on the placeholder; callers who want takeover
    /// semantics cancel first.
    pub async fn send(
        &mut self,
        input: &str,
        project_context: Option<&str>,
    ) -> MuseResult<String> {
        let input = input.trim();
        if input.is_empty() {
            return Err(MuseError::validation("message must not be empty"));
        }
        if self.is_streaming() {
            return Err(MuseError::validation(
                "a reply is already streaming; cancel it first",
            ));
        }

        let placeholder = Message::assistant_placeholder();
        let placeholder_id = placeholder.id.clone();

        // Window the request from the conversation as it stood before this
        // turn, then append user message and placeholder in one step so the
        // UI has an anchor before any network activity.
        let trailing = {
            let mut history = self.history.lock().await;
            let trailing = history.recent(HISTORY_WINDOW);

            let user = Message::user(input);
            history.append(user.clone()).await;
            self.publish(ChatEvent::Appended(user));

            history.append(placeholder.clone()).await;
            self.publish(ChatEvent::Appended(placeholder));

            trailing
        };

        let request = ChatRequest {
            message: input.to_string(),
            ai_name: self.config.persona.clone(),
            project_context: project_context.map(str::to_string),
            history: trailing,
        };

        let token = CancellationToken::new();
        let task = StreamTask {
            http: self.http.clone(),
            url: self.config.relay_url.clone(),
            auth: self.auth.clone(),
            request,
            history: self.history.clone(),
            events: self.events.clone(),
            token: token.clone(),
            message_id: placeholder_id.clone(),
        };
        let handle = tokio::spawn(task.run());
        self.active = Some(ActiveStream { token, handle });

        Ok(placeholder_id)
    }

    fn publish(&self, event: ChatEvent) {
        // the receiver may be gone during shutdown; dropped events are fine
        let _ = self.events.send(event);
    }
}

/// One in-flight relay request and the state it may touch
struct StreamTask {
    http: reqwest::Client,
    url: String,
    auth: Option<Arc<dyn TokenProvider>>,
    request: ChatRequest,
    history: Arc<Mutex<HistoryStore>>,
    events: UnboundedSender<ChatEvent>,
    token: CancellationToken,
    message_id: String,
}

impl StreamTask {
    /// Issue the request and drive the stream to a terminal state.
    ///
    /// Every failure is absorbed here and turned into a finalized message;
    /// nothing propagates out of the spawned task.
    async fn run(self) {
        let mut builder = self.http.post(&self.url).json(&self.request);
        if let Some(token) = self.auth.as_ref().and_then(|auth| auth.bearer_token()) {
            builder = builder.bearer_auth(token);
        }

        let response = tokio::select! {
            _ = self.token.cancelled() => {
                self.finalize(StreamOutcome::Cancelled).await;
                return;
            }
            response = builder.send() => response,
        };

        let outcome = match response {
            Ok(response) if response.status().is_success() => {
                self.consume(response.bytes_stream()).await
            }
            Ok(response) => {
                warn!(status = %response.status(), "relay rejected the chat request");
                StreamOutcome::Failed
            }
            Err(error) => {
                warn!("relay request failed: {}", error);
                StreamOutcome::Failed
            }
        };

        self.finalize(outcome).await;
    }

    /// Read loop: decode chunks into payloads and apply fragments in
    /// arrival order.
    ///
    /// The cancellation token is checked at every suspension point;
    /// aborting drops the in-flight read and, with it, the connection.
    async fn consume<B, E>(&self, stream: impl Stream<Item = Result<B, E>>) -> StreamOutcome
    where
        B: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        let mut stream = std::pin::pin!(stream);
        let mut decoder = SseLineDecoder::new();

        loop {
            let next = tokio::select! {
                _ = self.token.cancelled() => return StreamOutcome::Cancelled,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    for payload in decoder.feed(chunk.as_ref()) {
                        if is_terminator(&payload) {
                            continue;
                        }
                        let Some(fragment) = delta_fragment(&payload) else {
                            continue;
                        };
                        if fragment.is_empty() {
                            continue;
                        }
                        self.apply_fragment(&fragment).await;
                    }
                }
                Some(Err(error)) => return StreamOutcome::Interrupted(error.to_string()),
                None => return StreamOutcome::Completed,
            }
        }
    }

    async fn apply_fragment(&self, fragment: &str) {
        let mut history = self.history.lock().await;
        match history.append_fragment(&self.message_id, fragment).await {
            Ok(updated) => {
                let _ = self.events.send(ChatEvent::Updated(updated));
            }
            Err(error) => warn!("failed to apply stream fragment: {}", error),
        }
    }

    /// Leave the placeholder in a terminal state no matter how the stream
    /// ended; it must never stay `is_streaming`.
    async fn finalize(&self, outcome: StreamOutcome) {
        let mut history = self.history.lock().await;
        let result = history
            .update(&self.message_id, |message| {
                message.is_streaming = false;
                match &outcome {
                    StreamOutcome::Completed => {}
                    StreamOutcome::Cancelled => {
                        message.is_cancelled = Some(true);
                    }
                    StreamOutcome::Interrupted(_) => {
                        // keep the partial answer; only an empty one is
                        // presented as an error
                        if message.content.is_empty() {
                            message.content = STREAM_ERROR_MESSAGE.to_string();
                            message.is_error = Some(true);
                        }
                    }
                    StreamOutcome::Failed => {
                        message.content = STREAM_ERROR_MESSAGE.to_string();
                        message.is_error = Some(true);
                    }
                }
            })
            .await;

        match result {
            Ok(updated) => {
                debug!(?outcome, "stream finalized");
                let _ = self.events.send(ChatEvent::Updated(updated));
            }
            Err(error) => warn!("failed to finalize streamed message: {}", error),
        }
    }
}
