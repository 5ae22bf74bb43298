//! Streaming session controller.
//!
//! Orchestrates one send or regenerate per conversation: the optimistic
//! user message, the event stream, throttled commits into the store and the
//! final reconciliation of the transcript. Starting a session for a
//! conversation that already has one supersedes it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::SessionError;
use super::writer::SessionWriter;
use crate::domain::Message;
use crate::ports::{ApiResult, ByteStream, ErrorNotifier, GenerationApi, RegenerateRequest, SendRequest};
use crate::settings::SessionSettings;
use crate::store::{Action, Store, StoreError, StreamTarget};
use crate::stream::{EventStream, StreamEnd, route};

/// How a session that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Terminal `completion` received. `None` when the server stored no
    /// message.
    Completed(Option<Message>),
    /// The body ended without a terminal event.
    Incomplete,
    /// Cancelled, or superseded by a newer session.
    Cancelled,
}

struct ActiveSession {
    id: Uuid,
    token: CancellationToken,
}

/// Runs send and regenerate sessions against the store.
pub struct SessionController {
    store: Arc<Store>,
    generation: Arc<dyn GenerationApi>,
    notifier: Arc<dyn ErrorNotifier>,
    throttle_window: Duration,
    active: Mutex<HashMap<String, ActiveSession>>,
}

impl SessionController {
    pub fn new(
        store: Arc<Store>,
        generation: Arc<dyn GenerationApi>,
        notifier: Arc<dyn ErrorNotifier>,
        settings: &SessionSettings,
    ) -> Self {
        Self {
            store,
            generation,
            notifier,
            throttle_window: settings.throttle_window(),
            active: Mutex::new(HashMap::new()),
        }
    }

    pub const fn store(&self) -> &Arc<Store> {
        &self.store
    }

    // =========================================================================
    // Streaming sessions
    // =========================================================================

    /// Send a user message and stream the reply into the store.
    pub async fn send(&self, request: SendRequest) -> Result<SessionOutcome, SessionError> {
        let conversation_uuid = request.conversation_uuid.clone();
        let placeholder_uuid = self.add_placeholder(&request);

        let generation = Arc::clone(&self.generation);
        let open = async move { generation.stream_message(&request).await };
        self.run(
            conversation_uuid,
            StreamTarget::NewMessage { placeholder_uuid },
            open,
        )
        .await
    }

    /// Stream another version of an existing message.
    pub async fn regenerate(
        &self,
        request: RegenerateRequest,
    ) -> Result<SessionOutcome, SessionError> {
        self.ensure_known(&request)?;
        let conversation_uuid = request.conversation_uuid.clone();
        let message_uuid = request.message_uuid.clone();

        let generation = Arc::clone(&self.generation);
        let open = async move { generation.stream_regenerate(&request).await };
        self.run(
            conversation_uuid,
            StreamTarget::Version { message_uuid },
            open,
        )
        .await
    }

    /// Abort the conversation's session, if any.
    pub async fn cancel(&self, conversation_uuid: &str) -> bool {
        let Some(session) = self.active.lock().await.remove(conversation_uuid) else {
            return false;
        };
        debug!(conversation = %conversation_uuid, session_id = %session.id, "Cancelling session");
        session.token.cancel();
        true
    }

    /// Whether a session is running for the conversation.
    pub async fn is_active(&self, conversation_uuid: &str) -> bool {
        self.active.lock().await.contains_key(conversation_uuid)
    }

    // =========================================================================
    // Single-shot variants
    // =========================================================================

    /// Send a user message and wait for the whole reply.
    pub async fn send_once(&self, request: SendRequest) -> Result<Option<Message>, SessionError> {
        let conversation_uuid = request.conversation_uuid.clone();
        let placeholder_uuid = self.add_placeholder(&request);

        let result = self.generation.send_message(&request).await;
        self.store.remove_message(&conversation_uuid, &placeholder_uuid);
        match result {
            Ok(reply) => {
                self.store.add_message(&conversation_uuid, reply.message.clone());
                Ok(reply.message)
            }
            Err(err) => Err(self.report(&conversation_uuid, err.into())),
        }
    }

    /// Regenerate a message and wait for the whole reply.
    pub async fn regenerate_once(
        &self,
        request: RegenerateRequest,
    ) -> Result<Option<Message>, SessionError> {
        self.ensure_known(&request)?;
        match self.generation.regenerate(&request).await {
            Ok(reply) => {
                if let Some(version) = &reply.message {
                    self.store.dispatch(Action::VersionAppended {
                        conversation_uuid: request.conversation_uuid.clone(),
                        message_uuid: request.message_uuid.clone(),
                        version: version.clone(),
                    });
                }
                Ok(reply.message)
            }
            Err(err) => Err(self.report(&request.conversation_uuid, err.into())),
        }
    }

    /// Show another version of a regenerated message. No network involved.
    pub fn switch_version(
        &self,
        conversation_uuid: &str,
        message_uuid: &str,
        index: usize,
    ) -> Result<(), StoreError> {
        self.store
            .switch_version(conversation_uuid, message_uuid, index)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn add_placeholder(&self, request: &SendRequest) -> String {
        let placeholder = Message::user_placeholder(request.query.clone(), &request.file_uuids);
        let uuid = placeholder.uuid.clone();
        self.store
            .add_message(&request.conversation_uuid, Some(placeholder));
        uuid
    }

    fn ensure_known(&self, request: &RegenerateRequest) -> Result<(), SessionError> {
        let known = self.store.read(|state| {
            state
                .find_message(&request.conversation_uuid, &request.message_uuid)
                .is_some()
        });
        if known {
            return Ok(());
        }
        Err(self.report(
            &request.conversation_uuid,
            SessionError::UnknownMessage {
                conversation_uuid: request.conversation_uuid.clone(),
                message_uuid: request.message_uuid.clone(),
            },
        ))
    }

    async fn run<F>(
        &self,
        conversation_uuid: String,
        target: StreamTarget,
        open: F,
    ) -> Result<SessionOutcome, SessionError>
    where
        F: Future<Output = ApiResult<ByteStream>>,
    {
        let (session_id, token) = self.begin(&conversation_uuid, target.clone()).await;
        let result = self
            .drive(session_id, &token, &conversation_uuid, target, open)
            .await;
        self.end(&conversation_uuid, session_id).await;
        result
    }

    async fn begin(
        &self,
        conversation_uuid: &str,
        target: StreamTarget,
    ) -> (Uuid, CancellationToken) {
        let session_id = Uuid::new_v4();
        let token = CancellationToken::new();
        let previous = self.active.lock().await.insert(
            conversation_uuid.to_string(),
            ActiveSession {
                id: session_id,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            debug!(
                conversation = %conversation_uuid,
                superseded = %previous.id,
                "Superseding active session"
            );
            previous.token.cancel();
        }

        debug!(conversation = %conversation_uuid, %session_id, ?target, "Session started");
        self.store.dispatch(Action::SessionStarted {
            session_id,
            conversation_uuid: conversation_uuid.to_string(),
            target,
        });
        (session_id, token)
    }

    async fn end(&self, conversation_uuid: &str, session_id: Uuid) {
        let mut active = self.active.lock().await;
        if active
            .get(conversation_uuid)
            .is_some_and(|session| session.id == session_id)
        {
            active.remove(conversation_uuid);
        }
    }

    async fn drive<F>(
        &self,
        session_id: Uuid,
        token: &CancellationToken,
        conversation_uuid: &str,
        target: StreamTarget,
        open: F,
    ) -> Result<SessionOutcome, SessionError>
    where
        F: Future<Output = ApiResult<ByteStream>>,
    {
        let opened = tokio::select! {
            biased;
            () = token.cancelled() => return Ok(self.aborted(session_id, conversation_uuid)),
            opened = open => opened,
        };
        let body = match opened {
            Ok(body) => body,
            Err(err) => return Err(self.fail(session_id, conversation_uuid, &target, err.into())),
        };

        let mut writer = SessionWriter::new(
            &self.store,
            session_id,
            conversation_uuid.to_string(),
            target.clone(),
            self.throttle_window,
        );
        let mut events = EventStream::new(body);

        let end = loop {
            let flush_at = writer.pending_deadline();
            tokio::select! {
                biased;
                () = token.cancelled() => break None,
                () = sleep_until(flush_at) => writer.flush(),
                item = events.next() => {
                    let Some(item) = item else {
                        break Some(StreamEnd::Exhausted);
                    };
                    if let Some(end) = route(item, &mut writer) {
                        break Some(end);
                    }
                }
            }
        };

        match end {
            None => Ok(self.aborted(session_id, conversation_uuid)),
            Some(StreamEnd::Completed) => {
                self.store.dispatch(Action::SessionFinished { session_id });
                info!(conversation = %conversation_uuid, %session_id, "Session completed");
                Ok(SessionOutcome::Completed(writer.take_completed()))
            }
            Some(StreamEnd::Failed) => {
                let error = writer.take_failure().map_or_else(
                    || SessionError::Application("Generation failed".to_string()),
                    SessionError::from,
                );
                Err(self.fail(session_id, conversation_uuid, &target, error))
            }
            Some(StreamEnd::Exhausted) => {
                writer.flush();
                warn!(
                    conversation = %conversation_uuid,
                    %session_id,
                    "Stream ended without a terminal event"
                );
                self.store.dispatch(Action::SessionFinished { session_id });
                Ok(SessionOutcome::Incomplete)
            }
        }
    }

    fn aborted(&self, session_id: Uuid, conversation_uuid: &str) -> SessionOutcome {
        debug!(conversation = %conversation_uuid, %session_id, "Session aborted");
        self.store.dispatch(Action::SessionAborted { session_id });
        SessionOutcome::Cancelled
    }

    /// Tear down a failed session: drop the optimistic message, clear the
    /// session state and surface the error. A session that is no longer
    /// current only drops its optimistic message.
    fn fail(
        &self,
        session_id: Uuid,
        conversation_uuid: &str,
        target: &StreamTarget,
        error: SessionError,
    ) -> SessionError {
        warn!(conversation = %conversation_uuid, %session_id, error = %error, "Session failed");
        if let StreamTarget::NewMessage { placeholder_uuid } = target {
            self.store.remove_message(conversation_uuid, placeholder_uuid);
        }
        let current = self
            .store
            .read(|state| state.streams.values().any(|s| s.is_session(session_id)));
        if !current {
            debug!(conversation = %conversation_uuid, %session_id, "Superseded session failed late");
            return error;
        }
        let (title, body) = error.notification();
        self.store.dispatch(Action::SessionFailed {
            session_id,
            error: body.clone(),
        });
        self.notifier.report_error(title, &body);
        error
    }

    /// Surface an error that did not come from a tracked session.
    fn report(&self, conversation_uuid: &str, error: SessionError) -> SessionError {
        warn!(conversation = %conversation_uuid, error = %error, "Generation request failed");
        let (title, body) = error.notification();
        self.store.set_error(Some(body.clone()));
        self.notifier.report_error(title, &body);
        error
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::session::error::TRANSPORT_ERROR_TEXT;
    use crate::domain::Sender;
    use crate::ports::notifier::MockErrorNotifier;
    use crate::ports::{ApiError, GenerationReply, NoopNotifier};
    use crate::store::SessionPhase;
    use crate::testing::{FakeGeneration, message};

    const CONV: &str = "conv-1";

    fn controller(
        generation: &Arc<FakeGeneration>,
        notifier: Arc<dyn ErrorNotifier>,
    ) -> Arc<SessionController> {
        Arc::new(SessionController::new(
            Arc::new(Store::new()),
            Arc::clone(generation) as Arc<dyn GenerationApi>,
            notifier,
            &SessionSettings::with_defaults(),
        ))
    }

    fn quiet(generation: &Arc<FakeGeneration>) -> Arc<SessionController> {
        controller(generation, Arc::new(NoopNotifier))
    }

    fn request(text: &str) -> SendRequest {
        SendRequest::new(CONV, text, "model-a")
    }

    fn message_json(uuid: &str, content: &str, sender: &str) -> serde_json::Value {
        json!({
            "uuid": uuid,
            "content": content,
            "sender": sender,
            "model_name": if sender == "assistant" { json!("model-b") } else { json!(null) },
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:00Z"
        })
    }

    fn uuids(controller: &SessionController) -> Vec<String> {
        controller.store().read(|state| {
            state
                .messages_for(CONV)
                .iter()
                .map(|m| m.uuid.clone())
                .collect()
        })
    }

    fn content(controller: &SessionController) -> Option<(String, String, bool)> {
        controller.store().read(|state| {
            state.streaming(CONV).map(|s| {
                (
                    s.content.clone(),
                    s.initial_content.clone(),
                    s.real_content_started,
                )
            })
        })
    }

    /// Let spawned sessions run until they block.
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    // =========================================================================
    // Send
    // =========================================================================

    #[tokio::test]
    async fn test_send_reconciles_transcript() {
        let generation = Arc::new(FakeGeneration::new());
        generation.push_events(&[
            json!({"type": "initial_metadata", "message": message_json("u-1", "Hi", "user")}),
            json!({"type": "model_selection", "selected_model": "model-b", "selected_provider": "acme"}),
            json!({"type": "initial_content", "chunk": "Thinking"}),
            json!({"type": "content", "chunk": "Hel"}),
            json!({"type": "content", "chunk": "lo"}),
            json!({"type": "completion", "message": message_json("a-1", "Hello", "assistant")}),
        ]);
        let controller = quiet(&generation);

        let outcome = controller.send(request("Hi")).await.unwrap();

        let SessionOutcome::Completed(Some(reply)) = outcome else {
            panic!("expected a completed session, got {outcome:?}");
        };
        assert_eq!(reply.uuid, "a-1");
        assert_eq!(uuids(&controller), ["u-1", "a-1"]);
        assert!(content(&controller).is_none(), "session state is destroyed");
        assert!(controller.store().read(|s| s.error.is_none()));
        assert!(!controller.is_active(CONV).await);
        assert_eq!(generation.sent()[0].query, "Hi");
    }

    #[tokio::test]
    async fn test_completion_without_message_inserts_nothing() {
        let generation = Arc::new(FakeGeneration::new());
        generation.push_events(&[
            json!({"type": "content", "chunk": "suppressed"}),
            json!({"type": "completion", "message": null}),
        ]);
        let controller = quiet(&generation);

        let outcome = controller.send(request("Hi")).await.unwrap();

        assert_eq!(outcome, SessionOutcome::Completed(None));
        assert!(uuids(&controller).is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_stream_keeps_placeholder() {
        let generation = Arc::new(FakeGeneration::new());
        generation.push_chunks(["data: {\"type\":\"content\",\"chunk\":\"cut\"}\n"]);
        let controller = quiet(&generation);

        let outcome = controller.send(request("Hi")).await.unwrap();

        assert_eq!(outcome, SessionOutcome::Incomplete);
        let ids = uuids(&controller);
        assert_eq!(ids.len(), 1);
        assert!(ids[0].starts_with("local-"));
        assert!(content(&controller).is_none());
    }

    #[tokio::test]
    async fn test_chunks_split_across_reads() {
        let generation = Arc::new(FakeGeneration::new());
        let body = crate::testing::sse_body(&[
            json!({"type": "content", "chunk": "héllo "}),
            json!({"type": "content", "chunk": "wörld"}),
            json!({"type": "completion", "message": message_json("a-1", "héllo wörld", "assistant")}),
        ]);
        let bytes = body.as_bytes();
        generation.push_chunks([
            String::from_utf8_lossy(&bytes[..3]).into_owned(),
            String::from_utf8_lossy(&bytes[3..]).into_owned(),
        ]);
        let controller = quiet(&generation);

        let outcome = controller.send(request("Hi")).await.unwrap();
        let SessionOutcome::Completed(Some(reply)) = outcome else {
            panic!("expected a completed session, got {outcome:?}");
        };
        assert_eq!(reply.content, "héllo wörld");
        let stored = controller
            .store()
            .read(|s| s.find_message(CONV, "a-1").map(|m| m.content.clone()));
        assert_eq!(stored.as_deref(), Some("héllo wörld"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_streaming_buffer_is_live_until_completion() {
        let generation = Arc::new(FakeGeneration::new());
        let feed = generation.push_feed();
        let controller = quiet(&generation);
        let task = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.send(request("Hi")).await }
        });
        settle().await;

        feed.event(&json!({"type": "initial_metadata", "message": message_json("u-1", "Hi", "user")}));
        feed.event(&json!({"type": "content", "chunk": "Hi"}));
        feed.event(&json!({"type": "content", "chunk": " there"}));
        tokio::time::sleep(Duration::from_millis(100)).await;

        let (live, _, started) = content(&controller).unwrap();
        assert_eq!(live, "Hi there");
        assert!(started);
        assert_eq!(uuids(&controller), ["u-1"]);

        feed.event(&json!({"type": "completion", "message": message_json("a-1", "Hi there", "assistant")}));
        let outcome = task.await.unwrap().unwrap();

        assert!(matches!(outcome, SessionOutcome::Completed(Some(_))));
        assert!(content(&controller).is_none(), "buffer cleared on completion");
        assert_eq!(uuids(&controller), ["u-1", "a-1"]);
        let stored = controller
            .store()
            .read(|s| s.find_message(CONV, "a-1").map(|m| m.content.clone()));
        assert_eq!(stored.as_deref(), Some("Hi there"));
    }

    // =========================================================================
    // Throttling and preview
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_throttled_commits_with_trailing_flush() {
        let generation = Arc::new(FakeGeneration::new());
        let feed = generation.push_feed();
        let controller = quiet(&generation);
        let task = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.send(request("Hi")).await }
        });
        settle().await;

        feed.event(&json!({"type": "content", "chunk": "a"}));
        settle().await;
        assert_eq!(content(&controller).unwrap().0, "a", "first chunk commits at once");

        tokio::time::sleep(Duration::from_millis(10)).await;
        feed.event(&json!({"type": "content", "chunk": "b"}));
        tokio::time::sleep(Duration::from_millis(10)).await;
        feed.event(&json!({"type": "content", "chunk": "c"}));
        settle().await;
        assert_eq!(content(&controller).unwrap().0, "a", "later chunks wait for the window");

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(
            content(&controller).unwrap().0,
            "abc",
            "trailing flush commits the last partial chunk"
        );

        drop(feed);
        assert_eq!(task.await.unwrap().unwrap(), SessionOutcome::Incomplete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preview_is_hidden_once_content_starts() {
        let generation = Arc::new(FakeGeneration::new());
        let feed = generation.push_feed();
        let controller = quiet(&generation);
        let task = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.send(request("Hi")).await }
        });
        settle().await;

        feed.event(&json!({"type": "initial_content", "chunk": "Searching"}));
        settle().await;
        assert_eq!(
            content(&controller).unwrap(),
            (String::new(), "Searching".to_string(), false)
        );
        assert_eq!(
            controller.store().read(|s| s.streaming(CONV).map(|s| s.phase)),
            Some(SessionPhase::StreamingPreview)
        );

        feed.event(&json!({"type": "content", "chunk": "Answer"}));
        settle().await;
        feed.event(&json!({"type": "initial_content", "chunk": " more preview"}));
        tokio::time::sleep(Duration::from_millis(100)).await;

        let (real, preview, started) = content(&controller).unwrap();
        assert_eq!(real, "Answer");
        assert!(preview.is_empty());
        assert!(started);

        feed.event(&json!({"type": "metadata", "query_category": "research"}));
        settle().await;
        let metadata = controller
            .store()
            .read(|s| s.streaming(CONV).map(|s| s.metadata.clone()))
            .unwrap();
        assert_eq!(metadata.query_category.as_deref(), Some("research"));
        assert_eq!(content(&controller).unwrap().0, "Answer");

        drop(feed);
        task.await.unwrap().unwrap();
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[tokio::test]
    async fn test_application_error_discards_partial_content() {
        let generation = Arc::new(FakeGeneration::new());
        generation.push_events(&[
            json!({"type": "content", "chunk": "partial"}),
            json!({"type": "error", "error": "Upstream overloaded"}),
        ]);
        let mut notifier = MockErrorNotifier::new();
        notifier
            .expect_report_error()
            .withf(|title, message| title == "Generation failed" && message == "Upstream overloaded")
            .times(1)
            .return_const(());
        let controller = controller(&generation, Arc::new(notifier));

        let err = controller.send(request("Hi")).await.unwrap_err();

        assert_eq!(err, SessionError::Application("Upstream overloaded".to_string()));
        assert!(uuids(&controller).is_empty(), "placeholder removed, nothing persisted");
        assert!(content(&controller).is_none());
        assert_eq!(
            controller.store().read(|s| s.error.clone()).as_deref(),
            Some("Upstream overloaded")
        );
    }

    #[tokio::test]
    async fn test_transport_error_is_generic() {
        let generation = Arc::new(FakeGeneration::new());
        generation.push_stream_error(ApiError::Status {
            status: 502,
            message: "bad gateway".to_string(),
        });
        let mut notifier = MockErrorNotifier::new();
        notifier
            .expect_report_error()
            .withf(|title, message| title == "Connection error" && message == TRANSPORT_ERROR_TEXT)
            .times(1)
            .return_const(());
        let controller = controller(&generation, Arc::new(notifier));

        let err = controller.send(request("Hi")).await.unwrap_err();

        assert!(matches!(err, SessionError::Transport(ApiError::Status { status: 502, .. })));
        assert!(uuids(&controller).is_empty());
        assert_eq!(
            controller.store().read(|s| s.error.clone()).as_deref(),
            Some(TRANSPORT_ERROR_TEXT)
        );
    }

    #[tokio::test]
    async fn test_mid_stream_disconnect() {
        let generation = Arc::new(FakeGeneration::new());
        let feed = generation.push_feed();
        feed.event(&json!({"type": "content", "chunk": "half"}));
        feed.fail(ApiError::transport("connection reset"));
        let controller = quiet(&generation);

        let err = controller.send(request("Hi")).await.unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
        assert!(uuids(&controller).is_empty());
    }

    // =========================================================================
    // Regenerate and versions
    // =========================================================================

    #[tokio::test]
    async fn test_regenerate_then_switch_versions() {
        let generation = Arc::new(FakeGeneration::new());
        generation.push_events(&[
            json!({"type": "content", "chunk": "Second answer"}),
            json!({"type": "completion", "message": message_json("a-2", "Second answer", "assistant")}),
        ]);
        let controller = quiet(&generation);
        let store = controller.store();
        store.add_message(CONV, Some(message("u-1", "Question", Sender::User)));
        store.add_message(CONV, Some(message("a-1", "First answer", Sender::Assistant)));

        let outcome = controller
            .regenerate(RegenerateRequest {
                message_uuid: "a-1".to_string(),
                model_id: "model-b".to_string(),
                conversation_uuid: CONV.to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, SessionOutcome::Completed(Some(_))));

        let slot = store.read(|s| s.find_message(CONV, "a-1").cloned()).unwrap();
        assert_eq!(uuids(&controller), ["u-1", "a-1"]);
        assert_eq!(slot.version_count(), 2);
        assert_eq!(slot.current_version_index, Some(1));
        assert_eq!(slot.content, "Second answer");
        assert_eq!(slot.model_name.as_deref(), Some("model-b"));

        controller.switch_version(CONV, "a-1", 0).unwrap();
        let slot = store.read(|s| s.find_message(CONV, "a-1").cloned()).unwrap();
        assert_eq!(slot.content, "First answer");
        assert_eq!(slot.model_name.as_deref(), Some("model-a"));

        let err = controller.switch_version(CONV, "a-1", 7).unwrap_err();
        assert_eq!(err, StoreError::VersionOutOfRange { index: 7, count: 2 });
        let unchanged = store.read(|s| s.find_message(CONV, "a-1").cloned()).unwrap();
        assert_eq!(unchanged, slot);
        assert!(unchanged.versions_consistent());
    }

    #[tokio::test]
    async fn test_regenerate_unknown_message() {
        let generation = Arc::new(FakeGeneration::new());
        let controller = quiet(&generation);

        let err = controller
            .regenerate(RegenerateRequest {
                message_uuid: "missing".to_string(),
                model_id: "model-b".to_string(),
                conversation_uuid: CONV.to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::UnknownMessage { .. }));
        assert!(generation.regenerated().is_empty());
    }

    // =========================================================================
    // Supersede and cancel
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_new_session_supersedes_old_one() {
        let generation = Arc::new(FakeGeneration::new());
        let first_feed = generation.push_feed();
        let second_feed = generation.push_feed();
        let controller = quiet(&generation);

        let first = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.send(request("one")).await }
        });
        settle().await;
        first_feed.event(&json!({"type": "content", "chunk": "old"}));
        settle().await;

        let second = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.send(request("two")).await }
        });
        settle().await;

        assert_eq!(first.await.unwrap().unwrap(), SessionOutcome::Cancelled);
        first_feed.event(&json!({"type": "content", "chunk": "stale"}));
        second_feed.event(&json!({"type": "content", "chunk": "new"}));
        settle().await;
        assert_eq!(content(&controller).unwrap().0, "new");

        assert!(controller.cancel(CONV).await);
        assert_eq!(second.await.unwrap().unwrap(), SessionOutcome::Cancelled);
        assert_eq!(
            controller.store().read(|s| s.streaming(CONV).map(|s| s.phase)),
            Some(SessionPhase::Aborted)
        );
        assert!(!controller.cancel(CONV).await);
    }

    #[tokio::test]
    async fn test_late_failure_of_superseded_session_is_silent() {
        let generation = Arc::new(FakeGeneration::new());
        let mut notifier = MockErrorNotifier::new();
        notifier.expect_report_error().times(0);
        let controller = controller(&generation, Arc::new(notifier));
        let target = StreamTarget::NewMessage {
            placeholder_uuid: "local-old".to_string(),
        };
        let (stale, _) = controller.begin(CONV, target.clone()).await;
        let (current, _) = controller
            .begin(
                CONV,
                StreamTarget::NewMessage {
                    placeholder_uuid: "local-new".to_string(),
                },
            )
            .await;

        let err = controller.fail(stale, CONV, &target, SessionError::Application("late".to_string()));

        assert_eq!(err, SessionError::Application("late".to_string()));
        assert!(controller.store().read(|s| s.error.is_none()));
        assert_eq!(
            controller.store().read(|s| s.streaming(CONV).and_then(|s| s.session_id)),
            Some(current)
        );
    }

    // =========================================================================
    // Single-shot
    // =========================================================================

    #[tokio::test]
    async fn test_send_once_replaces_placeholder() {
        let generation = Arc::new(FakeGeneration::new());
        generation.push_reply(Ok(GenerationReply {
            message: Some(message("a-1", "Done", Sender::Assistant)),
            ..GenerationReply::default()
        }));
        let controller = quiet(&generation);

        let reply = controller.send_once(request("Hi")).await.unwrap();

        assert_eq!(reply.map(|m| m.uuid).as_deref(), Some("a-1"));
        assert_eq!(uuids(&controller), ["a-1"]);
    }

    #[tokio::test]
    async fn test_send_once_timeout() {
        let generation = Arc::new(FakeGeneration::new());
        generation.push_reply(Err(ApiError::Timeout { timeout_ms: 30_000 }));
        let controller = quiet(&generation);

        let err = controller.send_once(request("Hi")).await.unwrap_err();

        assert!(matches!(err, SessionError::Transport(ref e) if e.is_timeout()));
        assert!(uuids(&controller).is_empty());
        assert!(controller.store().read(|s| s.error.is_some()));
    }

    #[tokio::test]
    async fn test_regenerate_once_appends_version() {
        let generation = Arc::new(FakeGeneration::new());
        generation.push_reply(Ok(GenerationReply {
            message: Some(message("a-2", "Again", Sender::Assistant)),
            ..GenerationReply::default()
        }));
        let controller = quiet(&generation);
        controller
            .store()
            .add_message(CONV, Some(message("a-1", "Once", Sender::Assistant)));

        controller
            .regenerate_once(RegenerateRequest {
                message_uuid: "a-1".to_string(),
                model_id: "model-a".to_string(),
                conversation_uuid: CONV.to_string(),
            })
            .await
            .unwrap();

        let slot = controller
            .store()
            .read(|s| s.find_message(CONV, "a-1").cloned())
            .unwrap();
        assert_eq!(slot.version_count(), 2);
        assert_eq!(slot.content, "Again");
    }
}
