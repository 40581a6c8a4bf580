use std::sync::Arc;
use std::time::Instant;

use chatter_core::{ReplySource, ResponseEngine, Transcript};
use chatter_observability::AppMetrics;
use chatter_storage::{ConversationSession, SessionRepository};
use chrono::{Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

pub const WELCOME_MESSAGE: &str = "Hello! I'm a simple chatbot. I can help you with basic questions and have a conversation. Try asking me about the weather, time, math, or just say hello!";

const MAX_TURNS: usize = 200;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub session_id: String,
    pub reply_text: String,
    pub should_exit: bool,
    pub source: ReplySource,
    pub transcript: Transcript,
}

/// Session-shell logic shared by every front-end: keeps one transcript per
/// session and feeds each message through the engine.
#[derive(Clone)]
pub struct ConversationService<S>
where
    S: SessionRepository,
{
    engine: Arc<ResponseEngine>,
    store: Arc<S>,
    metrics: Arc<AppMetrics>,
    session_ttl: Duration,
}

impl<S> ConversationService<S>
where
    S: SessionRepository,
{
    pub fn new(
        engine: Arc<ResponseEngine>,
        store: Arc<S>,
        metrics: Arc<AppMetrics>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            engine,
            store,
            metrics,
            session_ttl,
        }
    }

    pub fn engine(&self) -> &ResponseEngine {
        &self.engine
    }

    /// A fresh session holding only the welcome turn. Not persisted until the
    /// first message arrives.
    pub fn start_session(&self) -> ConversationSession {
        let now = Utc::now();
        let mut transcript = Transcript::new();
        transcript.push_bot(WELCOME_MESSAGE);

        ConversationSession {
            session_id: Uuid::new_v4().to_string(),
            transcript,
            created_at: now,
            expires_at: now + self.session_ttl,
        }
    }

    #[instrument(skip(self, text))]
    pub async fn handle_message(
        &self,
        session_id: Option<&str>,
        text: &str,
    ) -> Result<ChatOutcome, SessionError> {
        let message = text.trim();
        if message.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let started = Instant::now();
        let mut session = match session_id {
            Some(id) => self.store.load_session(id).await?,
            None => None,
        }
        .unwrap_or_else(|| {
            self.metrics.inc_session_started();
            self.start_session()
        });

        session.transcript.push_user(message);
        let result = self.engine.classify(message);
        session.transcript.push_bot(result.reply_text.as_str());
        session.transcript.retain_latest(MAX_TURNS);

        self.metrics.record_reply(&result.source, result.should_exit);

        if result.should_exit {
            self.store.delete_session(&session.session_id).await?;
            self.metrics.inc_session_ended();
        } else {
            session.expires_at = Utc::now() + self.session_ttl;
            self.store.upsert_session(&session).await?;
        }

        self.metrics.observe_latency(started.elapsed());
        info!(
            session_id = %session.session_id,
            source = %result.source.label(),
            should_exit = result.should_exit,
            turns = session.transcript.len(),
            "message handled"
        );

        Ok(ChatOutcome {
            session_id: session.session_id,
            reply_text: result.reply_text,
            should_exit: result.should_exit,
            source: result.source,
            transcript: session.transcript,
        })
    }

    pub async fn transcript(&self, session_id: &str) -> Result<Option<Transcript>, SessionError> {
        Ok(self
            .store
            .load_session(session_id)
            .await?
            .map(|session| session.transcript))
    }

    pub async fn end_session(&self, session_id: &str) -> Result<bool, SessionError> {
        let removed = self.store.delete_session(session_id).await?;
        if removed {
            self.metrics.inc_session_ended();
            info!(session_id = %session_id, "session ended");
        }
        Ok(removed)
    }

    pub async fn purge_expired(&self) -> Result<u64, SessionError> {
        Ok(self.store.purge_expired(Utc::now()).await?)
    }
}

#[cfg(test)]
mod tests {
    use chatter_core::{Speaker, DIVIDE_BY_ZERO_REPLY};
    use chatter_storage::MemoryStore;

    use super::*;

    fn service() -> (ConversationService<MemoryStore>, Arc<MemoryStore>, Arc<AppMetrics>) {
        let store = Arc::new(MemoryStore::new());
        let metrics = AppMetrics::shared();
        let service = ConversationService::new(
            Arc::new(ResponseEngine::default()),
            store.clone(),
            metrics.clone(),
            Duration::minutes(30),
        );
        (service, store, metrics)
    }

    #[tokio::test]
    async fn first_message_starts_session_with_welcome_turn() {
        let (service, store, _) = service();

        let outcome = service.handle_message(None, "  5 + 3 ").await.unwrap();

        assert_eq!(outcome.reply_text, "5 + 3 = 8");
        assert!(!outcome.should_exit);
        let speakers = outcome
            .transcript
            .turns()
            .iter()
            .map(|turn| turn.speaker)
            .collect::<Vec<_>>();
        assert_eq!(speakers, vec![Speaker::Bot, Speaker::User, Speaker::Bot]);
        assert_eq!(outcome.transcript.turns()[0].text, WELCOME_MESSAGE);
        assert_eq!(outcome.transcript.turns()[1].text, "5 + 3");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn each_message_appends_two_turns_to_the_same_session() {
        let (service, _, _) = service();

        let first = service.handle_message(None, "hello").await.unwrap();
        let second = service
            .handle_message(Some(&first.session_id), "10 / 0")
            .await
            .unwrap();

        assert_eq!(second.session_id, first.session_id);
        assert_eq!(second.reply_text, DIVIDE_BY_ZERO_REPLY);
        assert_eq!(second.transcript.len(), first.transcript.len() + 2);

        let stored = service.transcript(&first.session_id).await.unwrap().unwrap();
        assert_eq!(stored, second.transcript);
    }

    #[tokio::test]
    async fn exit_removes_session() {
        let (service, store, metrics) = service();

        let first = service.handle_message(None, "hi").await.unwrap();
        let last = service
            .handle_message(Some(&first.session_id), "quit")
            .await
            .unwrap();

        assert!(last.should_exit);
        assert!(store.is_empty());
        assert!(service.transcript(&first.session_id).await.unwrap().is_none());
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.sessions_started_total, 1);
        assert_eq!(snapshot.sessions_ended_total, 1);
        assert_eq!(snapshot.exits_total, 1);
    }

    #[tokio::test]
    async fn blank_messages_are_rejected_without_touching_the_store() {
        let (service, store, metrics) = service();

        let err = service.handle_message(None, "   ").await.unwrap_err();

        assert!(matches!(err, SessionError::EmptyMessage));
        assert!(store.is_empty());
        assert_eq!(metrics.snapshot().messages_total, 0);
    }

    #[tokio::test]
    async fn unknown_session_id_starts_a_new_session() {
        let (service, _, _) = service();

        let outcome = service
            .handle_message(Some("stale-id"), "thanks")
            .await
            .unwrap();

        assert_ne!(outcome.session_id, "stale-id");
        assert_eq!(outcome.transcript.len(), 3);
    }

    #[tokio::test]
    async fn end_session_is_idempotent() {
        let (service, _, _) = service();
        let outcome = service.handle_message(None, "hello").await.unwrap();

        assert!(service.end_session(&outcome.session_id).await.unwrap());
        assert!(!service.end_session(&outcome.session_id).await.unwrap());
    }
}
