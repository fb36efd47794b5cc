//! Session store — one active sequence session per user.
//!
//! Pure CRUD plus step/answer mutation; no branching or validation rules
//! live here. The map is guarded by an async `RwLock` and reads hand out
//! clones, so callers never hold a reference into the map. For multi-call
//! critical sections (validate, store, advance, recompute) callers take the
//! per-user lock from [`SessionStore::user_lock`]; different users' sessions
//! never block each other beyond map access.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{SequenceAnswer, SequenceSession, SequenceStatus};

pub struct SessionStore {
    sessions: RwLock<HashMap<i64, SequenceSession>>,
    user_locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Serialization handle for one user's read-modify-write sequences.
    pub fn user_lock(&self, user_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.user_locks.lock().unwrap();
        Arc::clone(
            locks
                .entry(user_id)
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    /// Create a brand-new session for the user, discarding any prior one.
    pub async fn create(
        &self,
        user_id: i64,
        sequence_name: &str,
        total_questions: u32,
        max_possible_score: Option<i32>,
    ) -> Uuid {
        let mut session = SequenceSession::new(user_id, sequence_name);
        session.total_questions = Some(total_questions);
        session.max_possible_score = max_possible_score;
        let id = session.id;

        let mut sessions = self.sessions.write().await;
        if let Some(previous) = sessions.insert(user_id, session) {
            debug!(
                user_id,
                previous = %previous.id,
                "replaced existing session"
            );
        }
        info!(user_id, session = %id, sequence = sequence_name, "created sequence session");
        id
    }

    /// Copy-on-read lookup of the user's session.
    pub async fn get(&self, user_id: i64) -> Option<SequenceSession> {
        self.sessions.read().await.get(&user_id).cloned()
    }

    /// Upsert an answer into the user's session. Returns `false` when the
    /// user has no session.
    pub async fn add_answer(&self, user_id: i64, answer: SequenceAnswer) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&user_id) else {
            warn!(user_id, "add_answer: no session");
            return false;
        };
        debug!(
            user_id,
            question = %answer.question_key,
            value = %answer.value,
            "recorded answer"
        );
        session.add_answer(answer);
        true
    }

    /// Increment the answers-submitted counter.
    pub async fn advance_step(&self, user_id: i64) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&user_id) else {
            warn!(user_id, "advance_step: no session");
            return false;
        };
        session.advance_step();
        debug!(user_id, step = session.current_step, "advanced step");
        true
    }

    pub async fn complete(&self, user_id: i64) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&user_id) else {
            warn!(user_id, "complete: no session");
            return false;
        };
        session.mark_completed();
        info!(user_id, session = %session.id, sequence = %session.sequence_name, "completed session");
        true
    }

    pub async fn abandon(&self, user_id: i64) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&user_id) else {
            warn!(user_id, "abandon: no session");
            return false;
        };
        session.mark_abandoned();
        info!(user_id, session = %session.id, "abandoned session");
        true
    }

    /// Hard-delete the user's session.
    pub async fn clear(&self, user_id: i64) -> bool {
        let removed = self.sessions.write().await.remove(&user_id);
        self.prune_user_lock(user_id);
        match removed {
            Some(session) => {
                info!(user_id, session = %session.id, "cleared session");
                true
            }
            None => false,
        }
    }

    /// Drop the user's lock entry when nothing outside the map holds it.
    /// A strong count above 1 means someone is inside a critical section;
    /// their entry survives and is pruned on a later sweep.
    fn prune_user_lock(&self, user_id: i64) {
        let mut locks = self.user_locks.lock().unwrap();
        if locks
            .get(&user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&user_id);
        }
    }

    pub async fn active_session_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.status == SequenceStatus::Active)
            .count()
    }

    pub async fn completed_session_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.status == SequenceStatus::Completed)
            .count()
    }

    /// Remove completed/abandoned sessions untouched for longer than
    /// `max_age`. Caller-driven policy; returns the number removed.
    pub async fn cleanup_finished_sessions(&self, max_age: Duration) -> usize {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::hours(24));
        let mut sessions = self.sessions.write().await;
        let stale: Vec<i64> = sessions
            .iter()
            .filter(|(_, s)| s.status.is_finished() && s.updated_at < cutoff)
            .map(|(user_id, _)| *user_id)
            .collect();
        for user_id in &stale {
            sessions.remove(user_id);
            self.prune_user_lock(*user_id);
        }
        if !stale.is_empty() {
            info!(count = stale.len(), "cleaned up finished sessions");
        }
        stale.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
