//! Persistence seams and the in-memory backend.
//!
//! Every component receives its stores as `Arc<dyn ...>` handles built by the
//! caller. The two writes that must be serialized (session finalize and the
//! leaderboard max-merge) are single conditional operations on the store, so
//! no component needs in-process locking of its own.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::aggregator::SessionStats;
use crate::domain::{
    Celebrity, GameMode, GameSession, LeaderboardEntry, QuestionAttempt, QuestionTemplate,
    UserAccount,
};
use crate::error::StoreError;
use crate::leaderboard::merged_score;

/// Outcome of a conditional attempt insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptWrite {
    Inserted,
    DuplicateIndex,
    SessionEnded,
    SessionMissing,
}

/// Outcome of the conditional Active -> Ended write.
#[derive(Clone, Debug)]
pub enum FinalizeOutcome {
    Finalized(GameSession),
    AlreadyEnded,
    /// An attempt landed after the stats were computed; re-aggregate.
    Stale,
    SessionMissing,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Active templates, optionally restricted to one mode.
    async fn active_templates(
        &self,
        mode: Option<GameMode>,
    ) -> Result<Vec<QuestionTemplate>, StoreError>;
    async fn template(&self, id: &str) -> Result<Option<QuestionTemplate>, StoreError>;
    async fn celebrity(&self, id: &str) -> Result<Option<Celebrity>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user(&self, id: &str) -> Result<Option<UserAccount>, StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: GameSession) -> Result<(), StoreError>;
    async fn session(&self, id: Uuid) -> Result<Option<GameSession>, StoreError>;
    /// Insert only while the session is active and the index is unused.
    async fn record_attempt(&self, attempt: QuestionAttempt) -> Result<AttemptWrite, StoreError>;
    /// Attempts ordered by `question_index`.
    async fn attempts(&self, session_id: Uuid) -> Result<Vec<QuestionAttempt>, StoreError>;
    /// Set `ended_at` and the aggregates only if `ended_at` is still null and
    /// the stored attempt count still equals `stats.questions_count`.
    async fn finalize_session(
        &self,
        id: Uuid,
        stats: &SessionStats,
        ended_at: DateTime<Utc>,
    ) -> Result<FinalizeOutcome, StoreError>;
    async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<GameSession>, StoreError>;
    /// Every ended session, across all users.
    async fn ended_sessions(&self) -> Result<Vec<GameSession>, StoreError>;
    /// Highest total of an ended DAILY_CHALLENGE session for the key.
    async fn best_completed_daily(
        &self,
        user_id: &str,
        pack_date: NaiveDate,
    ) -> Result<Option<i64>, StoreError>;
}

#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    /// Atomic upsert keeping `max(existing, candidate)`; returns the stored entry.
    async fn merge_max(
        &self,
        pack_date: NaiveDate,
        user_id: &str,
        candidate: i64,
        at: DateTime<Utc>,
    ) -> Result<LeaderboardEntry, StoreError>;
    async fn entries(&self, pack_date: NaiveDate) -> Result<Vec<LeaderboardEntry>, StoreError>;
    async fn entry(
        &self,
        pack_date: NaiveDate,
        user_id: &str,
    ) -> Result<Option<LeaderboardEntry>, StoreError>;
}

#[async_trait]
pub trait PackStore: Send + Sync {
    async fn pack(&self, pack_date: NaiveDate) -> Result<Option<Vec<String>>, StoreError>;
    /// First writer wins; returns whatever is stored afterwards.
    async fn save_pack_if_absent(
        &self,
        pack_date: NaiveDate,
        template_ids: Vec<String>,
    ) -> Result<Vec<String>, StoreError>;
}

/// In-memory backend. Each conditional write runs under one write guard.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserAccount>>,
    celebrities: RwLock<HashMap<String, Celebrity>>,
    templates: RwLock<HashMap<String, QuestionTemplate>>,
    sessions: RwLock<HashMap<Uuid, SessionRow>>,
    leaderboard: RwLock<HashMap<(NaiveDate, String), LeaderboardEntry>>,
    packs: RwLock<HashMap<NaiveDate, Vec<String>>>,
}

struct SessionRow {
    session: GameSession,
    attempts: Vec<QuestionAttempt>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_user(&self, user: UserAccount) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    pub async fn put_celebrity(&self, celebrity: Celebrity) {
        self.celebrities
            .write()
            .await
            .insert(celebrity.id.clone(), celebrity);
    }

    pub async fn put_template(&self, template: QuestionTemplate) {
        self.templates
            .write()
            .await
            .insert(template.id.clone(), template);
    }

    #[cfg(test)]
    pub async fn set_template_active(&self, id: &str, active: bool) -> bool {
        match self.templates.write().await.get_mut(id) {
            Some(t) => {
                t.is_active = active;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn active_templates(
        &self,
        mode: Option<GameMode>,
    ) -> Result<Vec<QuestionTemplate>, StoreError> {
        let templates = self.templates.read().await;
        let mut out: Vec<QuestionTemplate> = templates
            .values()
            .filter(|t| t.is_active && mode.map_or(true, |m| t.mode == m))
            .cloned()
            .collect();
        // HashMap order is arbitrary; keep listings reproducible.
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn template(&self, id: &str) -> Result<Option<QuestionTemplate>, StoreError> {
        Ok(self.templates.read().await.get(id).cloned())
    }

    async fn celebrity(&self, id: &str) -> Result<Option<Celebrity>, StoreError> {
        Ok(self.celebrities.read().await.get(id).cloned())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user(&self, id: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: GameSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(StoreError::Conflict(format!(
                "session {} already exists",
                session.id
            )));
        }
        sessions.insert(
            session.id,
            SessionRow {
                session,
                attempts: Vec::new(),
            },
        );
        Ok(())
    }

    async fn session(&self, id: Uuid) -> Result<Option<GameSession>, StoreError> {
        Ok(self.sessions.read().await.get(&id).map(|r| r.session.clone()))
    }

    async fn record_attempt(&self, attempt: QuestionAttempt) -> Result<AttemptWrite, StoreError> {
        let mut sessions = self.sessions.write().await;
        let Some(row) = sessions.get_mut(&attempt.session_id) else {
            return Ok(AttemptWrite::SessionMissing);
        };
        if !row.session.is_active() {
            return Ok(AttemptWrite::SessionEnded);
        }
        if row
            .attempts
            .iter()
            .any(|a| a.question_index == attempt.question_index)
        {
            return Ok(AttemptWrite::DuplicateIndex);
        }
        row.attempts.push(attempt);
        Ok(AttemptWrite::Inserted)
    }

    async fn attempts(&self, session_id: Uuid) -> Result<Vec<QuestionAttempt>, StoreError> {
        let sessions = self.sessions.read().await;
        let mut out = sessions
            .get(&session_id)
            .map(|r| r.attempts.clone())
            .unwrap_or_default();
        out.sort_by_key(|a| a.question_index);
        Ok(out)
    }

    async fn finalize_session(
        &self,
        id: Uuid,
        stats: &SessionStats,
        ended_at: DateTime<Utc>,
    ) -> Result<FinalizeOutcome, StoreError> {
        let mut sessions = self.sessions.write().await;
        let Some(row) = sessions.get_mut(&id) else {
            return Ok(FinalizeOutcome::SessionMissing);
        };
        if row.session.ended_at.is_some() {
            return Ok(FinalizeOutcome::AlreadyEnded);
        }
        if row.attempts.len() != stats.questions_count as usize {
            return Ok(FinalizeOutcome::Stale);
        }
        let s = &mut row.session;
        s.ended_at = Some(ended_at);
        s.total_score = stats.total_score;
        s.questions_count = stats.questions_count;
        s.correct_count = stats.correct_count;
        s.best_streak = stats.best_streak;
        Ok(FinalizeOutcome::Finalized(s.clone()))
    }

    async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<GameSession>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|r| r.session.user_id == user_id)
            .map(|r| r.session.clone())
            .collect())
    }

    async fn ended_sessions(&self) -> Result<Vec<GameSession>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|r| !r.session.is_active())
            .map(|r| r.session.clone())
            .collect())
    }

    async fn best_completed_daily(
        &self,
        user_id: &str,
        pack_date: NaiveDate,
    ) -> Result<Option<i64>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .map(|r| &r.session)
            .filter(|s| {
                s.user_id == user_id
                    && s.mode == GameMode::DailyChallenge
                    && s.pack_date == Some(pack_date)
                    && s.ended_at.is_some()
            })
            .map(|s| s.total_score)
            .max())
    }
}

#[async_trait]
impl LeaderboardStore for MemoryStore {
    async fn merge_max(
        &self,
        pack_date: NaiveDate,
        user_id: &str,
        candidate: i64,
        at: DateTime<Utc>,
    ) -> Result<LeaderboardEntry, StoreError> {
        let mut board = self.leaderboard.write().await;
        let entry = board
            .entry((pack_date, user_id.to_string()))
            .and_modify(|e| {
                e.score = merged_score(Some(e.score), candidate);
                e.submitted_at = at;
            })
            .or_insert_with(|| LeaderboardEntry {
                pack_date,
                user_id: user_id.to_string(),
                score: candidate,
                submitted_at: at,
            });
        Ok(entry.clone())
    }

    async fn entries(&self, pack_date: NaiveDate) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let board = self.leaderboard.read().await;
        Ok(board
            .values()
            .filter(|e| e.pack_date == pack_date)
            .cloned()
            .collect())
    }

    async fn entry(
        &self,
        pack_date: NaiveDate,
        user_id: &str,
    ) -> Result<Option<LeaderboardEntry>, StoreError> {
        let board = self.leaderboard.read().await;
        Ok(board.get(&(pack_date, user_id.to_string())).cloned())
    }
}

#[async_trait]
impl PackStore for MemoryStore {
    async fn pack(&self, pack_date: NaiveDate) -> Result<Option<Vec<String>>, StoreError> {
        Ok(self.packs.read().await.get(&pack_date).cloned())
    }

    async fn save_pack_if_absent(
        &self,
        pack_date: NaiveDate,
        template_ids: Vec<String>,
    ) -> Result<Vec<String>, StoreError> {
        let mut packs = self.packs.write().await;
        Ok(packs.entry(pack_date).or_insert(template_ids).clone())
    }
}
