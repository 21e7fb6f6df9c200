//! Per-user lifetime stats and game history, derived from ended sessions.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::aggregator::accuracy_pct;
use crate::domain::{GameMode, GameSession};
use crate::error::GameError;
use crate::store::{SessionStore, UserStore};

pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UserStats {
  pub lifetime_score: i64,
  pub games_played: u32,
  pub total_correct: u32,
  pub total_questions: u32,
  pub accuracy_pct: f64,
  pub best_streak: u32,
  /// Distinct pack dates with at least one ended daily session.
  pub daily_challenges: u32,
  pub last_daily_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Serialize)]
pub struct HistoryEntry {
  pub session_id: Uuid,
  pub mode: GameMode,
  pub pack_date: Option<NaiveDate>,
  pub score: i64,
  pub correct_count: u32,
  pub questions_count: u32,
  pub best_streak: u32,
  pub accuracy: f64,
  pub played_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameHistory {
  pub games: Vec<HistoryEntry>,
  pub total_games: usize,
}

/// Fold ended sessions into lifetime stats. Active sessions are ignored.
pub fn summarize(sessions: &[GameSession]) -> UserStats {
  let mut stats = UserStats::default();
  let mut daily_dates = BTreeSet::new();
  for s in sessions.iter().filter(|s| !s.is_active()) {
    stats.lifetime_score += s.total_score;
    stats.games_played += 1;
    stats.total_correct += s.correct_count;
    stats.total_questions += s.questions_count;
    stats.best_streak = stats.best_streak.max(s.best_streak);
    if let (GameMode::DailyChallenge, Some(d)) = (s.mode, s.pack_date) {
      daily_dates.insert(d);
    }
  }
  stats.accuracy_pct = accuracy_pct(stats.total_correct, stats.total_questions);
  stats.daily_challenges = daily_dates.len() as u32;
  stats.last_daily_date = daily_dates.last().copied();
  stats
}

pub struct StatsReader {
  sessions: Arc<dyn SessionStore>,
  users: Arc<dyn UserStore>,
}

impl StatsReader {
  pub fn new(sessions: Arc<dyn SessionStore>, users: Arc<dyn UserStore>) -> Self {
    Self { sessions, users }
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn user_stats(&self, user_id: &str) -> Result<UserStats, GameError> {
    let sessions = self.ended_sessions(user_id).await?;
    Ok(summarize(&sessions))
  }

  /// Ended sessions, newest first.
  #[instrument(level = "debug", skip(self))]
  pub async fn history(
    &self,
    user_id: &str,
    limit: Option<usize>,
    offset: Option<usize>,
  ) -> Result<GameHistory, GameError> {
    let mut sessions = self.ended_sessions(user_id).await?;
    sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| a.id.cmp(&b.id)));
    let total_games = sessions.len();
    let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).min(MAX_HISTORY_LIMIT);

    let games = sessions
      .into_iter()
      .skip(offset.unwrap_or(0))
      .take(limit)
      .map(|s| HistoryEntry {
        session_id: s.id,
        mode: s.mode,
        pack_date: s.pack_date,
        score: s.total_score,
        correct_count: s.correct_count,
        questions_count: s.questions_count,
        best_streak: s.best_streak,
        accuracy: accuracy_pct(s.correct_count, s.questions_count),
        played_at: s.started_at,
      })
      .collect();
    Ok(GameHistory { games, total_games })
  }

  async fn ended_sessions(&self, user_id: &str) -> Result<Vec<GameSession>, GameError> {
    if self.users.user(user_id).await?.is_none() {
      return Err(GameError::UserNotFound(user_id.to_string()));
    }
    let mut sessions = self.sessions.sessions_for_user(user_id).await?;
    sessions.retain(|s| !s.is_active());
    Ok(sessions)
  }
}
