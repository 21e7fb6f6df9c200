//! Daily leaderboard: best-score merge and competition ranking.
//! The all-time board ranks lifetime totals derived from ended sessions.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, instrument};

use crate::domain::LeaderboardEntry;
use crate::error::GameError;
use crate::stats::summarize;
use crate::store::{LeaderboardStore, SessionStore, UserStore};
use crate::util::Clock;

#[derive(Clone, Debug, Serialize)]
pub struct RankedEntry {
    pub rank: u32,
    pub user_id: String,
    pub display_name: String,
    pub score: i64,
    pub is_current_user: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct DailyLeaderboard {
    pub pack_date: NaiveDate,
    pub entries: Vec<RankedEntry>,
    pub total_players: usize,
    pub current_user_rank: Option<u32>,
    pub current_user_score: Option<i64>,
}

/// Result of submitting a day's score.
#[derive(Clone, Debug, Serialize)]
pub struct DailySubmission {
    pub pack_date: NaiveDate,
    /// Best completed session total that was offered to the board.
    pub submitted_score: i64,
    /// Score stored on the board after the merge.
    pub best_score: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct AllTimeEntry {
    pub rank: u32,
    pub user_id: String,
    pub display_name: String,
    pub lifetime_score: i64,
    pub games_played: u32,
    pub accuracy_pct: f64,
    pub best_streak: u32,
    pub is_current_user: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct AllTimeLeaderboard {
    pub entries: Vec<AllTimeEntry>,
    /// Users with at least one ended session.
    pub total_players: usize,
    pub current_user_rank: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PackStatus {
    pub completed: bool,
    pub score: Option<i64>,
}

/// The max-merge rule on its own.
pub fn merged_score(existing: Option<i64>, incoming: i64) -> i64 {
    existing.map_or(incoming, |e| e.max(incoming))
}

/// SQL `RANK()` over score descending: ties share a rank and the next
/// distinct score skips past the tied group. Ties keep key order.
fn competition_rank<T>(
    mut items: Vec<T>,
    score: impl Fn(&T) -> i64,
    key: impl Fn(&T) -> &str,
) -> Vec<(u32, T)> {
    items.sort_by(|a, b| score(b).cmp(&score(a)).then_with(|| key(a).cmp(key(b))));
    let mut out = Vec::with_capacity(items.len());
    let mut rank = 0u32;
    let mut prev: Option<i64> = None;
    for (pos, item) in items.into_iter().enumerate() {
        let s = score(&item);
        if prev != Some(s) {
            rank = pos as u32 + 1;
            prev = Some(s);
        }
        out.push((rank, item));
    }
    out
}

pub fn rank_entries(entries: Vec<LeaderboardEntry>) -> Vec<(u32, LeaderboardEntry)> {
    competition_rank(entries, |e| e.score, |e| e.user_id.as_str())
}

pub struct LeaderboardMerger {
    board: Arc<dyn LeaderboardStore>,
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
}

impl LeaderboardMerger {
    pub fn new(
        board: Arc<dyn LeaderboardStore>,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            board,
            sessions,
            users,
            clock,
        }
    }

    /// Keep the best score for `(pack_date, user_id)`. Atomic in the store.
    #[instrument(level = "info", skip(self), fields(%pack_date, %user_id))]
    pub async fn merge(
        &self,
        pack_date: NaiveDate,
        user_id: &str,
        candidate: i64,
    ) -> Result<LeaderboardEntry, GameError> {
        let entry = self
            .board
            .merge_max(pack_date, user_id, candidate, self.clock.now())
            .await?;
        info!(target: "leaderboard", %pack_date, %user_id, candidate, stored = entry.score, "Daily score merged");
        Ok(entry)
    }

    /// Offer the user's best completed daily session for the date to the board.
    #[instrument(level = "info", skip(self), fields(%pack_date, %user_id))]
    pub async fn submit_daily(
        &self,
        pack_date: NaiveDate,
        user_id: &str,
    ) -> Result<DailySubmission, GameError> {
        let submitted_score = self
            .sessions
            .best_completed_daily(user_id, pack_date)
            .await?
            .ok_or_else(|| GameError::NoCompletedSession(pack_date.to_string()))?;
        let entry = self.merge(pack_date, user_id, submitted_score).await?;
        Ok(DailySubmission {
            pack_date,
            submitted_score,
            best_score: entry.score,
        })
    }

    /// Top `limit` ranked entries for the date.
    #[instrument(level = "debug", skip(self))]
    pub async fn daily(
        &self,
        pack_date: NaiveDate,
        limit: usize,
        current_user: Option<&str>,
    ) -> Result<DailyLeaderboard, GameError> {
        let all = self.board.entries(pack_date).await?;
        let total_players = all.len();
        let ranked = rank_entries(all);

        let mut entries = Vec::with_capacity(limit.min(ranked.len()));
        let mut current_user_rank = None;
        let mut current_user_score = None;
        for (rank, e) in ranked.into_iter().take(limit) {
            let is_current_user = current_user == Some(e.user_id.as_str());
            if is_current_user {
                current_user_rank = Some(rank);
                current_user_score = Some(e.score);
            }
            let display_name = self.display_name(&e.user_id).await?;
            entries.push(RankedEntry {
                rank,
                user_id: e.user_id,
                display_name,
                score: e.score,
                is_current_user,
            });
        }

        Ok(DailyLeaderboard {
            pack_date,
            entries,
            total_players,
            current_user_rank,
            current_user_score,
        })
    }

    /// Top `limit` players by lifetime score. Users without an ended session
    /// are not on the board.
    #[instrument(level = "debug", skip(self))]
    pub async fn all_time(
        &self,
        limit: usize,
        current_user: Option<&str>,
    ) -> Result<AllTimeLeaderboard, GameError> {
        let mut by_user: HashMap<String, Vec<_>> = HashMap::new();
        for s in self.sessions.ended_sessions().await? {
            by_user.entry(s.user_id.clone()).or_default().push(s);
        }
        let players: Vec<(String, _)> = by_user
            .into_iter()
            .map(|(user_id, sessions)| (user_id, summarize(&sessions)))
            .filter(|(_, stats)| stats.games_played > 0)
            .collect();
        let total_players = players.len();
        let ranked = competition_rank(players, |(_, st)| st.lifetime_score, |(u, _)| u.as_str());

        let mut entries = Vec::with_capacity(limit.min(ranked.len()));
        let mut current_user_rank = None;
        for (rank, (user_id, stats)) in ranked.into_iter().take(limit) {
            let is_current_user = current_user == Some(user_id.as_str());
            if is_current_user {
                current_user_rank = Some(rank);
            }
            entries.push(AllTimeEntry {
                rank,
                display_name: self.display_name(&user_id).await?,
                is_current_user,
                user_id,
                lifetime_score: stats.lifetime_score,
                games_played: stats.games_played,
                accuracy_pct: stats.accuracy_pct,
                best_streak: stats.best_streak,
            });
        }
        info!(target: "leaderboard", total_players, shown = entries.len(), "All-time board served");

        Ok(AllTimeLeaderboard {
            entries,
            total_players,
            current_user_rank,
        })
    }

    async fn display_name(&self, user_id: &str) -> Result<String, GameError> {
        Ok(match self.users.user(user_id).await? {
            Some(u) => u.display_name_or_anonymous(),
            None => "Anonymous".to_string(),
        })
    }

    pub async fn status(&self, pack_date: NaiveDate, user_id: &str) -> Result<PackStatus, GameError> {
        let entry = self.board.entry(pack_date, user_id).await?;
        Ok(PackStatus {
            completed: entry.is_some(),
            score: entry.map(|e| e.score),
        })
    }
}
