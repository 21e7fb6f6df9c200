//! Session lifecycle: start -> answer* -> end.
//!
//! All state lives in the stores between calls. The Active -> Ended transition
//! and the attempt insert are conditional writes, so concurrent `end` calls
//! finalize once and no attempt is accepted after the end.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::aggregator::{aggregate, SessionStats};
use crate::daily::DailyPackGenerator;
use crate::domain::{
    Answer, GameMode, GameSession, QuestionAttempt, QuestionTemplate, TemplateSubject,
};
use crate::error::{GameError, StoreError};
use crate::evaluator::{AnswerEvaluator, Evaluation, GroundTruth, ScoringInput};
use crate::leaderboard::LeaderboardMerger;
use crate::selector::{resolve_cards, QuestionCard, QuestionSelector};
use crate::store::{AttemptWrite, ContentStore, FinalizeOutcome, SessionStore, UserStore};
use crate::util::{parse_pack_date, Clock};

/// Re-aggregation rounds before a racing answer is reported as a conflict.
const MAX_FINALIZE_ROUNDS: usize = 3;

#[derive(Clone, Debug, Serialize)]
pub struct StartedSession {
    pub session: GameSession,
    pub questions: Vec<QuestionCard>,
}

#[derive(Clone, Debug)]
pub struct AttemptInput {
    pub template_id: String,
    pub question_index: u32,
    pub answer: Answer,
    pub response_time_ms: u32,
    pub hints_used: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct EndedSession {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub stats: SessionStats,
}

pub struct SessionManager {
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    content: Arc<dyn ContentStore>,
    selector: Arc<QuestionSelector>,
    daily: Arc<DailyPackGenerator>,
    evaluator: Arc<AnswerEvaluator>,
    leaderboard: Arc<LeaderboardMerger>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
        content: Arc<dyn ContentStore>,
        selector: Arc<QuestionSelector>,
        daily: Arc<DailyPackGenerator>,
        evaluator: Arc<AnswerEvaluator>,
        leaderboard: Arc<LeaderboardMerger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            users,
            content,
            selector,
            daily,
            evaluator,
            leaderboard,
            clock,
        }
    }

    /// Create an active session with its ordered question list.
    #[instrument(level = "info", skip(self), fields(%user_id, %mode))]
    pub async fn start(
        &self,
        user_id: &str,
        mode: &str,
        pack_date: Option<&str>,
    ) -> Result<StartedSession, GameError> {
        let mode = mode
            .parse::<GameMode>()
            .map_err(|unknown| GameError::InvalidMode(unknown.0))?;
        let pack_date: Option<NaiveDate> = match (mode, pack_date) {
            (GameMode::DailyChallenge, None) => return Err(GameError::MissingPackDate),
            (GameMode::DailyChallenge, Some(raw)) => Some(parse_pack_date(raw)?),
            // Only daily sessions carry a pack date.
            (_, _) => None,
        };

        if self.users.user(user_id).await?.is_none() {
            return Err(GameError::UserNotFound(user_id.to_string()));
        }

        let templates = match pack_date {
            Some(d) => self.daily.pack_for(d).await?,
            None => self.selector.select(mode).await?,
        };
        let questions = resolve_cards(self.content.as_ref(), &templates).await?;

        let session = GameSession {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            mode,
            pack_date,
            question_ids: templates.iter().map(|t| t.id.clone()).collect(),
            started_at: self.clock.now(),
            ended_at: None,
            total_score: 0,
            questions_count: 0,
            correct_count: 0,
            best_streak: 0,
        };
        self.sessions.insert_session(session.clone()).await?;
        info!(target: "session", id = %session.id, %user_id, %mode, questions = questions.len(), "Session started");

        Ok(StartedSession { session, questions })
    }

    /// Score one answer and store it as an immutable attempt.
    #[instrument(level = "info", skip(self, input), fields(%session_id, %acting_user, index = input.question_index))]
    pub async fn submit_answer(
        &self,
        session_id: Uuid,
        acting_user: &str,
        input: AttemptInput,
    ) -> Result<Evaluation, GameError> {
        let session = self.owned_session(session_id, acting_user).await?;
        if !session.is_active() {
            return Err(GameError::SessionNotActive(session_id));
        }

        let expected = session.question_ids.get(input.question_index as usize);
        if expected != Some(&input.template_id) {
            return Err(GameError::QuestionMismatch {
                index: input.question_index,
                template_id: input.template_id,
            });
        }

        let template = self
            .content
            .template(&input.template_id)
            .await?
            .ok_or_else(|| GameError::TemplateNotFound(input.template_id.clone()))?;
        // Daily packs mix modes; each question scores by its own template.
        let scoring_mode = match session.mode {
            GameMode::DailyChallenge => template.mode,
            m => m,
        };
        let truth = self.ground_truth(&template).await?;
        let evaluation = self.evaluator.evaluate(
            scoring_mode,
            &ScoringInput {
                template_id: &template.id,
                truth: &truth,
                answer: &input.answer,
                hints_used: input.hints_used,
                today: self.clock.today(),
            },
        )?;

        let attempt = QuestionAttempt {
            session_id,
            template_id: input.template_id,
            question_index: input.question_index,
            response_time_ms: input.response_time_ms,
            user_answer: input.answer,
            is_correct: evaluation.is_correct,
            error_value: evaluation.error_value,
            hints_used: input.hints_used,
            score_awarded: evaluation.score_awarded,
            answered_at: self.clock.now(),
        };
        match self.sessions.record_attempt(attempt).await? {
            AttemptWrite::Inserted => {}
            AttemptWrite::DuplicateIndex => {
                return Err(GameError::DuplicateAttempt {
                    session_id,
                    index: input.question_index,
                })
            }
            AttemptWrite::SessionEnded => return Err(GameError::SessionNotActive(session_id)),
            AttemptWrite::SessionMissing => return Err(GameError::SessionNotFound(session_id)),
        }

        info!(target: "session", %session_id, index = input.question_index, correct = evaluation.is_correct, score = evaluation.score_awarded, "Answer recorded");
        Ok(evaluation)
    }

    /// Finalize the session once and, for daily sessions, merge into the board.
    #[instrument(level = "info", skip(self), fields(%session_id, %acting_user))]
    pub async fn end(&self, session_id: Uuid, acting_user: &str) -> Result<EndedSession, GameError> {
        let session = self.owned_session(session_id, acting_user).await?;
        if !session.is_active() {
            return Err(GameError::AlreadyEnded(session_id));
        }

        let mut finalized = None;
        for _ in 0..MAX_FINALIZE_ROUNDS {
            let attempts = self.sessions.attempts(session_id).await?;
            let stats = aggregate(&attempts);
            match self
                .sessions
                .finalize_session(session_id, &stats, self.clock.now())
                .await?
            {
                FinalizeOutcome::Finalized(s) => {
                    finalized = Some((s, stats));
                    break;
                }
                FinalizeOutcome::Stale => continue,
                FinalizeOutcome::AlreadyEnded => return Err(GameError::AlreadyEnded(session_id)),
                FinalizeOutcome::SessionMissing => {
                    return Err(GameError::SessionNotFound(session_id))
                }
            }
        }
        let Some((session, stats)) = finalized else {
            return Err(StoreError::Conflict(format!(
                "session {session_id} kept receiving answers while ending"
            ))
            .into());
        };
        info!(target: "session", %session_id, total = stats.total_score, questions = stats.questions_count, correct = stats.correct_count, streak = stats.best_streak, "Session ended");

        if session.mode == GameMode::DailyChallenge {
            match session.pack_date {
                Some(d) => {
                    self.leaderboard
                        .merge(d, &session.user_id, stats.total_score)
                        .await?;
                }
                None => {
                    warn!(target: "session", %session_id, "Daily session without pack date; leaderboard skipped")
                }
            }
        }

        Ok(EndedSession { session_id, stats })
    }

    async fn owned_session(&self, id: Uuid, acting_user: &str) -> Result<GameSession, GameError> {
        let session = self
            .sessions
            .session(id)
            .await?
            .ok_or(GameError::SessionNotFound(id))?;
        if session.user_id != acting_user {
            warn!(target: "session", session_id = %id, %acting_user, "Rejected access to another user's session");
            return Err(GameError::NotAuthorized(id));
        }
        Ok(session)
    }

    async fn ground_truth(&self, template: &QuestionTemplate) -> Result<GroundTruth, GameError> {
        let malformed = || GameError::MalformedTemplate(template.id.clone());
        match &template.subject {
            TemplateSubject::Single { celebrity_id } => {
                let c = self.content.celebrity(celebrity_id).await?.ok_or_else(malformed)?;
                Ok(GroundTruth::Single(c))
            }
            TemplateSubject::Pair {
                celebrity_id_a,
                celebrity_id_b,
            } => {
                let a = self.content.celebrity(celebrity_id_a).await?.ok_or_else(malformed)?;
                let b = self.content.celebrity(celebrity_id_b).await?.ok_or_else(malformed)?;
                Ok(GroundTruth::Pair { a, b })
            }
        }
    }
}
