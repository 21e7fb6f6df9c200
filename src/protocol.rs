//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and clients independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Answer;
use crate::evaluator::Evaluation;
use crate::session::AttemptInput;

#[derive(Debug, Deserialize)]
pub struct StartSessionIn {
    pub mode: String,
    #[serde(default)]
    pub pack_date: Option<String>,
}

/// Body of `POST /sessions/:id/answer`. The answer is tagged by `mode`:
/// `{"mode": "AGE_GUESS", "age": 41}` or `{"mode": "WHO_OLDER", "choice": "A"}`.
#[derive(Debug, Deserialize)]
pub struct AnswerIn {
    pub template_id: String,
    pub question_index: u32,
    pub answer: Answer,
    #[serde(default)]
    pub response_time_ms: u32,
    #[serde(default)]
    pub hints_used: u32,
}

impl From<AnswerIn> for AttemptInput {
    fn from(a: AnswerIn) -> Self {
        Self {
            template_id: a.template_id,
            question_index: a.question_index,
            answer: a.answer,
            response_time_ms: a.response_time_ms,
            hints_used: a.hints_used,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnswerOut {
    pub session_id: Uuid,
    pub question_index: u32,
    #[serde(flatten)]
    pub evaluation: Evaluation,
}

/// Query strings stay raw here so bad numbers get the JSON error body.
#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

/// Error body for every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorOut {
    pub error: String,
    pub message: String,
}
