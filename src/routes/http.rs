//! HTTP endpoint handlers. These are thin wrappers that authenticate, forward
//! to the engine and map typed results to JSON.
//! Each handler is instrumented; ids and outcomes are logged, tokens never are.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::{header::AUTHORIZATION, HeaderMap, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{ErrorKind, GameError, StoreError};
use crate::identity::{bearer_token, Identity};
use crate::leaderboard::{AllTimeLeaderboard, DailyLeaderboard, DailySubmission, PackStatus};
use crate::protocol::*;
use crate::session::{EndedSession, StartedSession};
use crate::state::{AppState, DailyPackView};
use crate::stats::{GameHistory, UserStats};
use crate::util::{parse_count, parse_pack_date};

type ApiResult<T> = Result<Json<T>, GameError>;

impl IntoResponse for GameError {
  fn into_response(self) -> Response {
    let status = match (self.kind(), &self) {
      (ErrorKind::Validation, _) => StatusCode::BAD_REQUEST,
      (ErrorKind::Auth, GameError::Unauthenticated) => StatusCode::UNAUTHORIZED,
      (ErrorKind::Auth, _) => StatusCode::FORBIDDEN,
      (ErrorKind::NotFound, _) => StatusCode::NOT_FOUND,
      (ErrorKind::State, _) | (ErrorKind::Conflict, _) => StatusCode::CONFLICT,
      (ErrorKind::NotImplemented, _) => StatusCode::NOT_IMPLEMENTED,
      (ErrorKind::Internal, GameError::Storage(StoreError::Unavailable(_))) => StatusCode::SERVICE_UNAVAILABLE,
      (ErrorKind::Internal, _) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
      error!(target: "trivia_backend", code = self.code(), error = %self, "Request failed");
    } else {
      warn!(target: "trivia_backend", code = self.code(), error = %self, "Request rejected");
    }
    let body = ErrorOut { error: self.code().to_string(), message: self.to_string() };
    (status, Json(body)).into_response()
  }
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Identity, GameError> {
  let token = headers
    .get(AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(bearer_token)
    .ok_or(GameError::Unauthenticated)?;
  state.verifier.verify(token).await
}

/// Anonymous when no credentials are sent; a bad token is still an error.
async fn authenticate_optional(state: &AppState, headers: &HeaderMap) -> Result<Option<Identity>, GameError> {
  if headers.contains_key(AUTHORIZATION) {
    authenticate(state, headers).await.map(Some)
  } else {
    Ok(None)
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, headers, body), fields(mode = %body.mode))]
pub async fn http_start_session(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(body): Json<StartSessionIn>,
) -> ApiResult<StartedSession> {
  let who = authenticate(&state, &headers).await?;
  let started = state
    .engine
    .sessions
    .start(&who.user_id, &body.mode, body.pack_date.as_deref())
    .await?;
  info!(target: "session", id = %started.session.id, user = %who.user_id, questions = started.questions.len(), "HTTP session started");
  Ok(Json(started))
}

#[instrument(level = "info", skip(state, headers, body), fields(%session_id, index = body.question_index))]
pub async fn http_submit_answer(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(session_id): Path<Uuid>,
  Json(body): Json<AnswerIn>,
) -> ApiResult<AnswerOut> {
  let who = authenticate(&state, &headers).await?;
  let question_index = body.question_index;
  let evaluation = state
    .engine
    .sessions
    .submit_answer(session_id, &who.user_id, body.into())
    .await?;
  Ok(Json(AnswerOut { session_id, question_index, evaluation }))
}

#[instrument(level = "info", skip(state, headers), fields(%session_id))]
pub async fn http_end_session(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(session_id): Path<Uuid>,
) -> ApiResult<EndedSession> {
  let who = authenticate(&state, &headers).await?;
  Ok(Json(state.engine.sessions.end(session_id, &who.user_id).await?))
}

#[instrument(level = "info", skip(state, headers), fields(%date))]
pub async fn http_daily_pack(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(date): Path<String>,
) -> ApiResult<DailyPackView> {
  let who = authenticate_optional(&state, &headers).await?;
  let view = state
    .engine
    .daily_pack(&date, who.as_ref().map(|i| i.user_id.as_str()))
    .await?;
  info!(target: "daily_pack", %date, questions = view.questions.len(), completed = view.is_completed, "HTTP daily pack served");
  Ok(Json(view))
}

#[instrument(level = "info", skip(state, headers), fields(%date))]
pub async fn http_daily_pack_status(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(date): Path<String>,
) -> ApiResult<PackStatus> {
  let who = authenticate(&state, &headers).await?;
  let pack_date = parse_pack_date(&date)?;
  Ok(Json(state.engine.leaderboard.status(pack_date, &who.user_id).await?))
}

#[instrument(level = "info", skip(state, headers), fields(%date, limit = ?q.limit))]
pub async fn http_daily_leaderboard(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(date): Path<String>,
  Query(q): Query<LeaderboardQuery>,
) -> ApiResult<DailyLeaderboard> {
  let who = authenticate_optional(&state, &headers).await?;
  let pack_date = parse_pack_date(&date)?;
  let limit = parse_count("limit", q.limit.as_deref())?
    .unwrap_or(state.engine.settings.leaderboard_default_limit);
  let board = state
    .engine
    .leaderboard
    .daily(pack_date, limit, who.as_ref().map(|i| i.user_id.as_str()))
    .await?;
  Ok(Json(board))
}

#[instrument(level = "info", skip(state, headers), fields(limit = ?q.limit))]
pub async fn http_all_time_leaderboard(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Query(q): Query<LeaderboardQuery>,
) -> ApiResult<AllTimeLeaderboard> {
  let who = authenticate_optional(&state, &headers).await?;
  let limit = parse_count("limit", q.limit.as_deref())?
    .unwrap_or(state.engine.settings.leaderboard_default_limit);
  let board = state
    .engine
    .leaderboard
    .all_time(limit, who.as_ref().map(|i| i.user_id.as_str()))
    .await?;
  Ok(Json(board))
}

#[instrument(level = "info", skip(state, headers), fields(%date))]
pub async fn http_submit_daily(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(date): Path<String>,
) -> ApiResult<DailySubmission> {
  let who = authenticate(&state, &headers).await?;
  let pack_date = parse_pack_date(&date)?;
  Ok(Json(state.engine.leaderboard.submit_daily(pack_date, &who.user_id).await?))
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_user_stats(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
) -> ApiResult<UserStats> {
  let who = authenticate(&state, &headers).await?;
  Ok(Json(state.engine.stats.user_stats(&who.user_id).await?))
}

#[instrument(level = "info", skip(state, headers), fields(limit = ?q.limit, offset = ?q.offset))]
pub async fn http_user_history(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Query(q): Query<HistoryQuery>,
) -> ApiResult<GameHistory> {
  let who = authenticate(&state, &headers).await?;
  let limit = parse_count("limit", q.limit.as_deref())?;
  let offset = parse_count("offset", q.offset.as_deref())?;
  Ok(Json(state.engine.stats.history(&who.user_id, limit, offset).await?))
}
