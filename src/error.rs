//! Error types surfaced by the engine and its storage collaborator.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::GameMode;

/// Failures reported by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    #[allow(dead_code)] // raised by networked backends
    Unavailable(String),
    #[error("storage conflict: {0}")]
    Conflict(String),
}

/// Coarse classification used by the transport layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    NotFound,
    State,
    Conflict,
    NotImplemented,
    Internal,
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid game mode: {0}")]
    InvalidMode(String),
    #[error("pack_date is required for DAILY_CHALLENGE")]
    MissingPackDate,
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("answer for {answered} submitted to a {expected} question")]
    AnswerModeMismatch { expected: GameMode, answered: GameMode },
    #[error("question {index} of this session is not template '{template_id}'")]
    QuestionMismatch { index: u32, template_id: String },
    #[error("invalid {param} '{value}', expected a non-negative integer")]
    InvalidQuery { param: &'static str, value: String },

    #[error("missing or invalid credentials")]
    Unauthenticated,
    #[error("session {0} belongs to another user")]
    NotAuthorized(Uuid),

    #[error("user '{0}' not found")]
    UserNotFound(String),
    #[error("session {0} not found")]
    SessionNotFound(Uuid),
    #[error("question template '{0}' not found")]
    TemplateNotFound(String),
    #[error("question template '{0}' is malformed")]
    MalformedTemplate(String),
    #[error("no questions available for {0}")]
    NoQuestionsAvailable(String),
    #[error("no completed daily session for {0}")]
    NoCompletedSession(String),

    #[error("session {0} has already ended")]
    SessionNotActive(Uuid),
    #[error("session {0} was already ended")]
    AlreadyEnded(Uuid),
    #[error("question {index} of session {session_id} was already answered")]
    DuplicateAttempt { session_id: Uuid, index: u32 },

    #[error("scoring for {0} is not implemented")]
    ModeNotImplemented(GameMode),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::InvalidMode(_)
            | GameError::MissingPackDate
            | GameError::InvalidDate(_)
            | GameError::AnswerModeMismatch { .. }
            | GameError::QuestionMismatch { .. }
            | GameError::InvalidQuery { .. } => ErrorKind::Validation,
            GameError::Unauthenticated | GameError::NotAuthorized(_) => ErrorKind::Auth,
            GameError::UserNotFound(_)
            | GameError::SessionNotFound(_)
            | GameError::TemplateNotFound(_)
            | GameError::NoQuestionsAvailable(_)
            | GameError::NoCompletedSession(_) => ErrorKind::NotFound,
            GameError::SessionNotActive(_)
            | GameError::AlreadyEnded(_)
            | GameError::DuplicateAttempt { .. } => ErrorKind::State,
            GameError::ModeNotImplemented(_) => ErrorKind::NotImplemented,
            GameError::MalformedTemplate(_) => ErrorKind::Internal,
            GameError::Storage(StoreError::Conflict(_)) => ErrorKind::Conflict,
            GameError::Storage(StoreError::Unavailable(_)) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidMode(_) => "INVALID_MODE",
            GameError::MissingPackDate => "MISSING_PACK_DATE",
            GameError::InvalidDate(_) => "INVALID_DATE",
            GameError::AnswerModeMismatch { .. } => "ANSWER_MODE_MISMATCH",
            GameError::QuestionMismatch { .. } => "QUESTION_MISMATCH",
            GameError::InvalidQuery { .. } => "INVALID_QUERY",
            GameError::Unauthenticated => "UNAUTHENTICATED",
            GameError::NotAuthorized(_) => "NOT_AUTHORIZED",
            GameError::UserNotFound(_) => "USER_NOT_FOUND",
            GameError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            GameError::TemplateNotFound(_) => "TEMPLATE_NOT_FOUND",
            GameError::MalformedTemplate(_) => "MALFORMED_TEMPLATE",
            GameError::NoQuestionsAvailable(_) => "NO_QUESTIONS_AVAILABLE",
            GameError::NoCompletedSession(_) => "NO_COMPLETED_SESSION",
            GameError::SessionNotActive(_) => "SESSION_NOT_ACTIVE",
            GameError::AlreadyEnded(_) => "ALREADY_ENDED",
            GameError::DuplicateAttempt { .. } => "DUPLICATE_ATTEMPT",
            GameError::ModeNotImplemented(_) => "MODE_NOT_IMPLEMENTED",
            GameError::Storage(StoreError::Conflict(_)) => "STORAGE_CONFLICT",
            GameError::Storage(StoreError::Unavailable(_)) => "STORAGE_UNAVAILABLE",
        }
    }
}
