//! Domain models used by the backend: game modes, celebrities, question templates,
//! sessions, attempts and leaderboard entries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which game is being played?
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
  /// Guess a celebrity's current age.
  AgeGuess,
  /// Pick the older of two celebrities.
  WhoOlder,
  /// Guess the date of birth (reserved, not scored yet).
  ReverseDob,
  /// Guess the star sign (reserved, not scored yet).
  ReverseSign,
  /// The shared pack of the day; questions keep their own template mode.
  DailyChallenge,
}

impl GameMode {
  pub const ALL: [GameMode; 5] = [
    GameMode::AgeGuess,
    GameMode::WhoOlder,
    GameMode::ReverseDob,
    GameMode::ReverseSign,
    GameMode::DailyChallenge,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      GameMode::AgeGuess => "AGE_GUESS",
      GameMode::WhoOlder => "WHO_OLDER",
      GameMode::ReverseDob => "REVERSE_DOB",
      GameMode::ReverseSign => "REVERSE_SIGN",
      GameMode::DailyChallenge => "DAILY_CHALLENGE",
    }
  }

  /// True for modes whose templates reference a pair of celebrities.
  pub fn is_pair_mode(&self) -> bool {
    matches!(self, GameMode::WhoOlder)
  }
}

impl fmt::Display for GameMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Unknown mode string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl FromStr for GameMode {
  type Err = UnknownMode;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    GameMode::ALL
      .iter()
      .copied()
      .find(|m| m.as_str() == s)
      .ok_or_else(|| UnknownMode(s.to_string()))
  }
}

/// Registered player.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserAccount {
  pub id: String,
  #[serde(default)] pub display_name: Option<String>,
}

impl UserAccount {
  pub fn display_name_or_anonymous(&self) -> String {
    self.display_name.clone().filter(|n| !n.trim().is_empty()).unwrap_or_else(|| "Anonymous".into())
  }
}

/// Celebrity data as supplied by the content store (read-only here).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Celebrity {
  pub id: String,
  pub full_name: String,
  pub date_of_birth: NaiveDate,
  #[serde(default)] pub star_sign: Option<String>,
  #[serde(default)] pub primary_category: String,
  #[serde(default)] pub nationality: Option<String>,
  #[serde(default)] pub hints_easy: Vec<String>,
}

/// Who a template asks about. Exactly one shape per template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateSubject {
  Single { celebrity_id: String },
  Pair { celebrity_id_a: String, celebrity_id_b: String },
}

/// Authored definition of a question, independent of any session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuestionTemplate {
  pub id: String,
  pub mode: GameMode,
  pub difficulty: u8, // 1..=5
  pub is_active: bool,
  pub subject: TemplateSubject,
}

impl QuestionTemplate {
  /// Subject shape agrees with the mode and difficulty is in range.
  pub fn is_well_formed(&self) -> bool {
    let shape_ok = match (&self.subject, self.mode) {
      (TemplateSubject::Pair { .. }, m) => m.is_pair_mode(),
      (TemplateSubject::Single { .. }, GameMode::DailyChallenge) => false,
      (TemplateSubject::Single { .. }, m) => !m.is_pair_mode(),
    };
    shape_ok && (1..=5).contains(&self.difficulty)
  }
}

/// Lifecycle of a persisted session. A session is stored already active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
  Active,
  Ended,
}

/// One play session. Immutable once `ended_at` is set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameSession {
  pub id: Uuid,
  pub user_id: String,
  pub mode: GameMode,
  pub pack_date: Option<NaiveDate>,
  /// Template ids in the order they were handed to the player.
  pub question_ids: Vec<String>,
  pub started_at: DateTime<Utc>,
  pub ended_at: Option<DateTime<Utc>>,
  pub total_score: i64,
  pub questions_count: u32,
  pub correct_count: u32,
  pub best_streak: u32,
}

impl GameSession {
  pub fn state(&self) -> SessionState {
    if self.ended_at.is_some() { SessionState::Ended } else { SessionState::Active }
  }

  pub fn is_active(&self) -> bool {
    self.state() == SessionState::Active
  }
}

/// Which of the two celebrities a WHO_OLDER answer points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Choice {
  A,
  B,
}

/// Submitted answer, keyed by the mode it answers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Answer {
  AgeGuess { age: i32 },
  WhoOlder { choice: Choice },
  ReverseDob { date_of_birth: NaiveDate },
  ReverseSign { star_sign: String },
}

impl Answer {
  pub fn mode(&self) -> GameMode {
    match self {
      Answer::AgeGuess { .. } => GameMode::AgeGuess,
      Answer::WhoOlder { .. } => GameMode::WhoOlder,
      Answer::ReverseDob { .. } => GameMode::ReverseDob,
      Answer::ReverseSign { .. } => GameMode::ReverseSign,
    }
  }
}

/// Ground truth revealed to the player after answering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
  Age { age: i32 },
  Choice { choice: Choice },
}

/// One scored answer. Never mutated after insert.
#[derive(Clone, Debug, Serialize)]
pub struct QuestionAttempt {
  pub session_id: Uuid,
  pub template_id: String,
  pub question_index: u32,
  pub response_time_ms: u32,
  pub user_answer: Answer,
  pub is_correct: bool,
  pub error_value: Option<i32>,
  pub hints_used: u32,
  pub score_awarded: i32,
  pub answered_at: DateTime<Utc>,
}

/// Best daily score for a `(pack_date, user_id)` key.
#[derive(Clone, Debug, Serialize)]
pub struct LeaderboardEntry {
  pub pack_date: NaiveDate,
  pub user_id: String,
  pub score: i64,
  pub submitted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mode_parses_only_the_fixed_enum() {
    assert_eq!("WHO_OLDER".parse::<GameMode>(), Ok(GameMode::WhoOlder));
    assert_eq!("DAILY_CHALLENGE".parse::<GameMode>(), Ok(GameMode::DailyChallenge));
    assert!("who_older".parse::<GameMode>().is_err());
    assert!("TRIVIA".parse::<GameMode>().is_err());
  }

  #[test]
  fn answer_json_is_tagged_by_mode() {
    let a: Answer = serde_json::from_str(r#"{"mode":"AGE_GUESS","age":41}"#).unwrap();
    assert_eq!(a, Answer::AgeGuess { age: 41 });
    let b: Answer = serde_json::from_str(r#"{"mode":"WHO_OLDER","choice":"B"}"#).unwrap();
    assert_eq!(b.mode(), GameMode::WhoOlder);
    assert!(serde_json::from_str::<Answer>(r#"{"mode":"WHO_OLDER","choice":"C"}"#).is_err());
  }

  #[test]
  fn template_shape_must_match_mode() {
    let mut t = QuestionTemplate {
      id: "t1".into(),
      mode: GameMode::WhoOlder,
      difficulty: 3,
      is_active: true,
      subject: TemplateSubject::Single { celebrity_id: "c1".into() },
    };
    assert!(!t.is_well_formed());
    t.subject = TemplateSubject::Pair { celebrity_id_a: "c1".into(), celebrity_id_b: "c2".into() };
    assert!(t.is_well_formed());
    t.difficulty = 6;
    assert!(!t.is_well_formed());
  }
}
