//! Answer scoring, one strategy per game mode.
//!
//! AGE_GUESS is tiered by absolute error in years, WHO_OLDER is binary. The
//! REVERSE_* modes have no registered scorer and are reported as not
//! implemented rather than scored as zero.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::domain::{Answer, Celebrity, Choice, CorrectAnswer, GameMode};
use crate::error::GameError;
use crate::util::age_in_years;

/// Any hint use costs 20%, once, no matter how many hints were opened.
const HINT_PENALTY_NUM: i32 = 4;
const HINT_PENALTY_DEN: i32 = 5;

const WHO_OLDER_POINTS: i32 = 100;

/// Facts a question is scored against, resolved from the template's celebrities.
#[derive(Clone, Debug)]
pub enum GroundTruth {
  Single(Celebrity),
  Pair { a: Celebrity, b: Celebrity },
}

/// What the evaluator hands back for one answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Evaluation {
  pub is_correct: bool,
  pub score_awarded: i32,
  pub correct_answer: CorrectAnswer,
  pub error_value: Option<i32>,
}

pub struct ScoringInput<'a> {
  pub template_id: &'a str,
  pub truth: &'a GroundTruth,
  pub answer: &'a Answer,
  pub hints_used: u32,
  pub today: NaiveDate,
}

/// Scoring strategy for a single mode.
pub trait ModeScorer: Send + Sync {
  fn mode(&self) -> GameMode;
  fn score(&self, input: &ScoringInput<'_>) -> Result<Evaluation, GameError>;
}

/// Base points for an AGE_GUESS error of `error` years.
pub fn age_guess_tier(error: u32) -> i32 {
  match error {
    0 => 100,
    1 => 80,
    2 => 60,
    3 => 40,
    4 | 5 => 20,
    _ => 0,
  }
}

/// Integer form of `trunc(points * 0.8)`.
pub fn apply_hint_penalty(points: i32, hints_used: u32) -> i32 {
  if hints_used > 0 { points * HINT_PENALTY_NUM / HINT_PENALTY_DEN } else { points }
}

/// Older celebrity wins; equal birth dates resolve to `A`.
pub fn older_choice(dob_a: NaiveDate, dob_b: NaiveDate) -> Choice {
  if dob_b < dob_a { Choice::B } else { Choice::A }
}

pub struct AgeGuessScorer;

impl ModeScorer for AgeGuessScorer {
  fn mode(&self) -> GameMode { GameMode::AgeGuess }

  fn score(&self, input: &ScoringInput<'_>) -> Result<Evaluation, GameError> {
    let GroundTruth::Single(celebrity) = input.truth else {
      return Err(GameError::MalformedTemplate(input.template_id.to_string()));
    };
    let Answer::AgeGuess { age } = input.answer else {
      return Err(GameError::AnswerModeMismatch { expected: self.mode(), answered: input.answer.mode() });
    };

    let correct_age = age_in_years(celebrity.date_of_birth, input.today);
    // abs_diff spans the full i32 range; the reported error saturates.
    let error = correct_age.abs_diff(*age);
    let score_awarded = apply_hint_penalty(age_guess_tier(error), input.hints_used);
    Ok(Evaluation {
      is_correct: error <= 1,
      score_awarded,
      correct_answer: CorrectAnswer::Age { age: correct_age },
      error_value: Some(i32::try_from(error).unwrap_or(i32::MAX)),
    })
  }
}

pub struct WhoOlderScorer;

impl ModeScorer for WhoOlderScorer {
  fn mode(&self) -> GameMode { GameMode::WhoOlder }

  fn score(&self, input: &ScoringInput<'_>) -> Result<Evaluation, GameError> {
    let GroundTruth::Pair { a, b } = input.truth else {
      return Err(GameError::MalformedTemplate(input.template_id.to_string()));
    };
    let Answer::WhoOlder { choice } = input.answer else {
      return Err(GameError::AnswerModeMismatch { expected: self.mode(), answered: input.answer.mode() });
    };

    let correct = older_choice(a.date_of_birth, b.date_of_birth);
    let is_correct = *choice == correct;
    Ok(Evaluation {
      is_correct,
      score_awarded: if is_correct { WHO_OLDER_POINTS } else { 0 },
      correct_answer: CorrectAnswer::Choice { choice: correct },
      error_value: None,
    })
  }
}

/// Dispatches to the scorer registered for a question's mode.
pub struct AnswerEvaluator {
  scorers: HashMap<GameMode, Box<dyn ModeScorer>>,
}

impl AnswerEvaluator {
  pub fn empty() -> Self {
    Self { scorers: HashMap::new() }
  }

  /// AGE_GUESS and WHO_OLDER scorers.
  pub fn standard() -> Self {
    let mut ev = Self::empty();
    ev.register(Box::new(AgeGuessScorer));
    ev.register(Box::new(WhoOlderScorer));
    ev
  }

  /// Install or replace the scorer for its mode.
  pub fn register(&mut self, scorer: Box<dyn ModeScorer>) {
    self.scorers.insert(scorer.mode(), scorer);
  }

  pub fn supports(&self, mode: GameMode) -> bool {
    self.scorers.contains_key(&mode)
  }

  pub fn evaluate(&self, mode: GameMode, input: &ScoringInput<'_>) -> Result<Evaluation, GameError> {
    if input.answer.mode() != mode {
      return Err(GameError::AnswerModeMismatch { expected: mode, answered: input.answer.mode() });
    }
    let scorer = self.scorers.get(&mode).ok_or(GameError::ModeNotImplemented(mode))?;
    let ev = scorer.score(input)?;
    debug!(target: "session", template = %input.template_id, %mode, correct = ev.is_correct, score = ev.score_awarded, "Answer scored");
    Ok(ev)
  }
}

impl Default for AnswerEvaluator {
  fn default() -> Self { Self::standard() }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn celeb(id: &str, dob: NaiveDate) -> Celebrity {
    Celebrity {
      id: id.into(),
      full_name: id.to_uppercase(),
      date_of_birth: dob,
      star_sign: None,
      primary_category: "Film".into(),
      nationality: None,
      hints_easy: vec![],
    }
  }

  fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  // Born 1980-06-15; on 2020-06-20 that is 14615 days, 40 years by the /365 rule.
  fn age_truth() -> GroundTruth {
    GroundTruth::Single(celeb("c1", ymd(1980, 6, 15)))
  }

  fn score_age(age: i32, hints_used: u32) -> Evaluation {
    let truth = age_truth();
    let answer = Answer::AgeGuess { age };
    let input = ScoringInput { template_id: "t1", truth: &truth, answer: &answer, hints_used, today: ymd(2020, 6, 20) };
    AnswerEvaluator::standard().evaluate(GameMode::AgeGuess, &input).unwrap()
  }

  #[test]
  fn exact_age_scores_full_marks() {
    let ev = score_age(40, 0);
    assert_eq!(ev, Evaluation {
      is_correct: true,
      score_awarded: 100,
      correct_answer: CorrectAnswer::Age { age: 40 },
      error_value: Some(0),
    });
  }

  #[test]
  fn off_by_one_is_still_correct() {
    let ev = score_age(41, 0);
    assert!(ev.is_correct);
    assert_eq!(ev.score_awarded, 80);
    assert!(!score_age(42, 0).is_correct);
  }

  #[test]
  fn hint_penalty_truncates_once() {
    assert_eq!(score_age(43, 1).score_awarded, 32);
    assert_eq!(score_age(43, 4).score_awarded, 32);
    assert_eq!(score_age(40, 2).score_awarded, 80);
    assert_eq!(apply_hint_penalty(80, 1), 64);
  }

  #[test]
  fn age_score_never_increases_with_error() {
    let mut last = i32::MAX;
    for err in 0..12 {
      let s = age_guess_tier(err);
      assert!(s <= last, "tier rose at error {err}");
      last = s;
    }
    assert_eq!(age_guess_tier(5), 20);
    assert_eq!(age_guess_tier(6), 0);
    assert_eq!(score_age(30, 0).error_value, Some(10));
  }

  #[test]
  fn extreme_age_guesses_score_zero() {
    for age in [i32::MIN, i32::MAX, -1] {
      let ev = score_age(age, 0);
      assert!(!ev.is_correct, "age {age} counted as correct");
      assert_eq!(ev.score_awarded, 0);
      assert_eq!(ev.correct_answer, CorrectAnswer::Age { age: 40 });
    }
    assert_eq!(score_age(i32::MIN, 0).error_value, Some(i32::MAX));
    assert_eq!(score_age(i32::MAX, 0).error_value, Some(i32::MAX - 40));
    assert_eq!(score_age(-1, 0).error_value, Some(41));
    assert_eq!(age_guess_tier(u32::MAX), 0);
  }

  #[test]
  fn who_older_flips_when_pair_is_swapped() {
    let older = celeb("old", ymd(1950, 1, 1));
    let younger = celeb("young", ymd(1990, 1, 1));
    let answer = Answer::WhoOlder { choice: Choice::A };
    let ev = AnswerEvaluator::standard();

    let ab = GroundTruth::Pair { a: older.clone(), b: younger.clone() };
    let input = ScoringInput { template_id: "t", truth: &ab, answer: &answer, hints_used: 0, today: ymd(2024, 1, 1) };
    let r1 = ev.evaluate(GameMode::WhoOlder, &input).unwrap();
    assert_eq!(r1.correct_answer, CorrectAnswer::Choice { choice: Choice::A });
    assert_eq!(r1.score_awarded, 100);

    let ba = GroundTruth::Pair { a: younger, b: older };
    let input = ScoringInput { truth: &ba, ..input };
    let r2 = ev.evaluate(GameMode::WhoOlder, &input).unwrap();
    assert_eq!(r2.correct_answer, CorrectAnswer::Choice { choice: Choice::B });
    assert!(!r2.is_correct);
    assert_eq!(r2.score_awarded, 0);
  }

  #[test]
  fn equal_birth_dates_resolve_to_a() {
    let d = ymd(1970, 3, 3);
    assert_eq!(older_choice(d, d), Choice::A);
  }

  #[test]
  fn reverse_modes_are_not_silently_scored() {
    let truth = age_truth();
    let answer = Answer::ReverseSign { star_sign: "Gemini".into() };
    let input = ScoringInput { template_id: "t", truth: &truth, answer: &answer, hints_used: 0, today: ymd(2024, 1, 1) };
    let err = AnswerEvaluator::standard().evaluate(GameMode::ReverseSign, &input).unwrap_err();
    assert!(matches!(err, GameError::ModeNotImplemented(GameMode::ReverseSign)));
  }

  #[test]
  fn answer_for_other_mode_is_rejected() {
    let truth = age_truth();
    let answer = Answer::WhoOlder { choice: Choice::B };
    let input = ScoringInput { template_id: "t", truth: &truth, answer: &answer, hints_used: 0, today: ymd(2024, 1, 1) };
    let err = AnswerEvaluator::standard().evaluate(GameMode::AgeGuess, &input).unwrap_err();
    assert!(matches!(err, GameError::AnswerModeMismatch { expected: GameMode::AgeGuess, answered: GameMode::WhoOlder }));
  }
}
