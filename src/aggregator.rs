//! Folds a session's attempts into its final statistics.

use serde::Serialize;

use crate::domain::QuestionAttempt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SessionStats {
  pub total_score: i64,
  pub questions_count: u32,
  pub correct_count: u32,
  /// Longest run of consecutive correct answers in question order.
  pub best_streak: u32,
  /// Percentage in `0.0..=100.0`; zero when nothing was answered.
  pub accuracy: f64,
}

pub fn accuracy_pct(correct: u32, total: u32) -> f64 {
  if total == 0 { 0.0 } else { correct as f64 / total as f64 * 100.0 }
}

/// Aggregate attempts. Order of the input does not matter; the fold runs over
/// `question_index` order.
pub fn aggregate(attempts: &[QuestionAttempt]) -> SessionStats {
  let mut ordered: Vec<&QuestionAttempt> = attempts.iter().collect();
  ordered.sort_by_key(|a| a.question_index);

  let mut stats = SessionStats::default();
  let mut run = 0u32;
  for a in ordered {
    stats.total_score += i64::from(a.score_awarded);
    stats.questions_count += 1;
    if a.is_correct {
      stats.correct_count += 1;
      run += 1;
      stats.best_streak = stats.best_streak.max(run);
    } else {
      run = 0;
    }
  }
  stats.accuracy = accuracy_pct(stats.correct_count, stats.questions_count);
  stats
}
