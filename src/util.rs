//! Small utility helpers used across modules.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::GameError;

/// Parse a strict `YYYY-MM-DD` calendar date.
pub fn parse_pack_date(raw: &str) -> Result<NaiveDate, GameError> {
  let s = raw.trim();
  // chrono accepts unpadded fields; the wire format does not.
  if s.len() != 10 {
    return Err(GameError::InvalidDate(raw.to_string()));
  }
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| GameError::InvalidDate(raw.to_string()))
}

/// Parse an optional non-negative count from a query string parameter.
pub fn parse_count(param: &'static str, raw: Option<&str>) -> Result<Option<usize>, GameError> {
  match raw.map(str::trim) {
    None | Some("") => Ok(None),
    Some(v) => v
      .parse::<usize>()
      .map(Some)
      .map_err(|_| GameError::InvalidQuery { param, value: v.to_string() }),
  }
}

/// Whole years between `dob` and `today`, counted as `days / 365` rounded down.
pub fn age_in_years(dob: NaiveDate, today: NaiveDate) -> i32 {
  let days = (today - dob).num_days();
  days.div_euclid(365) as i32
}

/// Source of "now". Injected so scoring and timestamps are testable.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;

  fn today(&self) -> NaiveDate {
    self.now().date_naive()
  }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Clock pinned to one instant.
#[cfg(test)]
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl FixedClock {
  pub fn on(date: NaiveDate) -> Self {
    FixedClock(date.and_hms_opt(12, 0, 0).unwrap().and_utc())
  }
}

#[cfg(test)]
impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    self.0
  }
}
