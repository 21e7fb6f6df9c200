//! Loading game settings and an optional content bank from TOML.
//!
//! See `AppConfig` and `GameSettings` for the expected schema. Every table is
//! optional; missing values fall back to the defaults below and missing content
//! falls back to the built-in seeds.

use serde::Deserialize;
use tracing::{error, info};

use crate::daily::PackPolicy;
use crate::domain::{Celebrity, QuestionTemplate};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub game: GameSettings,
  #[serde(default)]
  pub users: Vec<UserCfg>,
  #[serde(default)]
  pub celebrities: Vec<Celebrity>,
  #[serde(default)]
  pub templates: Vec<QuestionTemplate>,
}

impl AppConfig {
  /// True when the file brings its own content instead of the seeds.
  pub fn has_content(&self) -> bool {
    !self.celebrities.is_empty() || !self.templates.is_empty()
  }
}

/// Tunables of the engine.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GameSettings {
  pub questions_per_session: usize,
  pub daily_pack_size: usize,
  /// Fewer active templates than this and no daily pack is served.
  pub daily_pack_min_templates: usize,
  pub daily_pack_policy: PackPolicy,
  pub leaderboard_default_limit: usize,
}

impl Default for GameSettings {
  fn default() -> Self {
    Self {
      questions_per_session: 10,
      daily_pack_size: 10,
      daily_pack_min_templates: 10,
      daily_pack_policy: PackPolicy::GenerateOnRead,
      leaderboard_default_limit: 100,
    }
  }
}

/// User entry accepted in TOML configuration. `token` is what the client
/// sends as `Authorization: Bearer <token>`.
#[derive(Clone, Debug, Deserialize)]
pub struct UserCfg {
  pub id: String,
  #[serde(default)] pub display_name: Option<String>,
  pub token: String,
}

/// Attempt to load `AppConfig` from TRIVIA_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("TRIVIA_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => parse_app_config(&s, &path),
    Err(e) => {
      error!(target: "trivia_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

fn parse_app_config(raw: &str, path: &str) -> Option<AppConfig> {
  match toml::from_str::<AppConfig>(raw) {
    Ok(cfg) => {
      info!(
        target: "trivia_backend",
        %path,
        users = cfg.users.len(),
        celebrities = cfg.celebrities.len(),
        templates = cfg.templates.len(),
        "Loaded app config (TOML)"
      );
      Some(cfg)
    }
    Err(e) => {
      error!(target: "trivia_backend", %path, error = %e, "Failed to parse TOML config");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{GameMode, TemplateSubject};

  #[test]
  fn empty_file_gives_defaults() {
    let cfg = parse_app_config("", "mem").unwrap();
    assert_eq!(cfg.game.questions_per_session, 10);
    assert_eq!(cfg.game.daily_pack_min_templates, 10);
    assert_eq!(cfg.game.daily_pack_policy, PackPolicy::GenerateOnRead);
    assert!(!cfg.has_content());
  }

  #[test]
  fn partial_game_table_keeps_other_defaults() {
    let raw = r#"
[game]
daily_pack_policy = "persist_first_read"
daily_pack_min_templates = 1

[[users]]
id = "u1"
token = "secret"

[[celebrities]]
id = "c1"
full_name = "Someone Famous"
date_of_birth = "1970-01-02"

[[templates]]
id = "t1"
mode = "AGE_GUESS"
difficulty = 2
is_active = true
subject = { celebrity_id = "c1" }

[[templates]]
id = "t2"
mode = "WHO_OLDER"
difficulty = 3
is_active = false
subject = { celebrity_id_a = "c1", celebrity_id_b = "c2" }
"#;
    let cfg = parse_app_config(raw, "mem").unwrap();
    assert_eq!(cfg.game.daily_pack_policy, PackPolicy::PersistFirstRead);
    assert_eq!(cfg.game.daily_pack_min_templates, 1);
    assert_eq!(cfg.game.daily_pack_size, 10);
    assert_eq!(cfg.users[0].display_name, None);
    assert_eq!(cfg.templates[0].mode, GameMode::AgeGuess);
    assert!(matches!(cfg.templates[1].subject, TemplateSubject::Pair { .. }));
    assert!(cfg.has_content());
  }

  #[test]
  fn bad_toml_is_rejected() {
    assert!(parse_app_config("[game\nquestions_per_session = ", "mem").is_none());
  }
}
