//! Application state: repository handles, the engine components, and the
//! identity verifier.
//!
//! This module owns:
//!   - building the store (config content bank or built-in seeds)
//!   - wiring selector, evaluator, daily pack, session manager, leaderboard
//!   - the read-side views that combine more than one component

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::{load_app_config_from_env, AppConfig, GameSettings};
use crate::daily::DailyPackGenerator;
use crate::domain::GameMode;
use crate::error::GameError;
use crate::evaluator::AnswerEvaluator;
use crate::identity::{IdentityVerifier, StaticTokenVerifier};
use crate::leaderboard::LeaderboardMerger;
use crate::seeds::{load_content, seed_celebrities, seed_templates, seed_users};
use crate::selector::{resolve_cards, QuestionCard, QuestionSelector};
use crate::session::SessionManager;
use crate::stats::StatsReader;
use crate::store::{ContentStore, LeaderboardStore, MemoryStore, PackStore, SessionStore, UserStore};
use crate::util::{parse_pack_date, Clock, SystemClock};

/// The day's pack as served to a player.
#[derive(Clone, Debug, Serialize)]
pub struct DailyPackView {
    pub pack_date: NaiveDate,
    pub questions: Vec<QuestionCard>,
    pub is_completed: bool,
    pub user_score: Option<i64>,
}

/// The engine components, all sharing one set of stores.
pub struct Engine {
    pub settings: GameSettings,
    pub content: Arc<dyn ContentStore>,
    pub sessions: Arc<SessionManager>,
    pub daily: Arc<DailyPackGenerator>,
    pub leaderboard: Arc<LeaderboardMerger>,
    pub stats: Arc<StatsReader>,
}

impl Engine {
    pub fn build<S>(store: Arc<S>, settings: &GameSettings, clock: Arc<dyn Clock>) -> Self
    where
        S: ContentStore + UserStore + SessionStore + LeaderboardStore + PackStore + 'static,
    {
        let content: Arc<dyn ContentStore> = store.clone();
        let users: Arc<dyn UserStore> = store.clone();
        let sessions: Arc<dyn SessionStore> = store.clone();
        let board: Arc<dyn LeaderboardStore> = store.clone();
        let packs: Arc<dyn PackStore> = store;

        let selector = Arc::new(QuestionSelector::new(
            content.clone(),
            settings.questions_per_session,
        ));
        let daily = Arc::new(DailyPackGenerator::new(
            content.clone(),
            packs,
            settings.daily_pack_policy,
            settings.daily_pack_size,
            settings.daily_pack_min_templates,
        ));
        let leaderboard = Arc::new(LeaderboardMerger::new(
            board,
            sessions.clone(),
            users.clone(),
            clock.clone(),
        ));
        let evaluator = Arc::new(AnswerEvaluator::standard());
        let scored: Vec<&str> = GameMode::ALL
            .iter()
            .filter(|m| evaluator.supports(**m))
            .map(|m| m.as_str())
            .collect();
        info!(
            target: "trivia_backend",
            per_session = selector.per_session(),
            daily_policy = ?daily.policy(),
            scored_modes = ?scored,
            "Engine ready"
        );

        let manager = Arc::new(SessionManager::new(
            sessions.clone(),
            users.clone(),
            content.clone(),
            selector,
            daily.clone(),
            evaluator,
            leaderboard.clone(),
            clock,
        ));
        let stats = Arc::new(StatsReader::new(sessions, users));

        Self {
            settings: settings.clone(),
            content,
            sessions: manager,
            daily,
            leaderboard,
            stats,
        }
    }

    /// Pack for `raw_date` plus, when a user is known, their standing on it.
    #[instrument(level = "info", skip(self))]
    pub async fn daily_pack(
        &self,
        raw_date: &str,
        user_id: Option<&str>,
    ) -> Result<DailyPackView, GameError> {
        let pack_date = parse_pack_date(raw_date)?;
        let templates = self.daily.pack_for(pack_date).await?;
        let questions = resolve_cards(self.content.as_ref(), &templates).await?;
        let (is_completed, user_score) = match user_id {
            Some(u) => {
                let status = self.leaderboard.status(pack_date, u).await?;
                (status.completed, status.score)
            }
            None => (false, None),
        };
        Ok(DailyPackView {
            pack_date,
            questions,
            is_completed,
            user_score,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    /// Build state from env: load config, fill the store, wire the engine.
    #[instrument(level = "info", skip_all)]
    pub async fn from_env() -> Self {
        let cfg = load_app_config_from_env().unwrap_or_default();
        Self::from_config(cfg).await
    }

    pub async fn from_config(cfg: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());

        let users = if cfg.users.is_empty() {
            warn!(target: "trivia_backend", "No users configured; using demo accounts");
            seed_users()
        } else {
            cfg.users.clone()
        };
        let has_content = cfg.has_content();
        let (celebrities, templates) = if has_content {
            (cfg.celebrities, cfg.templates)
        } else {
            (seed_celebrities(), seed_templates())
        };
        info!(
            target: "trivia_backend",
            users = users.len(),
            celebrities = celebrities.len(),
            templates = templates.len(),
            source = if has_content { "config" } else { "seed" },
            "Startup content inventory"
        );
        load_content(&store, &users, celebrities, templates).await;

        let verifier = Arc::new(StaticTokenVerifier::from_users(&users));
        Self::with_parts(store, &cfg.game, verifier, Arc::new(SystemClock))
    }

    pub fn with_parts(
        store: Arc<MemoryStore>,
        settings: &GameSettings,
        verifier: Arc<dyn IdentityVerifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine: Arc::new(Engine::build(store, settings, clock)),
            verifier,
        }
    }
}
