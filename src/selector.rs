//! Question selection for regular sessions and the player-facing question cards.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::domain::{Celebrity, GameMode, QuestionTemplate, TemplateSubject};
use crate::error::GameError;
use crate::store::ContentStore;

/// Celebrity data a player may see before answering (no birth date).
#[derive(Clone, Debug, Serialize)]
pub struct CelebrityBrief {
    pub id: String,
    pub full_name: String,
    pub primary_category: String,
    pub nationality: Option<String>,
    pub hints: Vec<String>,
}

impl From<&Celebrity> for CelebrityBrief {
    fn from(c: &Celebrity) -> Self {
        Self {
            id: c.id.clone(),
            full_name: c.full_name.clone(),
            primary_category: c.primary_category.clone(),
            nationality: c.nationality.clone(),
            hints: c.hints_easy.clone(),
        }
    }
}

/// A question as handed to the client.
#[derive(Clone, Debug, Serialize)]
pub struct QuestionCard {
    pub id: String,
    pub mode: GameMode,
    pub difficulty: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub celebrity: Option<CelebrityBrief>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub celebrity_a: Option<CelebrityBrief>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub celebrity_b: Option<CelebrityBrief>,
}

/// Build cards in template order. Templates with dangling celebrity ids are an
/// authoring error and fail the whole request.
pub async fn resolve_cards(
    content: &dyn ContentStore,
    templates: &[QuestionTemplate],
) -> Result<Vec<QuestionCard>, GameError> {
    let mut cards = Vec::with_capacity(templates.len());
    for t in templates {
        let mut card = QuestionCard {
            id: t.id.clone(),
            mode: t.mode,
            difficulty: t.difficulty,
            celebrity: None,
            celebrity_a: None,
            celebrity_b: None,
        };
        match &t.subject {
            TemplateSubject::Single { celebrity_id } => {
                card.celebrity = Some(brief(content, &t.id, celebrity_id).await?);
            }
            TemplateSubject::Pair {
                celebrity_id_a,
                celebrity_id_b,
            } => {
                card.celebrity_a = Some(brief(content, &t.id, celebrity_id_a).await?);
                card.celebrity_b = Some(brief(content, &t.id, celebrity_id_b).await?);
            }
        }
        cards.push(card);
    }
    Ok(cards)
}

async fn brief(
    content: &dyn ContentStore,
    template_id: &str,
    celebrity_id: &str,
) -> Result<CelebrityBrief, GameError> {
    match content.celebrity(celebrity_id).await? {
        Some(c) => Ok(CelebrityBrief::from(&c)),
        None => {
            warn!(target: "content", template = %template_id, celebrity = %celebrity_id, "Template references unknown celebrity");
            Err(GameError::MalformedTemplate(template_id.to_string()))
        }
    }
}

/// Uniform pick of `count` items without replacement.
pub fn pick_without_replacement<R: Rng + ?Sized>(
    pool: &[QuestionTemplate],
    count: usize,
    rng: &mut R,
) -> Vec<QuestionTemplate> {
    pool.choose_multiple(rng, count).cloned().collect()
}

pub struct QuestionSelector {
    content: Arc<dyn ContentStore>,
    per_session: usize,
}

impl QuestionSelector {
    pub fn new(content: Arc<dyn ContentStore>, per_session: usize) -> Self {
        Self {
            content,
            per_session,
        }
    }

    pub fn per_session(&self) -> usize {
        self.per_session
    }

    /// Exactly `per_session` active templates of `mode`, in random order.
    #[instrument(level = "debug", skip(self), fields(%mode))]
    pub async fn select(&self, mode: GameMode) -> Result<Vec<QuestionTemplate>, GameError> {
        if mode == GameMode::DailyChallenge {
            // Daily packs come from the date-keyed generator, never from here.
            return Err(GameError::InvalidMode(mode.to_string()));
        }
        let pool: Vec<QuestionTemplate> = self
            .content
            .active_templates(Some(mode))
            .await?
            .into_iter()
            .filter(QuestionTemplate::is_well_formed)
            .collect();

        if pool.len() < self.per_session {
            warn!(target: "content", %mode, available = pool.len(), needed = self.per_session, "Not enough active templates");
            return Err(GameError::NoQuestionsAvailable(mode.to_string()));
        }

        let picked = pick_without_replacement(&pool, self.per_session, &mut rand::thread_rng());
        debug!(target: "session", %mode, pool = pool.len(), picked = picked.len(), "Questions selected");
        Ok(picked)
    }
}
