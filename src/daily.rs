//! Deterministic daily pack.
//!
//! Every active template is ranked by `md5(template_id || date)` and the first
//! `pack_size` win. Nothing is stored unless the persist policy is selected, so
//! with `GenerateOnRead` a change to the active set during the day can change
//! that day's pack for later readers.

use std::sync::Arc;

use chrono::NaiveDate;
use md5::{Digest, Md5};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::domain::QuestionTemplate;
use crate::error::GameError;
use crate::store::{ContentStore, PackStore};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackPolicy {
    /// Recompute on every request from the current active set.
    #[default]
    GenerateOnRead,
    /// Store the first computed pack for a date and serve it from then on.
    PersistFirstRead,
}

/// Ordering key of a template on a given date.
pub fn pack_digest(template_id: &str, pack_date: NaiveDate) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(template_id.as_bytes());
    hasher.update(pack_date.format("%Y-%m-%d").to_string().as_bytes());
    let mut out = [0u8; 16];
    out.copy_from_slice(hasher.finalize().as_slice());
    out
}

/// Pure ordering step: sort by digest ascending (ties by id) and keep `size`.
pub fn order_for_date(
    mut templates: Vec<QuestionTemplate>,
    pack_date: NaiveDate,
    size: usize,
) -> Vec<QuestionTemplate> {
    templates.sort_by_cached_key(|t| (pack_digest(&t.id, pack_date), t.id.clone()));
    templates.truncate(size);
    templates
}

pub struct DailyPackGenerator {
    content: Arc<dyn ContentStore>,
    packs: Arc<dyn PackStore>,
    policy: PackPolicy,
    pack_size: usize,
    min_templates: usize,
}

impl DailyPackGenerator {
    pub fn new(
        content: Arc<dyn ContentStore>,
        packs: Arc<dyn PackStore>,
        policy: PackPolicy,
        pack_size: usize,
        min_templates: usize,
    ) -> Self {
        Self {
            content,
            packs,
            policy,
            pack_size,
            min_templates: min_templates.max(1),
        }
    }

    pub fn policy(&self) -> PackPolicy {
        self.policy
    }

    #[instrument(level = "info", skip(self), fields(%pack_date, policy = ?self.policy))]
    pub async fn pack_for(&self, pack_date: NaiveDate) -> Result<Vec<QuestionTemplate>, GameError> {
        if self.policy == PackPolicy::PersistFirstRead {
            if let Some(ids) = self.packs.pack(pack_date).await? {
                debug!(target: "daily_pack", %pack_date, "Serving stored pack");
                return self.load(&ids).await;
            }
        }

        let pack = self.generate(pack_date).await?;

        if self.policy == PackPolicy::PersistFirstRead {
            let ids: Vec<String> = pack.iter().map(|t| t.id.clone()).collect();
            let stored = self.packs.save_pack_if_absent(pack_date, ids.clone()).await?;
            if stored != ids {
                // Another request stored its pack first; that one is canonical.
                return self.load(&stored).await;
            }
            info!(target: "daily_pack", %pack_date, size = pack.len(), "Stored daily pack");
        }
        Ok(pack)
    }

    async fn generate(&self, pack_date: NaiveDate) -> Result<Vec<QuestionTemplate>, GameError> {
        let active: Vec<QuestionTemplate> = self
            .content
            .active_templates(None)
            .await?
            .into_iter()
            .filter(QuestionTemplate::is_well_formed)
            .collect();

        if active.len() < self.min_templates {
            warn!(target: "daily_pack", %pack_date, available = active.len(), required = self.min_templates, "Not enough active templates for daily pack");
            return Err(GameError::NoQuestionsAvailable(format!("daily pack {pack_date}")));
        }
        let pack = order_for_date(active, pack_date, self.pack_size);
        debug!(target: "daily_pack", %pack_date, size = pack.len(), "Generated daily pack");
        Ok(pack)
    }

    async fn load(&self, ids: &[String]) -> Result<Vec<QuestionTemplate>, GameError> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let t = self
                .content
                .template(id)
                .await?
                .ok_or_else(|| GameError::TemplateNotFound(id.clone()))?;
            out.push(t);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeds::seeded_store;
    use crate::store::MemoryStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
    }

    fn ids(pack: &[QuestionTemplate]) -> Vec<String> {
        pack.iter().map(|t| t.id.clone()).collect()
    }

    async fn generator(policy: PackPolicy) -> (Arc<MemoryStore>, DailyPackGenerator) {
        let store = Arc::new(seeded_store().await);
        let gen = DailyPackGenerator::new(store.clone(), store.clone(), policy, 10, 10);
        (store, gen)
    }

    #[tokio::test]
    async fn same_date_same_pack() {
        let (_, gen) = generator(PackPolicy::GenerateOnRead).await;
        let a = gen.pack_for(day(4)).await.unwrap();
        let b = gen.pack_for(day(4)).await.unwrap();
        assert_eq!(a.len(), 10);
        assert_eq!(ids(&a), ids(&b));
    }

    #[tokio::test]
    async fn different_dates_reorder_the_pool() {
        let (_, gen) = generator(PackPolicy::GenerateOnRead).await;
        let packs: Vec<Vec<String>> = {
            let mut v = Vec::new();
            for d in 1..=5 {
                v.push(ids(&gen.pack_for(day(d)).await.unwrap()));
            }
            v
        };
        assert!(packs.windows(2).any(|w| w[0] != w[1]));
    }

    #[tokio::test]
    async fn generate_on_read_follows_active_set_changes() {
        let (store, gen) = generator(PackPolicy::GenerateOnRead).await;
        let before = gen.pack_for(day(9)).await.unwrap();
        store.set_template_active(&before[0].id, false).await;
        let after = gen.pack_for(day(9)).await.unwrap();
        assert!(!ids(&after).contains(&before[0].id));
    }

    #[tokio::test]
    async fn persisted_pack_survives_active_set_changes() {
        let (store, gen) = generator(PackPolicy::PersistFirstRead).await;
        let before = gen.pack_for(day(9)).await.unwrap();
        store.set_template_active(&before[0].id, false).await;
        let after = gen.pack_for(day(9)).await.unwrap();
        assert_eq!(ids(&before), ids(&after));
    }

    #[tokio::test]
    async fn empty_content_has_no_pack() {
        let store = Arc::new(MemoryStore::new());
        let gen = DailyPackGenerator::new(store.clone(), store, PackPolicy::GenerateOnRead, 10, 1);
        assert!(matches!(gen.pack_for(day(1)).await, Err(GameError::NoQuestionsAvailable(_))));
    }

    #[test]
    fn digest_matches_md5_of_id_and_date() {
        // md5("t1" + "2025-07-01")
        let expected = Md5::digest(b"t12025-07-01");
        assert_eq!(pack_digest("t1", day(1)).as_slice(), expected.as_slice());
    }
}
