//! Collaborator interfaces for fragment lookup and notification delivery,
//! plus an in-memory implementation of both.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Context};
use async_trait::async_trait;

use crate::model::fragment::{Fragment, FragmentId, FragmentPair, MosaicId};
use crate::model::interest::InterestProfile;

#[async_trait]
pub trait FragmentStore: Send + Sync {
    async fn add_fragment(
        &self,
        mosaic_id: MosaicId,
        caption: String,
        embedding: Vec<f32>,
    ) -> anyhow::Result<Fragment>;

    async fn caption(&self, fragment_id: FragmentId) -> anyhow::Result<String>;

    /// Most similar cross-mosaic pairs, best first, at most `top_k`.
    async fn similar_fragment_pairs(
        &self,
        mosaic_a: MosaicId,
        mosaic_b: MosaicId,
        top_k: usize,
    ) -> anyhow::Result<Vec<FragmentPair>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn submit(&self, mosaic_id: MosaicId, question: &str) -> anyhow::Result<()>;
}

/// Builds both interest profiles from the captions of the closest fragment pairs.
/// Captions are deduplicated, first-seen order, joined with ", ".
pub async fn build_profiles(
    store: &dyn FragmentStore,
    mosaic_a: MosaicId,
    mosaic_b: MosaicId,
    top_k: usize,
) -> anyhow::Result<(InterestProfile, InterestProfile)> {
    let pairs = store
        .similar_fragment_pairs(mosaic_a, mosaic_b, top_k)
        .await
        .with_context(|| format!("similarity lookup for mosaics {} and {}", mosaic_a, mosaic_b))?;

    let mut side_a: Vec<String> = Vec::new();
    let mut side_b: Vec<String> = Vec::new();
    for pair in &pairs {
        push_unique(&mut side_a, store.caption(pair.fragment_a_id).await?);
        push_unique(&mut side_b, store.caption(pair.fragment_b_id).await?);
    }

    Ok((
        InterestProfile::new(side_a.join(", ")),
        InterestProfile::new(side_b.join(", ")),
    ))
}

fn push_unique(captions: &mut Vec<String>, caption: String) {
    let caption = caption.trim();
    if caption.is_empty() || captions.iter().any(|c| c == caption) {
        return;
    }
    captions.push(caption.to_string());
}

#[derive(Default)]
struct MemoryState {
    next_id: FragmentId,
    fragments: HashMap<FragmentId, Fragment>,
    notifications: Vec<(MosaicId, String)>,
}

/// Process-local store. Similarity is cosine over the stored embeddings.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> anyhow::Result<Vec<(MosaicId, String)>> {
        let state = self.lock()?;
        Ok(state.notifications.clone())
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl FragmentStore for InMemoryStore {
    async fn add_fragment(
        &self,
        mosaic_id: MosaicId,
        caption: String,
        embedding: Vec<f32>,
    ) -> anyhow::Result<Fragment> {
        let mut state = self.lock()?;
        state.next_id += 1;
        let fragment = Fragment {
            fragment_id: state.next_id,
            mosaic_id,
            caption,
            embedding,
        };
        state.fragments.insert(fragment.fragment_id, fragment.clone());
        Ok(fragment)
    }

    async fn caption(&self, fragment_id: FragmentId) -> anyhow::Result<String> {
        let state = self.lock()?;
        state
            .fragments
            .get(&fragment_id)
            .map(|f| f.caption.clone())
            .ok_or_else(|| anyhow!("fragment {} not found", fragment_id))
    }

    async fn similar_fragment_pairs(
        &self,
        mosaic_a: MosaicId,
        mosaic_b: MosaicId,
        top_k: usize,
    ) -> anyhow::Result<Vec<FragmentPair>> {
        let state = self.lock()?;
        let of_mosaic = |id: MosaicId| {
            let mut fragments: Vec<&Fragment> =
                state.fragments.values().filter(|f| f.mosaic_id == id).collect();
            fragments.sort_by_key(|f| f.fragment_id);
            fragments
        };

        let side_a = of_mosaic(mosaic_a);
        let side_b = of_mosaic(mosaic_b);

        let mut pairs = Vec::with_capacity(side_a.len() * side_b.len());
        for a in &side_a {
            for b in &side_b {
                pairs.push(FragmentPair {
                    fragment_a_id: a.fragment_id,
                    fragment_b_id: b.fragment_id,
                    score: cosine_similarity(&a.embedding, &b.embedding),
                });
            }
        }

        pairs.sort_by(|x, y| y.score.total_cmp(&x.score));
        pairs.truncate(top_k);
        Ok(pairs)
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn submit(&self, mosaic_id: MosaicId, question: &str) -> anyhow::Result<()> {
        let mut state = self.lock()?;
        state.notifications.push((mosaic_id, question.to_string()));
        Ok(())
    }
}

/// Zero for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
