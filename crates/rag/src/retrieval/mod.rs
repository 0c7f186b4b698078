//! Tag-scoped document retrieval.
//!
//! The retrieval service is an external collaborator: it takes a query plus a
//! list of `(scene_tag, province_tag)` selectors and returns ranked documents.
//! Failures come back as data so one sub-question never aborts its siblings.

pub mod client;
pub mod evidence;

pub use client::HttpRetriever;
pub use evidence::EvidenceRetriever;

use crate::types::{RetrievalOutcome, SceneTag};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One `(scene_tag, province_tag)` pair sent to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSelector {
    pub scene_tag: String,
    pub province_tag: String,
}

impl TagSelector {
    /// Pair every scene tag with the same province.
    pub fn for_scene(scene: &SceneTag, province: &str) -> Vec<Self> {
        Self::for_tags(scene.tags(), province)
    }

    pub fn for_tags<'a>(tags: impl IntoIterator<Item = &'a str>, province: &str) -> Vec<Self> {
        tags.into_iter()
            .map(|tag| Self {
                scene_tag: tag.to_string(),
                province_tag: province.to_string(),
            })
            .collect()
    }
}

/// Search knobs shared by the primary search and the fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub top_k: u32,
    pub score_threshold: f32,
    pub show_image: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: 5,
            score_threshold: 0.5,
            show_image: true,
        }
    }
}

/// Trait for retrieval backends.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Search for `query` under the given tag selectors.
    ///
    /// Never errors: transport and service failures are returned as
    /// `RetrievalOutcome::Failed`.
    async fn search(
        &self,
        query: &str,
        tags: &[TagSelector],
        params: &SearchParams,
    ) -> RetrievalOutcome;
}
