use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rustc_hash::FxHashSet;
use tracing::info;
use uuid::Uuid;

use crate::clients::mwe_extractor::{ExtractInput, MweExtractorClient};
use crate::util::text;

use super::RunContext;
use super::sanitize::SanitizedCorpus;

/// Candidate topic phrases, space-joined and filtered to the token minimum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicCandidates {
    pub job_id: Uuid,
    pub phrases: Vec<String>,
}

#[async_trait]
pub trait ExtractStage: Send + Sync {
    async fn extract(&self, ctx: &RunContext, corpus: &SanitizedCorpus) -> Result<TopicCandidates>;
}

/// Calls the external MWE extractor and applies phrase hygiene: underscore
/// runs become single spaces, phrases are lowercased and trimmed, and
/// anything shorter than the token minimum is discarded. Extractor failures
/// abort the run.
pub struct HttpExtractStage {
    client: Arc<MweExtractorClient>,
    min_phrase_tokens: usize,
}

impl HttpExtractStage {
    #[must_use]
    pub fn new(client: Arc<MweExtractorClient>, min_phrase_tokens: usize) -> Self {
        Self {
            client,
            min_phrase_tokens,
        }
    }
}

#[async_trait]
impl ExtractStage for HttpExtractStage {
    async fn extract(&self, ctx: &RunContext, corpus: &SanitizedCorpus) -> Result<TopicCandidates> {
        let inputs: Vec<ExtractInput<'_>> = corpus
            .articles
            .iter()
            .map(|article| ExtractInput {
                id: &article.id,
                title: &article.title,
                text: &article.text,
            })
            .collect();

        let raw = self
            .client
            .extract(&inputs)
            .await
            .context("MWE extraction failed")?;
        let raw_count = raw.len();

        let phrases = refine_phrases(raw, self.min_phrase_tokens);

        info!(
            job_id = %ctx.job_id,
            raw = raw_count,
            candidates = phrases.len(),
            "extracted topic candidates"
        );

        Ok(TopicCandidates {
            job_id: ctx.job_id,
            phrases,
        })
    }
}

fn refine_phrases(raw: Vec<String>, min_phrase_tokens: usize) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut phrases = Vec::new();

    for phrase in raw {
        let spaced = text::squash_underscores(&phrase);
        let cleaned = spaced.trim().to_lowercase();
        if cleaned.split_whitespace().count() < min_phrase_tokens {
            continue;
        }
        if seen.insert(cleaned.clone()) {
            phrases.push(cleaned);
        }
    }

    phrases
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refine_rewrites_underscores_and_filters_short_phrases() {
        let raw = vec![
            "trade_war".to_string(),
            "trade_war_markets".to_string(),
            "economy".to_string(),
        ];

        let phrases = refine_phrases(raw, 2);

        assert_eq!(phrases, ["trade war", "trade war markets"]);
    }

    #[test]
    fn refine_lowercases_and_deduplicates() {
        let raw = vec![
            "Trade_War".to_string(),
            "trade_war".to_string(),
            "trade__war".to_string(),
        ];

        let phrases = refine_phrases(raw, 2);

        assert_eq!(phrases, ["trade war"]);
    }

    #[test]
    fn refine_respects_token_minimum() {
        let raw = vec!["a_b_c".to_string(), "a_b".to_string()];

        let phrases = refine_phrases(raw, 3);

        assert_eq!(phrases, ["a b c"]);
    }

    #[test]
    fn refine_handles_empty_input() {
        assert!(refine_phrases(vec![], 2).is_empty());
    }
}
