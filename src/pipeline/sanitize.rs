use anyhow::Result;
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::util::similarity;

use super::RunContext;
use super::fetch::{FetchedCorpus, RawArticle};

/// A well-formed article. `title` and `text` are guaranteed non-empty;
/// everything else falls back to an empty value when the source omitted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub text: String,
    pub url: String,
    pub handle: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedCorpus {
    pub job_id: Uuid,
    pub articles: Vec<Article>,
}

#[async_trait]
pub trait SanitizeStage: Send + Sync {
    async fn sanitize(&self, ctx: &RunContext, corpus: FetchedCorpus) -> Result<SanitizedCorpus>;
}

/// Drops malformed records, then near-duplicate headlines.
///
/// Outlets syndicate the same story with the words shuffled, so candidates
/// are compared against every already-kept title with a token-order-
/// insensitive ratio and dropped above the threshold. Quadratic over the
/// window, which stays in the low hundreds of articles.
#[derive(Debug, Clone)]
pub struct FuzzyTitleDedupStage {
    similarity_threshold: u8,
}

impl FuzzyTitleDedupStage {
    #[must_use]
    pub fn new(similarity_threshold: u8) -> Self {
        Self {
            similarity_threshold,
        }
    }
}

impl Default for FuzzyTitleDedupStage {
    fn default() -> Self {
        Self::new(90)
    }
}

#[async_trait]
impl SanitizeStage for FuzzyTitleDedupStage {
    async fn sanitize(&self, ctx: &RunContext, corpus: FetchedCorpus) -> Result<SanitizedCorpus> {
        let total = corpus.articles.len();

        let well_formed: Vec<Article> = corpus
            .articles
            .into_iter()
            .filter_map(promote)
            .collect();
        let malformed = total - well_formed.len();

        // The first article is kept unconditionally; an empty window simply
        // yields an empty corpus.
        let mut kept: Vec<Article> = Vec::with_capacity(well_formed.len());
        for candidate in well_formed {
            let duplicate = kept.iter().any(|article| {
                similarity::token_sort_ratio(&article.title, &candidate.title)
                    > self.similarity_threshold
            });
            if !duplicate {
                kept.push(candidate);
            }
        }

        info!(
            job_id = %ctx.job_id,
            total,
            malformed,
            duplicates = total - malformed - kept.len(),
            kept = kept.len(),
            "sanitized corpus"
        );

        Ok(SanitizedCorpus {
            job_id: ctx.job_id,
            articles: kept,
        })
    }
}

fn promote(raw: RawArticle) -> Option<Article> {
    let title = raw.title?;
    let text = raw.text?;
    if title.trim().is_empty() || text.trim().is_empty() {
        return None;
    }

    Some(Article {
        id: raw.id,
        title,
        text,
        url: raw.url.unwrap_or_default(),
        handle: raw.handle.unwrap_or_default(),
        timestamp: raw.timestamp.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, title: Option<&str>, text: Option<&str>) -> RawArticle {
        RawArticle {
            id: id.to_string(),
            title: title.map(ToString::to_string),
            text: text.map(ToString::to_string),
            url: None,
            handle: None,
            timestamp: None,
        }
    }

    fn corpus(articles: Vec<RawArticle>) -> (RunContext, FetchedCorpus) {
        let ctx = RunContext::for_window(std::time::Duration::from_secs(7200));
        let corpus = FetchedCorpus {
            job_id: ctx.job_id,
            articles,
        };
        (ctx, corpus)
    }

    #[tokio::test]
    async fn empty_input_yields_empty_corpus() {
        let stage = FuzzyTitleDedupStage::default();
        let (ctx, corpus) = corpus(vec![]);

        let result = stage.sanitize(&ctx, corpus).await.expect("sanitize succeeds");

        assert!(result.articles.is_empty());
    }

    #[tokio::test]
    async fn malformed_records_are_filtered() {
        let stage = FuzzyTitleDedupStage::default();
        let (ctx, corpus) = corpus(vec![
            raw("a", Some("Trade war hits markets"), Some("body")),
            raw("b", None, Some("body")),
            raw("c", Some("No body here"), None),
            raw("d", Some("   "), Some("body")),
        ]);

        let result = stage.sanitize(&ctx, corpus).await.expect("sanitize succeeds");

        assert_eq!(result.articles.len(), 1);
        assert_eq!(result.articles[0].id, "a");
    }

    #[tokio::test]
    async fn reordered_duplicate_titles_are_dropped() {
        let stage = FuzzyTitleDedupStage::default();
        let (ctx, corpus) = corpus(vec![
            raw("a", Some("markets react to trade war"), Some("body a")),
            raw("b", Some("trade war markets react to"), Some("body b")),
            raw("c", Some("local weather sunny"), Some("body c")),
        ]);

        let result = stage.sanitize(&ctx, corpus).await.expect("sanitize succeeds");

        let ids: Vec<&str> = result.articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[tokio::test]
    async fn sanitization_is_idempotent() {
        let stage = FuzzyTitleDedupStage::default();
        let (ctx, corpus) = corpus(vec![
            raw("a", Some("markets react to trade war"), Some("body a")),
            raw("b", Some("trade war: markets react"), Some("body b")),
            raw("c", Some("local weather sunny"), Some("body c")),
            raw("d", Some("parliament passes budget bill"), Some("body d")),
        ]);

        let first = stage.sanitize(&ctx, corpus).await.expect("first pass");

        let again = FetchedCorpus {
            job_id: ctx.job_id,
            articles: first
                .articles
                .iter()
                .map(|a| RawArticle {
                    id: a.id.clone(),
                    title: Some(a.title.clone()),
                    text: Some(a.text.clone()),
                    url: Some(a.url.clone()),
                    handle: Some(a.handle.clone()),
                    timestamp: Some(a.timestamp),
                })
                .collect(),
        };

        let second = stage.sanitize(&ctx, again).await.expect("second pass");

        assert_eq!(second.articles, first.articles);
    }

    #[tokio::test]
    async fn arrival_order_is_preserved() {
        let stage = FuzzyTitleDedupStage::default();
        let (ctx, corpus) = corpus(vec![
            raw("z", Some("central bank raises rates"), Some("body")),
            raw("a", Some("new stadium opens downtown"), Some("body")),
        ]);

        let result = stage.sanitize(&ctx, corpus).await.expect("sanitize succeeds");

        let ids: Vec<&str> = result.articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["z", "a"]);
    }
}
