//! The topic graph pipeline.
//!
//! One run is a strictly sequential batch job: fetch → sanitize → extract →
//! normalize → link → build → partition → score → prune → assemble →
//! publish. Each stage fully consumes its predecessor's output; all graph
//! state lives in the run and is dropped with it. Concurrent runs are the
//! external scheduler's problem, not this module's.

pub mod assemble;
pub mod centrality;
pub mod community;
pub mod extract;
pub mod fetch;
pub mod graph;
pub mod link;
pub mod normalize;
pub mod prune;
pub mod publish;
pub mod sanitize;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::clients::article_source::{ArticleSourceClient, ArticleSourceConfig};
use crate::clients::graph_sink::{GraphSinkClient, GraphSinkConfig};
use crate::clients::mwe_extractor::{MweExtractorClient, MweExtractorConfig};
use crate::config::Config;
use crate::schema::GraphDocument;
use crate::util::retry::RetryConfig;

use centrality::{CentralityRanker, PageRankRanker, score_communities};
use community::{CommunityDetector, EdgeBetweennessDetector};
use extract::{ExtractStage, HttpExtractStage};
use fetch::{FetchStage, HttpFetchStage};
use graph::TopicGraph;
use link::TopicLinker;
use normalize::CanonicalMap;
use publish::{HttpPublishStage, PublishStage};
use sanitize::{FuzzyTitleDedupStage, SanitizeStage};

const DEFAULT_COMMUNITY_SPLITS: usize = 6;
const DEFAULT_VALUE_SCALE: f64 = 4.0;

/// Per-run state. A fresh context is created for every execution and
/// discarded with it; nothing accumulates across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    pub job_id: Uuid,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl RunContext {
    #[must_use]
    pub fn new(job_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { job_id, from, to }
    }

    /// Fresh context for the window ending now.
    #[must_use]
    pub fn for_window(window: Duration) -> Self {
        let to = Utc::now();
        let span = chrono::Duration::from_std(window)
            .unwrap_or_else(|_| chrono::Duration::seconds(7200));
        Self::new(Uuid::new_v4(), to - span, to)
    }
}

/// Coordinates one pipeline run.
pub struct PipelineOrchestrator {
    fetch: Arc<dyn FetchStage>,
    sanitize: Arc<dyn SanitizeStage>,
    extract: Arc<dyn ExtractStage>,
    publish: Arc<dyn PublishStage>,
    detector: Arc<dyn CommunityDetector>,
    ranker: Arc<dyn CentralityRanker>,
    community_splits: usize,
    value_scale: f64,
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("community_splits", &self.community_splits)
            .field("value_scale", &self.value_scale)
            .finish_non_exhaustive()
    }
}

impl PipelineOrchestrator {
    /// Wire the default HTTP stages from configuration.
    ///
    /// # Errors
    /// Fails when one of the HTTP clients cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let article_source = ArticleSourceClient::new(ArticleSourceConfig {
            base_url: config.article_source_base_url().to_string(),
            connect_timeout: config.http_connect_timeout(),
            total_timeout: config.http_total_timeout(),
            service_token: config.article_source_service_token().map(ToString::to_string),
        })
        .context("failed to create article source client")?;

        let mwe_extractor = MweExtractorClient::new(MweExtractorConfig {
            base_url: config.mwe_extractor_base_url().to_string(),
            connect_timeout: config.http_connect_timeout(),
            total_timeout: config.http_total_timeout(),
            service_token: config.mwe_extractor_service_token().map(ToString::to_string),
        })
        .context("failed to create MWE extractor client")?;

        let graph_sink = GraphSinkClient::new(GraphSinkConfig {
            base_url: config.graph_sink_base_url().to_string(),
            connect_timeout: config.http_connect_timeout(),
            total_timeout: config.http_total_timeout(),
            service_token: config.graph_sink_service_token().map(ToString::to_string),
        })
        .context("failed to create graph sink client")?;

        let retry_config = RetryConfig::new(
            config.http_max_retries(),
            config.http_backoff_base_ms(),
            config.http_backoff_cap_ms(),
        );

        PipelineBuilder::new()
            .with_fetch_stage(Arc::new(HttpFetchStage::with_retry(
                Arc::new(article_source),
                retry_config,
            )))
            .with_sanitize_stage(Arc::new(FuzzyTitleDedupStage::new(
                config.dedup_similarity_threshold(),
            )))
            .with_extract_stage(Arc::new(HttpExtractStage::new(
                Arc::new(mwe_extractor),
                config.min_phrase_tokens(),
            )))
            .with_publish_stage(Arc::new(HttpPublishStage::new(Arc::new(graph_sink))))
            .with_ranker(Arc::new(PageRankRanker {
                damping: config.pagerank_damping(),
                iterations: config.pagerank_iterations(),
            }))
            .with_community_splits(config.community_splits())
            .with_value_scale(config.value_scale())
            .build()
    }

    /// Execute one run to completion and return the published document.
    ///
    /// # Errors
    /// External stage failures (source, extractor, sink) are fatal to the
    /// run and propagate to the caller, who decides whether to retry the
    /// whole job later.
    pub async fn run(&self, ctx: &RunContext) -> Result<GraphDocument> {
        info!(
            job_id = %ctx.job_id,
            from = %ctx.from.to_rfc3339(),
            to = %ctx.to.to_rfc3339(),
            "pipeline run started"
        );

        let fetched = self.fetch.fetch(ctx).await.context("fetch stage failed")?;
        let sanitized = self
            .sanitize
            .sanitize(ctx, fetched)
            .await
            .context("sanitize stage failed")?;

        // A dry window still publishes: downstream consumers tolerate an
        // empty graph, not a missing one.
        if sanitized.articles.is_empty() {
            info!(job_id = %ctx.job_id, "no articles in window, publishing empty graph");
            let document = assemble::assemble(ctx, &TopicGraph::new_undirected());
            self.publish
                .publish(ctx, &document)
                .await
                .context("publish stage failed")?;
            return Ok(document);
        }

        let candidates = self
            .extract
            .extract(ctx, &sanitized)
            .await
            .context("extract stage failed")?;

        let canonical = CanonicalMap::build(&candidates.phrases);
        let linker = TopicLinker::new(&canonical).context("failed to build topic linker")?;
        let linked = linker.link(sanitized);

        let mut topic_graph = graph::build_graph(&linked);
        let communities = self.detector.partition(&topic_graph, self.community_splits);
        community::apply_groups(&mut topic_graph, &communities);
        score_communities(
            &mut topic_graph,
            &communities,
            self.ranker.as_ref(),
            self.value_scale,
        );
        let pruned = prune::prune_links(&mut topic_graph);

        let document = assemble::assemble(ctx, &topic_graph);
        info!(
            job_id = %ctx.job_id,
            nodes = document.nodes.len(),
            links = document.links.len(),
            communities = communities.len(),
            pruned,
            "pipeline run assembled graph"
        );

        self.publish
            .publish(ctx, &document)
            .await
            .context("publish stage failed")?;

        Ok(document)
    }
}

/// Builder for [`PipelineOrchestrator`]. The three external adapters are
/// required; everything else falls back to defaults.
#[derive(Default)]
pub struct PipelineBuilder {
    fetch: Option<Arc<dyn FetchStage>>,
    sanitize: Option<Arc<dyn SanitizeStage>>,
    extract: Option<Arc<dyn ExtractStage>>,
    publish: Option<Arc<dyn PublishStage>>,
    detector: Option<Arc<dyn CommunityDetector>>,
    ranker: Option<Arc<dyn CentralityRanker>>,
    community_splits: Option<usize>,
    value_scale: Option<f64>,
}

impl PipelineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_fetch_stage(mut self, stage: Arc<dyn FetchStage>) -> Self {
        self.fetch = Some(stage);
        self
    }

    #[must_use]
    pub fn with_sanitize_stage(mut self, stage: Arc<dyn SanitizeStage>) -> Self {
        self.sanitize = Some(stage);
        self
    }

    #[must_use]
    pub fn with_extract_stage(mut self, stage: Arc<dyn ExtractStage>) -> Self {
        self.extract = Some(stage);
        self
    }

    #[must_use]
    pub fn with_publish_stage(mut self, stage: Arc<dyn PublishStage>) -> Self {
        self.publish = Some(stage);
        self
    }

    #[must_use]
    pub fn with_detector(mut self, detector: Arc<dyn CommunityDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    #[must_use]
    pub fn with_ranker(mut self, ranker: Arc<dyn CentralityRanker>) -> Self {
        self.ranker = Some(ranker);
        self
    }

    #[must_use]
    pub fn with_community_splits(mut self, splits: usize) -> Self {
        self.community_splits = Some(splits);
        self
    }

    #[must_use]
    pub fn with_value_scale(mut self, scale: f64) -> Self {
        self.value_scale = Some(scale);
        self
    }

    /// # Errors
    /// Fails when a required stage (fetch, extract, publish) is missing.
    pub fn build(self) -> Result<PipelineOrchestrator> {
        Ok(PipelineOrchestrator {
            fetch: self.fetch.context("fetch stage is required")?,
            sanitize: self
                .sanitize
                .unwrap_or_else(|| Arc::new(FuzzyTitleDedupStage::default())),
            extract: self.extract.context("extract stage is required")?,
            publish: self.publish.context("publish stage is required")?,
            detector: self
                .detector
                .unwrap_or_else(|| Arc::new(EdgeBetweennessDetector)),
            ranker: self
                .ranker
                .unwrap_or_else(|| Arc::new(PageRankRanker::default())),
            community_splits: self.community_splits.unwrap_or(DEFAULT_COMMUNITY_SPLITS),
            value_scale: self.value_scale.unwrap_or(DEFAULT_VALUE_SCALE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_context_window_ends_now() {
        let ctx = RunContext::for_window(Duration::from_secs(7200));
        assert_eq!((ctx.to - ctx.from).num_seconds(), 7200);
        assert!(ctx.to <= Utc::now());
    }

    #[test]
    fn builder_requires_external_stages() {
        let err = PipelineBuilder::new().build().expect_err("must fail");
        assert!(err.to_string().contains("fetch stage is required"));
    }
}
