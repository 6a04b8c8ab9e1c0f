use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::article_source::{ArticleSourceClient, SourceArticle};
use crate::util::retry::{RetryConfig, is_retryable_error};

use super::RunContext;

/// One raw article record as handed to sanitization. Fields other than the
/// id may be missing; sanitization decides what survives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawArticle {
    pub id: String,
    pub title: Option<String>,
    pub text: Option<String>,
    pub url: Option<String>,
    pub handle: Option<String>,
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedCorpus {
    pub job_id: Uuid,
    pub articles: Vec<RawArticle>,
}

#[async_trait]
pub trait FetchStage: Send + Sync {
    async fn fetch(&self, ctx: &RunContext) -> Result<FetchedCorpus>;
}

/// 記事ソースから実行ウィンドウ分の記事を取得するステージ。一時的な
/// トランスポート障害は再試行し、再試行上限を超えた失敗は実行全体を
/// 中断させる。
pub struct HttpFetchStage {
    client: Arc<ArticleSourceClient>,
    retry_config: RetryConfig,
}

impl HttpFetchStage {
    #[must_use]
    pub fn new(client: Arc<ArticleSourceClient>) -> Self {
        Self {
            client,
            retry_config: RetryConfig::default(),
        }
    }

    pub(crate) fn with_retry(client: Arc<ArticleSourceClient>, retry_config: RetryConfig) -> Self {
        Self {
            client,
            retry_config,
        }
    }

    async fn fetch_with_retry(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SourceArticle>> {
        let mut attempt = 0;

        loop {
            match self.client.fetch_articles(from, to).await {
                Ok(articles) => {
                    if attempt > 0 {
                        info!(attempt, "fetch succeeded after retry");
                    }
                    return Ok(articles);
                }
                Err(err) => {
                    attempt += 1;

                    if !self.retry_config.can_retry(attempt) {
                        warn!(
                            attempt,
                            max_attempts = self.retry_config.max_attempts,
                            "fetch failed after all retries"
                        );
                        return Err(err);
                    }

                    let is_retryable = err
                        .downcast_ref::<reqwest::Error>()
                        .is_some_and(is_retryable_error);

                    if !is_retryable {
                        warn!(?err, "fetch error is not retryable");
                        return Err(err);
                    }

                    let delay = self.retry_config.delay_for_attempt(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        "fetch failed, retrying after delay"
                    );

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl FetchStage for HttpFetchStage {
    async fn fetch(&self, ctx: &RunContext) -> Result<FetchedCorpus> {
        info!(
            job_id = %ctx.job_id,
            from = %ctx.from.to_rfc3339(),
            to = %ctx.to.to_rfc3339(),
            "fetching article window"
        );

        let articles = self.fetch_with_retry(ctx.from, ctx.to).await?;

        info!(job_id = %ctx.job_id, count = articles.len(), "fetched articles");

        Ok(FetchedCorpus {
            job_id: ctx.job_id,
            articles: articles.into_iter().map(into_raw_article).collect(),
        })
    }
}

fn into_raw_article(article: SourceArticle) -> RawArticle {
    RawArticle {
        id: article.id,
        title: article.title,
        text: article.text,
        url: article.url,
        handle: article.handle,
        timestamp: article.timestamp,
    }
}
