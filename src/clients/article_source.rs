//! 記事ソースからの記事取得クライアント。
//!
//! 外部の記事ストアから、指定された時間ウィンドウの生記事レコードを
//! 取得します。レコードは欠損フィールドを含むことがあり、何を残すかは
//! サニタイズ側が判断します。

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

/// ソースが返す生記事レコードの構造。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceArticle {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ArticlesResponse {
    articles: Vec<SourceArticle>,
}

#[derive(Debug, Clone)]
pub struct ArticleSourceConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
    pub service_token: Option<String>,
}

/// 記事ソースとの通信を管理するクライアント。
#[derive(Debug, Clone)]
pub struct ArticleSourceClient {
    client: Client,
    base_url: Url,
    service_token: Option<String>,
}

impl ArticleSourceClient {
    /// 新しい記事ソースクライアントを作成する。
    ///
    /// # Errors
    /// URLのパースまたはHTTPクライアントの構築に失敗した場合はエラーを
    /// 返します。
    pub fn new(config: ArticleSourceConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .build()
            .context("failed to build article source HTTP client")?;

        let base_url = Url::parse(&config.base_url).context("invalid article source base URL")?;

        Ok(Self {
            client,
            base_url,
            service_token: config.service_token,
        })
    }

    /// `[from, to]` の期間に公開された記事を全件取得する。
    ///
    /// # Errors
    /// リクエストの失敗、非成功ステータス、レスポンスのデシリアライズ
    /// 失敗の場合はエラーを返します。
    pub async fn fetch_articles(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SourceArticle>> {
        let mut url = self
            .base_url
            .join("v1/articles")
            .context("failed to build articles URL")?;

        {
            let mut query_pairs = url.query_pairs_mut();
            query_pairs.append_pair("from", &from.to_rfc3339());
            query_pairs.append_pair("to", &to.to_rfc3339());
        }

        debug!(from = %from.to_rfc3339(), to = %to.to_rfc3339(), "fetching article window");

        let mut request = self.client.get(url);
        if let Some(token) = &self.service_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("article source request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("article source returned error status {status}: {error_body}");
        }

        let parsed = response
            .json::<ArticlesResponse>()
            .await
            .context("failed to deserialize article source response")?;

        Ok(parsed.articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> ArticleSourceConfig {
        ArticleSourceConfig {
            base_url,
            connect_timeout: Duration::from_secs(3),
            total_timeout: Duration::from_secs(30),
            service_token: None,
        }
    }

    #[tokio::test]
    async fn fetch_articles_parses_partial_records() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "articles": [
                {
                    "id": "art-1",
                    "title": "Trade war hits markets",
                    "text": "Markets fell as the trade war widened.",
                    "url": "https://example.com/1",
                    "handle": "reuters",
                    "timestamp": 1_700_000_000_i64
                },
                {
                    "id": "art-2",
                    "text": "A record without a title."
                }
            ]
        });

        Mock::given(method("GET"))
            .and(path("/v1/articles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = ArticleSourceClient::new(test_config(server.uri())).expect("client builds");
        let articles = client
            .fetch_articles(Utc::now(), Utc::now())
            .await
            .expect("fetch succeeds");

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].handle.as_deref(), Some("reuters"));
        assert!(articles[1].title.is_none());
    }

    #[tokio::test]
    async fn fetch_articles_surfaces_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/articles"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = ArticleSourceClient::new(test_config(server.uri())).expect("client builds");
        let err = client
            .fetch_articles(Utc::now(), Utc::now())
            .await
            .expect_err("must fail");

        assert!(err.to_string().contains("503"));
    }
}
