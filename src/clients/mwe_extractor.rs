//! MWE（複数語表現）抽出器クライアント。
//!
//! 抽出器はブラックボックス: サニタイズ済みの記事を受け取り、アンダー
//! スコア結合の候補フレーズを返します。フレーズの整形（アンダースコアの
//! 書き換え、トークン数フィルタ）はここではなく抽出ステージで行います。

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 抽出器へ送る記事1件の借用ビュー。
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExtractInput<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    articles: &'a [ExtractInput<'a>],
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    mwes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MweExtractorConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
    pub service_token: Option<String>,
}

/// MWE抽出器との通信を管理するクライアント。
#[derive(Debug, Clone)]
pub struct MweExtractorClient {
    client: Client,
    base_url: Url,
    service_token: Option<String>,
}

impl MweExtractorClient {
    /// 新しいMWE抽出器クライアントを作成する。
    ///
    /// # Errors
    /// URLのパースまたはHTTPクライアントの構築に失敗した場合はエラーを
    /// 返します。
    pub fn new(config: MweExtractorConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .build()
            .context("failed to build MWE extractor HTTP client")?;

        let base_url = Url::parse(&config.base_url).context("invalid MWE extractor base URL")?;

        Ok(Self {
            client,
            base_url,
            service_token: config.service_token,
        })
    }

    /// 記事集合に対して抽出を実行し、アンダースコア結合の候補フレーズを
    /// そのまま返す。
    ///
    /// # Errors
    /// リクエストの失敗、非成功ステータス、レスポンスのデシリアライズ
    /// 失敗の場合はエラーを返します。
    pub async fn extract(&self, articles: &[ExtractInput<'_>]) -> Result<Vec<String>> {
        let url = self
            .base_url
            .join("v1/extract")
            .context("failed to build extract URL")?;

        debug!(articles = articles.len(), "requesting MWE extraction");

        let mut request = self.client.post(url).json(&ExtractRequest { articles });
        if let Some(token) = &self.service_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("MWE extractor request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("MWE extractor returned error status {status}: {error_body}");
        }

        let parsed = response
            .json::<ExtractResponse>()
            .await
            .context("failed to deserialize MWE extractor response")?;

        Ok(parsed.mwes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> MweExtractorConfig {
        MweExtractorConfig {
            base_url,
            connect_timeout: Duration::from_secs(3),
            total_timeout: Duration::from_secs(30),
            service_token: None,
        }
    }

    #[tokio::test]
    async fn extract_posts_articles_and_returns_phrases() {
        let server = MockServer::start().await;

        let body = serde_json::json!({ "mwes": ["trade_war", "trade_war_markets"] });

        Mock::given(method("POST"))
            .and(path("/v1/extract"))
            .and(body_partial_json(serde_json::json!({
                "articles": [{"id": "art-1"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = MweExtractorClient::new(test_config(server.uri())).expect("client builds");
        let phrases = client
            .extract(&[ExtractInput {
                id: "art-1",
                title: "Trade war hits markets",
                text: "Markets fell as the trade war widened.",
            }])
            .await
            .expect("extract succeeds");

        assert_eq!(phrases, ["trade_war", "trade_war_markets"]);
    }

    #[tokio::test]
    async fn extract_surfaces_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/extract"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = MweExtractorClient::new(test_config(server.uri())).expect("client builds");
        let err = client
            .extract(&[ExtractInput {
                id: "art-1",
                title: "t",
                text: "x",
            }])
            .await
            .expect_err("must fail");

        assert!(err.to_string().contains("500"));
    }
}
