//! 結果シンククライアント: 組み立て済みグラフドキュメントを公開する。

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use tracing::debug;

use crate::schema::GraphDocument;

#[derive(Debug, Clone)]
pub struct GraphSinkConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
    pub service_token: Option<String>,
}

/// グラフシンクとの通信を管理するクライアント。
#[derive(Debug, Clone)]
pub struct GraphSinkClient {
    client: Client,
    base_url: Url,
    service_token: Option<String>,
}

impl GraphSinkClient {
    /// 新しいグラフシンククライアントを作成する。
    ///
    /// # Errors
    /// URLのパースまたはHTTPクライアントの構築に失敗した場合はエラーを
    /// 返します。
    pub fn new(config: GraphSinkConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .build()
            .context("failed to build graph sink HTTP client")?;

        let base_url = Url::parse(&config.base_url).context("invalid graph sink base URL")?;

        Ok(Self {
            client,
            base_url,
            service_token: config.service_token,
        })
    }

    /// グラフドキュメントを1件公開する。
    ///
    /// # Errors
    /// リクエストの失敗、またはシンクが非成功ステータスを返した場合は
    /// エラーを返します。
    pub async fn publish(&self, document: &GraphDocument) -> Result<()> {
        let url = self
            .base_url
            .join("v1/graphs")
            .context("failed to build graphs URL")?;

        debug!(
            nodes = document.nodes.len(),
            links = document.links.len(),
            "publishing graph document"
        );

        let mut request = self.client.post(url).json(document);
        if let Some(token) = &self.service_token {
            request = request.bearer_auth(token);
        }

        request
            .send()
            .await
            .context("graph sink request failed")?
            .error_for_status()
            .context("graph sink returned error status")?;

        Ok(())
    }
}
