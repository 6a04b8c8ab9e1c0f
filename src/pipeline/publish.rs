use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use crate::clients::graph_sink::GraphSinkClient;
use crate::schema::GraphDocument;

use super::RunContext;

#[async_trait]
pub trait PublishStage: Send + Sync {
    async fn publish(&self, ctx: &RunContext, document: &GraphDocument) -> Result<()>;
}

/// 組み立て済みドキュメントをグラフシンクへPOSTするステージ。シンクの
/// 失敗は実行を中断させる。ジョブ全体を再実行するかどうかは呼び出し側の
/// 判断。
pub struct HttpPublishStage {
    client: Arc<GraphSinkClient>,
}

impl HttpPublishStage {
    #[must_use]
    pub fn new(client: Arc<GraphSinkClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PublishStage for HttpPublishStage {
    async fn publish(&self, ctx: &RunContext, document: &GraphDocument) -> Result<()> {
        self.client
            .publish(document)
            .await
            .context("failed to publish graph document")?;

        info!(
            job_id = %ctx.job_id,
            nodes = document.nodes.len(),
            links = document.links.len(),
            "published graph document"
        );

        Ok(())
    }
}
