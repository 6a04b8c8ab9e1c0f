//! 最終ドキュメントの組み立て。

use std::collections::BTreeSet;

use petgraph::visit::EdgeRef;

use crate::schema::{GraphDocument, GraphLink, GraphNode};

use super::RunContext;
use super::graph::{TopicGraph, edge_id};

/// スコアリング・剪定済みのグラフと実行メタデータをシンク用ドキュメント
/// へシリアライズする。空のグラフでも動作し、記事のないウィンドウは
/// そのまま空ドキュメントとして出荷される。
#[must_use]
pub fn assemble(ctx: &RunContext, graph: &TopicGraph) -> GraphDocument {
    let nodes = graph
        .node_indices()
        .map(|index| {
            let vertex = &graph[index];
            GraphNode {
                id: vertex.article.id.clone(),
                centroid: vertex.is_centroid,
                url: vertex.article.url.clone(),
                title: vertex.article.title.clone(),
                group: vertex.group.unwrap_or_default(),
                count: vertex.value,
            }
        })
        .collect();

    let links = graph
        .edge_references()
        .map(|edge| {
            let a = &graph[edge.source()].article.id;
            let b = &graph[edge.target()].article.id;
            let (source, target) = if a <= b { (a, b) } else { (b, a) };
            GraphLink {
                id: edge_id(a, b),
                source: source.clone(),
                target: target.clone(),
            }
        })
        .collect();

    let sources: Vec<String> = graph
        .node_indices()
        .map(|index| graph[index].article.handle.clone())
        .filter(|handle| !handle.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    GraphDocument {
        nodes,
        links,
        from_ts: ctx.from.timestamp(),
        to_ts: ctx.to.timestamp(),
        from_date: ctx.from.to_rfc3339(),
        to_date: ctx.to.to_rfc3339(),
        sources,
    }
}
