//! コミュニティ間リンクの剪定。
//!
//! グループとセントロイドの確定後、エッジが生き残るのは両端が同じ
//! コミュニティに属するか、少なくとも片端がセントロイドである場合のみ。
//! トピック内の構造とトピックハブ間のブリッジは残り、それ以外の
//! コミュニティ間の雑多なエッジは消える。

use tracing::debug;

use super::graph::TopicGraph;

/// コミュニティをまたぐ非セントロイドのエッジを剪定する。除去した本数を
/// 返す。
pub fn prune_links(graph: &mut TopicGraph) -> usize {
    let before = graph.edge_count();

    graph.retain_edges(|frozen, edge| {
        let Some((a, b)) = frozen.edge_endpoints(edge) else {
            return false;
        };
        let (Some(left), Some(right)) = (frozen.node_weight(a), frozen.node_weight(b)) else {
            return false;
        };
        let same_group = left.group.is_some() && left.group == right.group;
        same_group || left.is_centroid || right.is_centroid
    });

    let removed = before - graph.edge_count();
    debug!(
        removed,
        remaining = graph.edge_count(),
        "pruned cross-community links"
    );
    removed
}
