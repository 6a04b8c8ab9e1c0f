//! 共起グラフに対するコミュニティ検出。
//!
//! 分割型の辺媒介中心性パーティショニング（Girvan–Newman）の実装。
//! 1回の「分割」では、連結成分の数が増えるまで媒介中心性最大のエッジを
//! 取り除く。パーティショナは固定回数の分割を進めたあと、連結成分を
//! そのまま最終的なパーティションとして読み取る。適応的な停止条件は
//! ない。分割が少なすぎるとトピックの分離が不十分になり、多すぎると
//! 断片化する。チューニング済みの既定値は6。

use std::collections::VecDeque;

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use tracing::debug;

use super::graph::TopicGraph;

/// 重み付きグラフを、グループ内の結合がグループ間より密になるように、
/// 互いに素で網羅的なノードグループへ分割する。契約を満たすアルゴリズム
/// なら何でもこのトレイトの実装になり得る。
pub trait CommunityDetector: Send + Sync {
    fn partition(&self, graph: &TopicGraph, splits: usize) -> Vec<Vec<NodeIndex>>;
}

/// Girvan–Newman 辺媒介中心性パーティショナ。
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeBetweennessDetector;

impl CommunityDetector for EdgeBetweennessDetector {
    fn partition(&self, graph: &TopicGraph, splits: usize) -> Vec<Vec<NodeIndex>> {
        let mut working = WorkingGraph::from_graph(graph);
        let mut components = working.component_count();

        for _ in 0..splits {
            let target = components + 1;
            while components < target {
                let Some(edge) = working.max_betweenness_edge() else {
                    break;
                };
                working.remove_edge(edge);
                components = working.component_count();
            }
            if !working.has_edges() {
                break;
            }
        }

        let communities = working.communities();
        debug!(
            nodes = graph.node_count(),
            communities = communities.len(),
            "partitioned graph"
        );

        communities
            .into_iter()
            .map(|members| members.into_iter().map(NodeIndex::new).collect())
            .collect()
    }
}

/// エッジ除去用のスクラッチコピー。媒介中心性は除去のたびに一から
/// 再計算する。二乗オーダー相当だが、このワーカーが扱うウィンドウの
/// 規模では問題にならない。
struct WorkingGraph {
    nodes: usize,
    edges: Vec<(usize, usize)>,
    alive: Vec<bool>,
}

impl WorkingGraph {
    fn from_graph(graph: &TopicGraph) -> Self {
        let edges: Vec<(usize, usize)> = graph
            .edge_references()
            .map(|edge| (edge.source().index(), edge.target().index()))
            .collect();

        Self {
            nodes: graph.node_count(),
            alive: vec![true; edges.len()],
            edges,
        }
    }

    fn has_edges(&self) -> bool {
        self.alive.iter().any(|&alive| alive)
    }

    fn remove_edge(&mut self, edge: usize) {
        self.alive[edge] = false;
    }

    /// 生存エッジに対する隣接リスト: `(隣接ノード, エッジ番号)` のペア。
    fn adjacency(&self) -> Vec<Vec<(usize, usize)>> {
        let mut adjacency = vec![Vec::new(); self.nodes];
        for (index, &(u, v)) in self.edges.iter().enumerate() {
            if self.alive[index] {
                adjacency[u].push((v, index));
                adjacency[v].push((u, index));
            }
        }
        adjacency
    }

    fn component_count(&self) -> usize {
        self.component_labels().1
    }

    fn component_labels(&self) -> (Vec<usize>, usize) {
        let adjacency = self.adjacency();
        let mut labels = vec![usize::MAX; self.nodes];
        let mut count = 0;

        for start in 0..self.nodes {
            if labels[start] != usize::MAX {
                continue;
            }
            labels[start] = count;
            let mut queue = VecDeque::from([start]);
            while let Some(node) = queue.pop_front() {
                for &(next, _) in &adjacency[node] {
                    if labels[next] == usize::MAX {
                        labels[next] = count;
                        queue.push_back(next);
                    }
                }
            }
            count += 1;
        }

        (labels, count)
    }

    /// Brandes の最短路集計をエッジに帰属させる。重みなしBFSの最短路で、
    /// 全ノードが始点として寄与するため無向エッジは両側から数えられる
    /// が、argmax には影響しない。同点はエッジ番号の小さい方を取る。
    fn max_betweenness_edge(&self) -> Option<usize> {
        let adjacency = self.adjacency();
        let mut betweenness = vec![0.0_f64; self.edges.len()];

        for source in 0..self.nodes {
            let mut order: Vec<usize> = Vec::new();
            let mut preds: Vec<Vec<(usize, usize)>> = vec![Vec::new(); self.nodes];
            let mut sigma = vec![0.0_f64; self.nodes];
            let mut dist = vec![-1_i64; self.nodes];

            sigma[source] = 1.0;
            dist[source] = 0;
            let mut queue = VecDeque::from([source]);

            while let Some(node) = queue.pop_front() {
                order.push(node);
                for &(next, edge) in &adjacency[node] {
                    if dist[next] < 0 {
                        dist[next] = dist[node] + 1;
                        queue.push_back(next);
                    }
                    if dist[next] == dist[node] + 1 {
                        sigma[next] += sigma[node];
                        preds[next].push((node, edge));
                    }
                }
            }

            let mut delta = vec![0.0_f64; self.nodes];
            for &node in order.iter().rev() {
                for &(pred, edge) in &preds[node] {
                    let credit = sigma[pred] / sigma[node] * (1.0 + delta[node]);
                    betweenness[edge] += credit;
                    delta[pred] += credit;
                }
            }
        }

        let mut best: Option<(usize, f64)> = None;
        for (index, &score) in betweenness.iter().enumerate() {
            if !self.alive[index] {
                continue;
            }
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((index, score)),
            }
        }

        best.map(|(index, _)| index)
    }

    /// 生存エッジ上の連結成分。メンバーは昇順、グループは最小メンバー順。
    fn communities(&self) -> Vec<Vec<usize>> {
        let (labels, count) = self.component_labels();
        let mut groups = vec![Vec::new(); count];
        for (node, &label) in labels.iter().enumerate() {
            groups[label].push(node);
        }
        groups
    }
}

/// コミュニティIDをグラフへ書き込む。
pub fn apply_groups(graph: &mut TopicGraph, communities: &[Vec<NodeIndex>]) {
    for (group, members) in communities.iter().enumerate() {
        for &member in members {
            if let Some(vertex) = graph.node_weight_mut(member) {
                vertex.group = Some(group);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::graph::Vertex;
    use crate::pipeline::sanitize::Article;
    use rustc_hash::FxHashSet;

    fn vertex(id: &str) -> Vertex {
        Vertex {
            article: Article {
                id: id.to_string(),
                title: format!("title {id}"),
                text: format!("text {id}"),
                url: String::new(),
                handle: String::new(),
                timestamp: 0,
            },
            value: 1.0,
            group: None,
            is_centroid: false,
        }
    }

    /// Two dense triangles joined by a single bridge edge.
    fn barbell() -> TopicGraph {
        let mut graph = TopicGraph::new_undirected();
        let nodes: Vec<NodeIndex> = (0..6)
            .map(|index| graph.add_node(vertex(&format!("art-{index}"))))
            .collect();

        for &(a, b) in &[(0, 1), (0, 2), (1, 2), (3, 4), (3, 5), (4, 5)] {
            graph.add_edge(nodes[a], nodes[b], 1);
        }
        graph.add_edge(nodes[2], nodes[3], 1);
        graph
    }

    #[test]
    fn one_split_cuts_the_bridge() {
        let graph = barbell();
        let communities = EdgeBetweennessDetector.partition(&graph, 1);

        assert_eq!(communities.len(), 2);
        let sizes: Vec<usize> = communities.iter().map(Vec::len).collect();
        assert_eq!(sizes, [3, 3]);

        let first: FxHashSet<usize> = communities[0].iter().map(|n| n.index()).collect();
        assert_eq!(first, FxHashSet::from_iter([0, 1, 2]));
    }

    #[test]
    fn partition_is_exhaustive_and_disjoint() {
        let graph = barbell();
        let communities = EdgeBetweennessDetector.partition(&graph, 6);

        let mut seen = FxHashSet::default();
        let mut total = 0;
        for community in &communities {
            for node in community {
                assert!(seen.insert(node.index()), "node in two communities");
                total += 1;
            }
        }
        assert_eq!(total, graph.node_count());
    }

    #[test]
    fn zero_splits_returns_connected_components() {
        let graph = barbell();
        let communities = EdgeBetweennessDetector.partition(&graph, 0);

        assert_eq!(communities.len(), 1);
        assert_eq!(communities[0].len(), 6);
    }

    #[test]
    fn isolated_vertices_become_singleton_communities() {
        let mut graph = TopicGraph::new_undirected();
        let a = graph.add_node(vertex("a"));
        let b = graph.add_node(vertex("b"));
        let c = graph.add_node(vertex("c"));
        graph.add_edge(a, b, 1);

        let communities = EdgeBetweennessDetector.partition(&graph, 6);

        assert!(communities.iter().any(|m| m.as_slice() == [c]));
    }

    #[test]
    fn splits_beyond_edges_drain_gracefully() {
        let mut graph = TopicGraph::new_undirected();
        let a = graph.add_node(vertex("a"));
        let b = graph.add_node(vertex("b"));
        graph.add_edge(a, b, 1);

        let communities = EdgeBetweennessDetector.partition(&graph, 50);

        assert_eq!(communities.len(), 2);
    }

    #[test]
    fn empty_graph_partitions_to_nothing() {
        let graph = TopicGraph::new_undirected();
        let communities = EdgeBetweennessDetector.partition(&graph, 6);
        assert!(communities.is_empty());
    }

    #[test]
    fn apply_groups_writes_group_ids() {
        let mut graph = barbell();
        let communities = EdgeBetweennessDetector.partition(&graph, 1);
        apply_groups(&mut graph, &communities);

        for node in graph.node_indices() {
            assert!(graph[node].group.is_some());
        }
        assert_eq!(graph[NodeIndex::new(0)].group, graph[NodeIndex::new(1)].group);
        assert_ne!(graph[NodeIndex::new(0)].group, graph[NodeIndex::new(5)].group);
    }
}
