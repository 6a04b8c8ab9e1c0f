//! コミュニティごとの中心性スコアリングとセントロイド選定。

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;
use tracing::debug;

use super::graph::TopicGraph;

/// コミュニティ1つの誘導部分グラフに対する非負の重要度スコア。スコアは
/// 同一コミュニティ内でのみ比較可能で、高いほどそのコミュニティ内で
/// 中心的。列挙されたメンバー全員がスコアを受け取らなければならない。
pub trait CentralityRanker: Send + Sync {
    fn score(&self, graph: &TopicGraph, members: &[NodeIndex]) -> FxHashMap<NodeIndex, f64>;
}

/// コミュニティの誘導部分グラフ上での重み付きランダムウォーク順位付け
/// （一様テレポートのPageRank）。コミュニティ外へ出るエッジは無視し、
/// コミュニティ内エッジを持たないメンバーは質量を一様にばらまく。
#[derive(Debug, Clone, Copy)]
pub struct PageRankRanker {
    pub damping: f64,
    pub iterations: usize,
}

impl Default for PageRankRanker {
    fn default() -> Self {
        Self {
            damping: 0.85,
            iterations: 30,
        }
    }
}

impl CentralityRanker for PageRankRanker {
    fn score(&self, graph: &TopicGraph, members: &[NodeIndex]) -> FxHashMap<NodeIndex, f64> {
        let n = members.len();
        if n == 0 {
            return FxHashMap::default();
        }
        // A singleton has nothing to walk over; its sole vertex scores 1.0.
        if n == 1 {
            return std::iter::once((members[0], 1.0)).collect();
        }

        let position: FxHashMap<NodeIndex, usize> = members
            .iter()
            .enumerate()
            .map(|(index, &member)| (member, index))
            .collect();

        let mut neighbors: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for (index, &member) in members.iter().enumerate() {
            for edge in graph.edges(member) {
                let other = if edge.source() == member {
                    edge.target()
                } else {
                    edge.source()
                };
                if let Some(&other_index) = position.get(&other) {
                    neighbors[index].push((other_index, f64::from(*edge.weight())));
                }
            }
        }
        let weight_sums: Vec<f64> = neighbors
            .iter()
            .map(|links| links.iter().map(|&(_, weight)| weight).sum())
            .collect();

        let size = n as f64;
        let mut scores = vec![1.0 / size; n];
        for _ in 0..self.iterations {
            let mut next = vec![(1.0 - self.damping) / size; n];
            for index in 0..n {
                if weight_sums[index] > 0.0 {
                    for &(other, weight) in &neighbors[index] {
                        next[other] += self.damping * scores[index] * weight / weight_sums[index];
                    }
                } else {
                    let share = self.damping * scores[index] / size;
                    for value in &mut next {
                        *value += share;
                    }
                }
            }
            scores = next;
        }

        members
            .iter()
            .enumerate()
            .map(|(index, &member)| (member, scores[index]))
            .collect()
    }
}

/// 各コミュニティを独立にスコアリングし、表示用の値を各ノードへ書き
/// 込み、コミュニティ内で最高スコアのノードをセントロイドとして印を
/// 付ける。
///
/// 表示値は `exp(value_scale × score)`。生スコアに対して単調で、低い
/// スコアもゼロより上に残るためすべてのノードが可視のまま保たれる。
/// スコアが同点の場合は最初に出会ったメンバーが勝つ。
pub fn score_communities(
    graph: &mut TopicGraph,
    communities: &[Vec<NodeIndex>],
    ranker: &dyn CentralityRanker,
    value_scale: f64,
) {
    for members in communities {
        if members.is_empty() {
            continue;
        }

        let scores = ranker.score(graph, members);

        let mut best: Option<(NodeIndex, f64)> = None;
        for &member in members {
            let score = scores.get(&member).copied().unwrap_or_default();
            if let Some(vertex) = graph.node_weight_mut(member) {
                vertex.value = (value_scale * score).exp();
            }
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((member, score)),
            }
        }

        if let Some((winner, _)) = best {
            if let Some(vertex) = graph.node_weight_mut(winner) {
                vertex.is_centroid = true;
            }
        }
    }

    debug!(communities = communities.len(), "scored communities");
}
