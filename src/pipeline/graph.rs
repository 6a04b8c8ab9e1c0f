//! 共起グラフの構築。

use petgraph::graph::{NodeIndex, UnGraph};
use tracing::debug;

use super::link::LinkedCorpus;
use super::sanitize::Article;

/// 記事1件を包むグラフノードのデータ。
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub article: Article,
    /// 中心性由来の表示ウェイト
    pub value: f64,
    /// コミュニティID（分割により割り当て）
    pub group: Option<usize>,
    pub is_centroid: bool,
}

impl Vertex {
    fn new(article: Article) -> Self {
        Self {
            article,
            value: 1.0,
            group: None,
            is_centroid: false,
        }
    }
}

/// 無向の記事グラフ。エッジのウェイトは両端が共有する相異なる正規
/// トピックの数。
pub type TopicGraph = UnGraph<Vertex, u32>;

/// 安定したリンクID。辞書順で小さい記事IDを先頭に置くため、同じ
/// 非順序ペアは常に同じIDになる。
#[must_use]
pub fn edge_id(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}--{b}")
    } else {
        format!("{b}--{a}")
    }
}

/// 共起グラフを構築する。サニタイズ済み記事ごとにノードを1つ作り
/// （トピックに一致しなかった記事は孤立ノードとして残る）、正規
/// トピックを1つ以上共有する記事の非順序ペアごとにエッジをちょうど
/// 1本張る。
#[must_use]
pub fn build_graph(linked: &LinkedCorpus) -> TopicGraph {
    let mut graph = TopicGraph::with_capacity(linked.articles.len(), linked.articles.len());

    let nodes: Vec<NodeIndex> = linked
        .articles
        .iter()
        .map(|article| graph.add_node(Vertex::new(article.clone())))
        .collect();

    for members in &linked.topic_articles {
        for (position, &left) in members.iter().enumerate() {
            for &right in &members[position + 1..] {
                let (a, b) = (nodes[left], nodes[right]);
                if let Some(edge) = graph.find_edge(a, b) {
                    if let Some(weight) = graph.edge_weight_mut(edge) {
                        *weight += 1;
                    }
                } else {
                    graph.add_edge(a, b, 1);
                }
            }
        }
    }

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built co-occurrence graph"
    );

    graph
}
