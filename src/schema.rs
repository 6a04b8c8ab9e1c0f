//! 公開するグラフドキュメントのワイヤ型定義。
//!
//! 可視化シンクとの契約: 生き残った記事ごとに1ノード、生き残った共起
//! エッジごとに1リンク、およびフロントエンドがグラフの見出しに使う
//! ウィンドウメタデータを持ちます。

use serde::{Deserialize, Serialize};

/// 公開グラフ内の記事ノード。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// 記事ID
    pub id: String,
    /// コミュニティの代表見出しかどうか
    pub centroid: bool,
    pub url: String,
    pub title: String,
    /// コミュニティID
    pub group: usize,
    /// 中心性由来の表示ウェイト
    pub count: f64,
}

/// 記事ノード2つを結ぶ共起リンク。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    /// 両端の記事IDから導出される安定ID
    pub id: String,
    pub source: String,
    pub target: String,
}

/// 結果シンクが受け取るドキュメント全体。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    /// ウィンドウ開始（エポック秒）
    pub from_ts: i64,
    /// ウィンドウ終了（エポック秒）
    pub to_ts: i64,
    /// ウィンドウ開始（RFC 3339）
    pub from_date: String,
    /// ウィンドウ終了（RFC 3339）
    pub to_date: String,
    /// 記事を提供したソースのハンドル（重複なし・ソート済み）
    pub sources: Vec<String>,
}
