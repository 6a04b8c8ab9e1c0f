//! 記事とトピックの紐付け。
//!
//! 照合は記事本文のクリーニング済み形（非英数字を除去して小文字化）に
//! 対する文字どおりの部分文字列一致。候補フレーズ全体をひとつの
//! Aho-Corasick オートマトンにまとめ、重なりを許して照合するため、
//! より広い候補の内側に入れ子になったフレーズも拾える。ヒットは正規
//! トピックに解決される。トークン化やステミングはここでは行わない。
//! 単語の途中にまたがる一致も起こり得るが、生の包含照合に伴う既知の
//! 精度・再現率トレードオフである。

use aho_corasick::AhoCorasick;
use anyhow::{Context, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::info;
use uuid::Uuid;

use crate::util::text;

use super::normalize::CanonicalMap;
use super::sanitize::{Article, SanitizedCorpus};

/// 本文中に見つかった正規トピックを注釈した記事集合。グラフ構築が消費
/// するトピック→記事インデックスも併せて持つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedCorpus {
    pub job_id: Uuid,
    pub articles: Vec<Article>,
    /// 相異なる正規トピック（初出順）
    pub topics: Vec<String>,
    /// 記事ごと（`articles` と並行）: `topics` へのインデックス集合
    pub article_topics: Vec<FxHashSet<usize>>,
    /// トピックごと（`topics` と並行）: `articles` へのインデックス（昇順）
    pub topic_articles: Vec<Vec<usize>>,
}

/// 候補フレーズ全体に対する部分文字列マッチャ。ヒットを正規トピックに
/// 解決する。
#[derive(Debug)]
pub struct TopicLinker {
    automaton: AhoCorasick,
    pattern_topic: Vec<usize>,
    topics: Vec<String>,
}

impl TopicLinker {
    /// 正規マップの候補フレーズからマッチャを構築する。
    ///
    /// # Errors
    /// オートマトンの構築に失敗した場合はエラーを返します。
    pub fn new(map: &CanonicalMap) -> Result<Self> {
        let topics = map.topics().to_vec();
        let topic_index: FxHashMap<&str, usize> = topics
            .iter()
            .enumerate()
            .map(|(index, topic)| (topic.as_str(), index))
            .collect();

        let pattern_topic = map
            .phrases()
            .iter()
            .map(|phrase| topic_index[map.resolve(phrase)])
            .collect();

        let automaton =
            AhoCorasick::new(map.phrases()).context("failed to build topic automaton")?;

        Ok(Self {
            automaton,
            pattern_topic,
            topics,
        })
    }

    /// 各記事を、クリーニング済み本文が含む正規トピックへ紐付ける。
    #[must_use]
    pub fn link(&self, corpus: SanitizedCorpus) -> LinkedCorpus {
        let mut article_topics = Vec::with_capacity(corpus.articles.len());
        let mut topic_articles: Vec<Vec<usize>> = vec![Vec::new(); self.topics.len()];

        for (article_index, article) in corpus.articles.iter().enumerate() {
            let cleaned = text::clean_for_matching(&article.text);

            let mut matched: FxHashSet<usize> = FxHashSet::default();
            for hit in self.automaton.find_overlapping_iter(&cleaned) {
                matched.insert(self.pattern_topic[hit.pattern().as_usize()]);
            }

            for &topic in &matched {
                topic_articles[topic].push(article_index);
            }
            article_topics.push(matched);
        }

        let linked_articles = article_topics
            .iter()
            .filter(|topics| !topics.is_empty())
            .count();
        info!(
            job_id = %corpus.job_id,
            articles = corpus.articles.len(),
            linked_articles,
            topics = self.topics.len(),
            "linked articles to topics"
        );

        LinkedCorpus {
            job_id: corpus.job_id,
            articles: corpus.articles,
            topics: self.topics.clone(),
            article_topics,
            topic_articles,
        }
    }
}
