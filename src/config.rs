use std::{env, time::Duration};

use thiserror::Error;

#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// ワーカープロセス1つ分のランタイム設定。環境変数から読み込む。
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    article_source_base_url: String,
    article_source_service_token: Option<String>,
    mwe_extractor_base_url: String,
    mwe_extractor_service_token: Option<String>,
    graph_sink_base_url: String,
    graph_sink_service_token: Option<String>,
    http_connect_timeout: Duration,
    http_total_timeout: Duration,
    http_max_retries: usize,
    http_backoff_base_ms: u64,
    http_backoff_cap_ms: u64,
    window: Duration,
    dedup_similarity_threshold: u8,
    min_phrase_tokens: usize,
    community_splits: usize,
    pagerank_damping: f64,
    pagerank_iterations: usize,
    value_scale: f64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// 環境変数からワーカーの設定値を読み込み、検証する。
    ///
    /// 必須のベースURLが揃っていない場合や、数値のパース・検証に失敗した
    /// 場合はエラーを返す。
    ///
    /// # Errors
    /// 必須の環境変数が未設定、もしくは値のパースに失敗した場合は
    /// [`ConfigError`] を返す。
    pub fn from_env() -> Result<Self, ConfigError> {
        let article_source_base_url = env_var("ARTICLE_SOURCE_BASE_URL")?;
        let article_source_service_token = env::var("ARTICLE_SOURCE_SERVICE_TOKEN").ok();
        let mwe_extractor_base_url = env_var("MWE_EXTRACTOR_BASE_URL")?;
        let mwe_extractor_service_token = env::var("MWE_EXTRACTOR_SERVICE_TOKEN").ok();
        let graph_sink_base_url = env_var("GRAPH_SINK_BASE_URL")?;
        let graph_sink_service_token = env::var("GRAPH_SINK_SERVICE_TOKEN").ok();

        let http_connect_timeout = parse_duration_ms("HTTP_CONNECT_TIMEOUT_MS", 3000)?;
        let http_total_timeout = parse_duration_ms("HTTP_TOTAL_TIMEOUT_MS", 30_000)?;
        let http_max_retries = parse_usize("HTTP_MAX_RETRIES", 3)?;
        let http_backoff_base_ms = parse_u64("HTTP_BACKOFF_BASE_MS", 250)?;
        let http_backoff_cap_ms = parse_u64("HTTP_BACKOFF_CAP_MS", 10_000)?;

        // The source window covers the most recent two hours by default.
        let window = parse_duration_secs("TOPIC_WINDOW_SECS", 7200)?;

        let dedup_similarity_threshold = parse_u8("DEDUP_SIMILARITY_THRESHOLD", 90)?;
        if dedup_similarity_threshold > 100 {
            return Err(ConfigError::Invalid {
                name: "DEDUP_SIMILARITY_THRESHOLD",
                source: anyhow::anyhow!(
                    "similarity threshold must be 0-100, got {dedup_similarity_threshold}"
                ),
            });
        }

        let min_phrase_tokens = parse_usize("MIN_PHRASE_TOKENS", 2)?;
        if min_phrase_tokens == 0 {
            return Err(ConfigError::Invalid {
                name: "MIN_PHRASE_TOKENS",
                source: anyhow::anyhow!("phrase token minimum must be at least 1"),
            });
        }

        // Six divisive splits is the tuned production default; there is no
        // adaptive stopping criterion.
        let community_splits = parse_usize("COMMUNITY_SPLITS", 6)?;

        let pagerank_damping = parse_f64("PAGERANK_DAMPING", 0.85)?;
        if !(pagerank_damping > 0.0 && pagerank_damping < 1.0) {
            return Err(ConfigError::Invalid {
                name: "PAGERANK_DAMPING",
                source: anyhow::anyhow!("damping must be in (0, 1), got {pagerank_damping}"),
            });
        }

        let pagerank_iterations = parse_usize("PAGERANK_ITERATIONS", 30)?;
        if pagerank_iterations == 0 {
            return Err(ConfigError::Invalid {
                name: "PAGERANK_ITERATIONS",
                source: anyhow::anyhow!("iteration count must be at least 1"),
            });
        }

        let value_scale = parse_f64("VALUE_SCALE", 4.0)?;
        if value_scale <= 0.0 {
            return Err(ConfigError::Invalid {
                name: "VALUE_SCALE",
                source: anyhow::anyhow!("value scale must be positive, got {value_scale}"),
            });
        }

        Ok(Self {
            article_source_base_url,
            article_source_service_token,
            mwe_extractor_base_url,
            mwe_extractor_service_token,
            graph_sink_base_url,
            graph_sink_service_token,
            http_connect_timeout,
            http_total_timeout,
            http_max_retries,
            http_backoff_base_ms,
            http_backoff_cap_ms,
            window,
            dedup_similarity_threshold,
            min_phrase_tokens,
            community_splits,
            pagerank_damping,
            pagerank_iterations,
            value_scale,
        })
    }

    #[must_use]
    pub fn article_source_base_url(&self) -> &str {
        &self.article_source_base_url
    }

    #[must_use]
    pub fn article_source_service_token(&self) -> Option<&str> {
        self.article_source_service_token.as_deref()
    }

    #[must_use]
    pub fn mwe_extractor_base_url(&self) -> &str {
        &self.mwe_extractor_base_url
    }

    #[must_use]
    pub fn mwe_extractor_service_token(&self) -> Option<&str> {
        self.mwe_extractor_service_token.as_deref()
    }

    #[must_use]
    pub fn graph_sink_base_url(&self) -> &str {
        &self.graph_sink_base_url
    }

    #[must_use]
    pub fn graph_sink_service_token(&self) -> Option<&str> {
        self.graph_sink_service_token.as_deref()
    }

    #[must_use]
    pub fn http_connect_timeout(&self) -> Duration {
        self.http_connect_timeout
    }

    #[must_use]
    pub fn http_total_timeout(&self) -> Duration {
        self.http_total_timeout
    }

    #[must_use]
    pub fn http_max_retries(&self) -> usize {
        self.http_max_retries
    }

    #[must_use]
    pub fn http_backoff_base_ms(&self) -> u64 {
        self.http_backoff_base_ms
    }

    #[must_use]
    pub fn http_backoff_cap_ms(&self) -> u64 {
        self.http_backoff_cap_ms
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    #[must_use]
    pub fn dedup_similarity_threshold(&self) -> u8 {
        self.dedup_similarity_threshold
    }

    #[must_use]
    pub fn min_phrase_tokens(&self) -> usize {
        self.min_phrase_tokens
    }

    #[must_use]
    pub fn community_splits(&self) -> usize {
        self.community_splits
    }

    #[must_use]
    pub fn pagerank_damping(&self) -> f64 {
        self.pagerank_damping
    }

    #[must_use]
    pub fn pagerank_iterations(&self) -> usize {
        self.pagerank_iterations
    }

    #[must_use]
    pub fn value_scale(&self) -> f64 {
        self.value_scale
    }
}

fn env_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
            name,
            source: anyhow::Error::new(e),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
            name,
            source: anyhow::Error::new(e),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_u8(name: &'static str, default: u8) -> Result<u8, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
            name,
            source: anyhow::Error::new(e),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_f64(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
            name,
            source: anyhow::Error::new(e),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_duration_ms(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    Ok(Duration::from_millis(parse_u64(name, default_ms)?))
}

fn parse_duration_secs(name: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    Ok(Duration::from_secs(parse_u64(name, default_secs)?))
}
