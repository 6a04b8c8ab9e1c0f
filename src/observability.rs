//! Tracing initialization for the worker.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Tracing サブスクライバをプロセスごとに一度だけ初期化する。
///
/// `RUST_LOG` が設定されていればそれを使用し、なければ `info` を既定と
/// して JSON fmt レイヤーを有効化します。複数の入口から呼ばれても安全で、
/// 2回目以降の呼び出しは何もしません。
pub fn init() {
    TRACING_INIT.get_or_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false).json();

        // try_init so embedding applications that already installed a global
        // subscriber keep theirs.
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();
    });
}
