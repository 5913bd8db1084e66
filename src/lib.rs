pub mod config;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod pose;
pub mod render;
pub mod report;
pub mod rom;
pub mod video;

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` が無いときのログフィルタ
pub const DEFAULT_LOG_FILTER: &str = "abduction_rom=info,ort=warn";

/// バイナリ共通のログ初期化
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
