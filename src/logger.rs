//! 日志初始化

use tracing_subscriber::EnvFilter;

/// 初始化全局日志，优先使用 `RUST_LOG`
pub fn init() {
    init_with_verbose(false);
}

/// 初始化全局日志，`verbose` 为真时默认级别提升到 debug
///
/// 重复调用是安全的（测试里会多次调用）
pub fn init_with_verbose(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
