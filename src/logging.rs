//! # 日志配置模块
//!
//! `RUST_LOG` 优先于配置文件中的级别。出站 HTTP 客户端的内部日志默认压低，
//! 避免请求细节进入日志。

use std::env;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 根据基础级别构造默认过滤规则
#[must_use]
pub fn default_filter(level: &str) -> String {
    format!("{level},credential_gateway=debug,hyper=warn,hyper_util=warn,reqwest=warn,h2=warn")
}

/// 初始化日志系统
///
/// 重复初始化（例如测试中）会被忽略。
pub fn init_logging(level: Option<&str>) {
    let level = level.unwrap_or("info");
    let log_filter = env::var("RUST_LOG").unwrap_or_else(|_| default_filter(level));

    let initialized = tracing_subscriber::registry()
        .with(EnvFilter::try_new(&log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init()
        .is_ok();

    if initialized {
        tracing::debug!(filter = %log_filter, "logging initialized");
    }
}

/// 环境变量设置指南
pub fn print_logging_help() {
    println!("Logging configuration:");
    println!("  RUST_LOG=info                          # standard level");
    println!("  RUST_LOG=debug                         # debug level");
    println!("  RUST_LOG=info,credential_gateway=trace # detailed gateway tracing");
    println!("  GATEWAY_LOG_LEVEL=warn                 # base level when RUST_LOG is unset");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        let filter = default_filter("warn");
        assert!(filter.starts_with("warn,"));
        assert!(EnvFilter::try_new(filter).is_ok());
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_logging(Some("debug"));
        init_logging(None);
    }
}
