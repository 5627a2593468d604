//! 日志系统配置模块
//! 支持结构化日志与日志级别配置

use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::config::LoggingConfig;

/// 初始化日志系统
///
/// `RUST_LOG` 优先于配置中的级别。全局订阅者已存在时返回错误。
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.format == "json" {
        Registry::default()
            .with(filter)
            .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()))
            .try_init()?;
    } else {
        Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true),
            )
            .try_init()?;
    }

    Ok(())
}
