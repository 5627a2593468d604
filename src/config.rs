//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 应用配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

/// 账户发现配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// 每种账户类型允许的连续空账户数
    pub gap_limit: u32,
    pub enable_taproot: bool,
    /// 扫描时每个账户查询的交易页大小
    pub scan_page_size: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            gap_limit: std::env::var("DISCOVERY_GAP_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            enable_taproot: std::env::var("DISCOVERY_ENABLE_TAPROOT")
                .ok()
                .map(|v| v != "0")
                .unwrap_or(true),
            scan_page_size: std::env::var("DISCOVERY_SCAN_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
        }
    }
}

impl Config {
    /// 从环境变量加载配置（先加载 .env）
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Ok(Self {
            logging: LoggingConfig::default(),
            discovery: DiscoveryConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        if self.discovery.gap_limit == 0 {
            anyhow::bail!("DISCOVERY_GAP_LIMIT must be at least 1");
        }

        if self.discovery.scan_page_size == 0 {
            anyhow::bail!("DISCOVERY_SCAN_PAGE_SIZE must be at least 1");
        }

        Ok(())
    }
}
