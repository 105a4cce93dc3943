//! # 配置管理器
//!
//! 配置来源的优先级：命令行 `--config` > `GATEWAY_CONFIG_PATH` >
//! `config/config.{RUST_ENV}.toml`。文件不存在时使用默认配置，
//! 最后应用 `GATEWAY_*` 环境变量覆盖并校验。

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::AppConfig;
use crate::error::{GatewayError, Result};

/// 支持的环境变量覆盖
pub const ENV_OVERRIDES: [&str; 6] = [
    "GATEWAY_BIND_ADDRESS",
    "GATEWAY_PORT",
    "GATEWAY_SESSION_TTL_SECONDS",
    "GATEWAY_AI_BASE_URL",
    "GATEWAY_LOG_LEVEL",
    "GATEWAY_SEALING_KEY",
];

/// 配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 当前配置
    config: AppConfig,
    /// 实际加载的文件（使用默认配置时为空）
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 按优先级加载配置
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = explicit_path.map_or_else(Self::default_path, Path::to_path_buf);
        Self::load_with(&path, |key| env::var(key).ok())
    }

    /// 默认配置文件路径
    #[must_use]
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("GATEWAY_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        let env = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        PathBuf::from(format!("config/config.{env}.toml"))
    }

    /// 从指定文件加载，环境变量通过 `lookup` 读取
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (mut config, source) = if path.exists() {
            (Self::load_config_file(path)?, Some(path.to_path_buf()))
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            (AppConfig::default(), None)
        };

        let applied = Self::apply_env_overrides(&mut config, lookup)?;
        config.validate()?;

        info!(
            source = %source.as_deref().map_or_else(|| "defaults".into(), Path::to_string_lossy),
            env_overrides = applied,
            "configuration loaded"
        );

        Ok(Self { config, source })
    }

    /// 获取当前配置
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn into_config(self) -> AppConfig {
        self.config
    }

    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// 加载配置文件
    fn load_config_file(path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::config_with_source(
                format!("failed to read config file {}", path.display()),
                e,
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            GatewayError::config_with_source(
                format!("failed to parse config file {}: {}", path.display(), e.message()),
                e,
            )
        })
    }

    /// 应用环境变量覆盖，返回生效的数量
    fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<usize>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0;
        for key in ENV_OVERRIDES {
            let Some(value) = lookup(key) else {
                continue;
            };
            debug!(
                key,
                value = if key.contains("KEY") { "***" } else { value.as_str() },
                "applying environment override"
            );
            Self::apply_override_to_config(config, key, value)?;
            applied += 1;
        }
        Ok(applied)
    }

    fn apply_override_to_config(config: &mut AppConfig, key: &str, value: String) -> Result<()> {
        match key {
            "GATEWAY_BIND_ADDRESS" => config.server.bind_address = value,
            "GATEWAY_PORT" => {
                config.server.port = value.trim().parse().map_err(|e| {
                    GatewayError::config_with_source(format!("invalid port: {value}"), e)
                })?;
            }
            "GATEWAY_SESSION_TTL_SECONDS" => {
                config.session.ttl_seconds = value.trim().parse().map_err(|e| {
                    GatewayError::config_with_source(format!("invalid session ttl: {value}"), e)
                })?;
            }
            "GATEWAY_AI_BASE_URL" => config.providers.ai_research.base_url = value,
            "GATEWAY_LOG_LEVEL" => config.logging.level = value,
            "GATEWAY_SEALING_KEY" => config.store.sealing_key = Some(value),
            _ => warn!(key, "unknown environment override ignored"),
        }
        Ok(())
    }
}
