//! # 应用配置结构定义

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};

/// 应用主配置结构
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP 服务配置
    pub server: ServerConfig,
    /// 会话配置
    pub session: SessionConfig,
    /// 凭证存储配置
    pub store: StoreConfig,
    /// 服务商配置
    pub providers: ProvidersConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub bind_address: String,
    /// 监听端口
    pub port: u16,
    /// API 路由前缀
    pub api_prefix: String,
    /// 是否启用 CORS
    pub enable_cors: bool,
    /// 允许的跨域来源，空列表表示任意来源
    pub cors_origins: Vec<String>,
    /// 请求体大小上限（字节）
    pub max_request_size: usize,
    /// 单个请求的整体超时（秒）
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8000,
            api_prefix: "/api".to_string(),
            enable_cors: true,
            cors_origins: Vec::new(),
            max_request_size: 1024 * 1024,
            request_timeout_seconds: 120,
        }
    }
}

impl ServerConfig {
    /// 监听地址字符串
    #[must_use]
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// 会话配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// 会话空闲超时（秒），默认 4 小时
    pub ttl_seconds: u64,
    /// 过期会话清理间隔（秒）
    pub sweep_interval_seconds: u64,
    /// 携带会话 ID 的请求头
    pub header_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 4 * 60 * 60,
            sweep_interval_seconds: 300,
            header_name: "x-session-id".to_string(),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

/// 凭证存储配置
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// 全局记录上限
    pub max_records: usize,
    /// 封存密钥（64 位十六进制），未配置时每次启动随机生成
    #[serde(skip_serializing)]
    pub sealing_key: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_records: 10_000,
            sealing_key: None,
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("max_records", &self.max_records)
            .field("sealing_key", &self.sealing_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// 服务商配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub ai_research: AiResearchConfig,
    pub data_platform: DataPlatformConfig,
}

/// AI 研究服务配置（OpenAI 兼容接口）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiResearchConfig {
    pub base_url: String,
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub probe_timeout_ms: u64,
    pub invoke_timeout_ms: u64,
}

impl Default for AiResearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-chat".to_string(),
            system_prompt: "You are an expert economic research assistant. Provide insightful \
                analysis on economic indicators, monetary policy, and financial markets. Be \
                precise, data-driven, and professional in your responses."
                .to_string(),
            max_tokens: 4000,
            temperature: 0.1,
            probe_timeout_ms: 5_000,
            invoke_timeout_ms: 60_000,
        }
    }
}

/// 数据平台配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPlatformConfig {
    pub probe_timeout_ms: u64,
    pub invoke_timeout_ms: u64,
    /// SQL 语句同步等待时间（秒），服务商允许 5..=50
    pub statement_wait_seconds: u64,
}

impl Default for DataPlatformConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 5_000,
            invoke_timeout_ms: 30_000,
            statement_wait_seconds: 30,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// 会话 TTL 上限（30 天）
const MAX_SESSION_TTL_SECONDS: u64 = 30 * 24 * 3600;

impl AppConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(GatewayError::config("server.port must be greater than 0"));
        }
        if self.server.bind_address.trim().is_empty() {
            return Err(GatewayError::config("server.bind_address cannot be empty"));
        }
        let prefix = &self.server.api_prefix;
        if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
            return Err(GatewayError::config(
                "server.api_prefix must start with '/' and name a path segment, e.g. '/api'",
            ));
        }
        if self.server.max_request_size == 0 || self.server.request_timeout_seconds == 0 {
            return Err(GatewayError::config(
                "server.max_request_size and server.request_timeout_seconds must be greater than 0",
            ));
        }

        if self.session.ttl_seconds == 0 || self.session.ttl_seconds > MAX_SESSION_TTL_SECONDS {
            return Err(GatewayError::config(format!(
                "session.ttl_seconds must be between 1 and {MAX_SESSION_TTL_SECONDS}"
            )));
        }
        if self.session.sweep_interval_seconds == 0 {
            return Err(GatewayError::config(
                "session.sweep_interval_seconds must be greater than 0",
            ));
        }
        if self.session.header_name.trim().is_empty() {
            return Err(GatewayError::config("session.header_name cannot be empty"));
        }

        if self.store.max_records == 0 {
            return Err(GatewayError::config("store.max_records must be greater than 0"));
        }

        let ai = &self.providers.ai_research;
        if ai.base_url.trim().is_empty() {
            return Err(GatewayError::config(
                "providers.ai_research.base_url cannot be empty",
            ));
        }
        if ai.model.trim().is_empty() {
            return Err(GatewayError::config("providers.ai_research.model cannot be empty"));
        }
        if ai.probe_timeout_ms == 0 || ai.invoke_timeout_ms == 0 {
            return Err(GatewayError::config(
                "providers.ai_research timeouts must be greater than 0",
            ));
        }

        let data = &self.providers.data_platform;
        if data.probe_timeout_ms == 0 || data.invoke_timeout_ms == 0 {
            return Err(GatewayError::config(
                "providers.data_platform timeouts must be greater than 0",
            ));
        }
        if !(5..=50).contains(&data.statement_wait_seconds) {
            return Err(GatewayError::config(
                "providers.data_platform.statement_wait_seconds must be between 5 and 50",
            ));
        }

        // 整体请求超时必须晚于任何服务商预算触发，否则客户端拿不到结构化错误
        let longest_budget_ms = [
            ai.probe_timeout_ms,
            ai.invoke_timeout_ms,
            data.probe_timeout_ms,
            data.invoke_timeout_ms,
        ]
        .into_iter()
        .max()
        .unwrap_or_default();
        if self.server.request_timeout_seconds.saturating_mul(1000) <= longest_budget_ms {
            return Err(GatewayError::config(format!(
                "server.request_timeout_seconds ({}s) must exceed the longest provider timeout ({longest_budget_ms}ms)",
                self.server.request_timeout_seconds
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.ttl_seconds, 14_400);
        assert_eq!(config.providers.ai_research.model, "deepseek-chat");
        assert_eq!(config.server.listen_address(), "127.0.0.1:8000");
    }

    #[test]
    fn zero_values_are_rejected() {
        let mut config = AppConfig::default();
        config.session.ttl_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.store.max_records = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.providers.ai_research.invoke_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.providers.data_platform.statement_wait_seconds = 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn request_timeout_must_outlast_provider_budgets() {
        let mut config = AppConfig::default();
        config.server.request_timeout_seconds = 1;
        config.providers.ai_research.invoke_timeout_ms = 3_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("request_timeout_seconds"));

        // 相等也不行：两个计时器会同时触发
        let mut config = AppConfig::default();
        config.server.request_timeout_seconds = 30;
        config.providers.ai_research.invoke_timeout_ms = 1_000;
        config.providers.data_platform.invoke_timeout_ms = 30_000;
        assert!(config.validate().is_err());

        config.server.request_timeout_seconds = 31;
        assert!(config.validate().is_ok());

        let mut config = AppConfig::default();
        config.server.request_timeout_seconds = 5;
        config.providers.ai_research.invoke_timeout_ms = 1_000;
        config.providers.data_platform.invoke_timeout_ms = 1_000;
        config.providers.data_platform.probe_timeout_ms = 5_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [session]
            ttl_seconds = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.session.ttl_seconds, 60);
        assert_eq!(config.session.header_name, "x-session-id");
    }

    #[test]
    fn sealing_key_is_not_printed() {
        let mut config = AppConfig::default();
        config.store.sealing_key = Some("ab".repeat(32));
        let printed = format!("{config:?}");
        assert!(!printed.contains(&"ab".repeat(32)));
    }
}
