//! # 错误类型定义

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::providers::ProviderKind;

use super::ErrorCategory;

/// 对调用方暴露的错误分类
///
/// 这是一个封闭集合：前端只依据这个字段决定如何反应（例如 `CredentialMissing`
/// 时弹出密钥输入框），不要去匹配错误消息文本。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    CredentialMissing,
    CredentialInvalid,
    ProviderUnreachable,
    ProviderTimeout,
    ProviderRateLimited,
    ProviderAuthRejected,
    UpstreamMalformedResponse,
    ValidationFailed,
    ResourceExhausted,
    Internal,
}

impl ErrorKind {
    /// 稳定的字符串表示，与序列化结果一致
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CredentialMissing => "CREDENTIAL_MISSING",
            Self::CredentialInvalid => "CREDENTIAL_INVALID",
            Self::ProviderUnreachable => "PROVIDER_UNREACHABLE",
            Self::ProviderTimeout => "PROVIDER_TIMEOUT",
            Self::ProviderRateLimited => "PROVIDER_RATE_LIMITED",
            Self::ProviderAuthRejected => "PROVIDER_AUTH_REJECTED",
            Self::UpstreamMalformedResponse => "UPSTREAM_MALFORMED_RESPONSE",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::Internal => "INTERNAL",
        }
    }

    /// 瞬时故障：不会改变已存储凭证的状态
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(
            self,
            Self::ProviderUnreachable | Self::ProviderTimeout | Self::ProviderRateLimited
        )
    }

    #[must_use]
    pub const fn category(self) -> ErrorCategory {
        match self {
            Self::CredentialMissing
            | Self::CredentialInvalid
            | Self::ProviderAuthRejected
            | Self::ValidationFailed => ErrorCategory::Client,
            Self::ProviderUnreachable
            | Self::ProviderTimeout
            | Self::ProviderRateLimited
            | Self::UpstreamMalformedResponse
            | Self::ResourceExhausted
            | Self::Internal => ErrorCategory::Server,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 网关主要错误类型
///
/// 所有消息在构造时就已经去除了密钥内容，可以直接返回给调用方。
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no credential configured for provider '{provider}'")]
    CredentialMissing { provider: ProviderKind },

    #[error("credential for provider '{provider}' is invalid: {message}")]
    CredentialInvalid {
        provider: ProviderKind,
        message: String,
    },

    #[error("provider '{provider}' is unreachable: {message}")]
    ProviderUnreachable {
        provider: ProviderKind,
        message: String,
    },

    #[error("provider '{provider}' did not answer within {timeout_ms}ms")]
    ProviderTimeout {
        provider: ProviderKind,
        timeout_ms: u64,
    },

    #[error("provider '{provider}' rate limit exceeded")]
    ProviderRateLimited {
        provider: ProviderKind,
        retry_after_secs: Option<u64>,
    },

    #[error("provider '{provider}' rejected the credential: {message}")]
    ProviderAuthRejected {
        provider: ProviderKind,
        message: String,
    },

    #[error("malformed response from provider '{provider}': {message}")]
    UpstreamMalformedResponse {
        provider: ProviderKind,
        message: String,
    },

    #[error("validation failed: {message}")]
    ValidationFailed {
        message: String,
        field: Option<String>,
    },

    #[error("credential store exhausted: {message}")]
    ResourceExhausted { message: String },

    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 配置错误（只在启动阶段出现）
    #[error("configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl GatewayError {
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::ValidationFailed {
            message: message.into(),
            field: None,
        }
    }

    /// 创建带字段名的验证错误
    pub fn validation_field<T: Into<String>, F: Into<String>>(message: T, field: F) -> Self {
        Self::ValidationFailed {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 错误分类
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::CredentialMissing { .. } => ErrorKind::CredentialMissing,
            Self::CredentialInvalid { .. } => ErrorKind::CredentialInvalid,
            Self::ProviderUnreachable { .. } => ErrorKind::ProviderUnreachable,
            Self::ProviderTimeout { .. } => ErrorKind::ProviderTimeout,
            Self::ProviderRateLimited { .. } => ErrorKind::ProviderRateLimited,
            Self::ProviderAuthRejected { .. } => ErrorKind::ProviderAuthRejected,
            Self::UpstreamMalformedResponse { .. } => ErrorKind::UpstreamMalformedResponse,
            Self::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            Self::ResourceExhausted { .. } => ErrorKind::ResourceExhausted,
            Self::Internal { .. } | Self::Config { .. } => ErrorKind::Internal,
        }
    }

    /// 关联的服务商（如果有）
    #[must_use]
    pub const fn provider(&self) -> Option<ProviderKind> {
        match self {
            Self::CredentialMissing { provider }
            | Self::CredentialInvalid { provider, .. }
            | Self::ProviderUnreachable { provider, .. }
            | Self::ProviderTimeout { provider, .. }
            | Self::ProviderRateLimited { provider, .. }
            | Self::ProviderAuthRejected { provider, .. }
            | Self::UpstreamMalformedResponse { provider, .. } => Some(*provider),
            _ => None,
        }
    }

    /// 验证错误关联的字段
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::ValidationFailed { field, .. } => field.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind().category()
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::internal_with_source("I/O failure", err)
    }
}

impl From<toml::de::Error> for GatewayError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source(format!("failed to parse TOML: {}", err.message()), err)
    }
}

impl From<tokio::task::JoinError> for GatewayError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal_with_source("background task failed", err)
    }
}
