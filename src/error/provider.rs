//! # 服务商原生错误
//!
//! 适配器把各自的 HTTP 状态码、传输错误、响应体解析失败统一成 `ProviderError`，
//! 再由 [`ErrorTranslator`](super::translate::ErrorTranslator) 映射为对外的 `GatewayError`。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// 服务商明确拒绝了凭证（401/403）
    #[error("credential rejected by provider (status {status})")]
    AuthRejected { status: u16 },

    #[error("provider rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },

    /// 传输层超时（连接或读取）
    #[error("provider request timed out")]
    Timeout,

    #[error("provider unreachable: {0}")]
    Unreachable(String),

    /// 服务端 5xx
    #[error("provider API error (status {status})")]
    Api { status: u16 },

    #[error("invalid response from provider: {0}")]
    InvalidResponse(String),

    /// 服务商拒绝了请求内容（非凭证原因），或本地请求构建失败
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl ProviderError {
    /// 是否为凭证授权类错误
    #[must_use]
    pub const fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::AuthRejected { .. })
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
