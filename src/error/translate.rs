//! # 错误翻译
//!
//! 把服务商的 HTTP 状态码族、传输层错误映射成 `ProviderError`，
//! 再把 `ProviderError` 映射成对外的 `GatewayError`。原始响应体永远不会透传。

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::HeaderValue;

use super::provider::ProviderError;
use super::types::GatewayError;
use crate::providers::ProviderKind;

/// 脱敏占位符
pub const REDACTED: &str = "[REDACTED]";

/// 错误翻译器
pub struct ErrorTranslator;

impl ErrorTranslator {
    /// 根据非 2xx 状态码归类
    #[must_use]
    pub fn classify_status(status: StatusCode, retry_after: Option<&HeaderValue>) -> ProviderError {
        match status.as_u16() {
            401 | 403 => ProviderError::AuthRejected {
                status: status.as_u16(),
            },
            429 => ProviderError::RateLimited {
                retry_after_secs: retry_after
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse().ok()),
            },
            408 | 504 => ProviderError::Timeout,
            500..=599 => ProviderError::Api {
                status: status.as_u16(),
            },
            other => ProviderError::InvalidRequest(format!(
                "provider rejected the request (status {other})"
            )),
        }
    }

    /// 归类传输层错误，`secret` 会从消息里剔除
    #[must_use]
    pub fn classify_transport(err: reqwest::Error, secret: &str) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_connect() {
            ProviderError::Unreachable("connection failed".to_string())
        } else if err.is_decode() {
            ProviderError::InvalidResponse("response body could not be decoded".to_string())
        } else if err.is_builder() {
            ProviderError::InvalidRequest("request could not be built".to_string())
        } else {
            ProviderError::Unreachable(Self::redact(&err.without_url().to_string(), secret))
        }
    }

    /// 映射为对外错误。`budget` 是本次调用的超时预算，只用于描述超时。
    #[must_use]
    pub fn translate(provider: ProviderKind, err: ProviderError, budget: Duration) -> GatewayError {
        match err {
            ProviderError::AuthRejected { status } => GatewayError::ProviderAuthRejected {
                provider,
                message: format!("provider answered with status {status}"),
            },
            ProviderError::RateLimited { retry_after_secs } => GatewayError::ProviderRateLimited {
                provider,
                retry_after_secs,
            },
            ProviderError::Timeout => GatewayError::ProviderTimeout {
                provider,
                timeout_ms: duration_ms(budget),
            },
            ProviderError::Unreachable(message) => {
                GatewayError::ProviderUnreachable { provider, message }
            }
            ProviderError::Api { status } => GatewayError::ProviderUnreachable {
                provider,
                message: format!("upstream answered with status {status}"),
            },
            ProviderError::InvalidResponse(message) => {
                GatewayError::UpstreamMalformedResponse { provider, message }
            }
            ProviderError::InvalidRequest(message) => GatewayError::validation(message),
            ProviderError::UnsupportedOperation(message) => {
                GatewayError::validation_field(message, "operation")
            }
        }
    }

    /// 从消息中移除密钥文本
    #[must_use]
    pub fn redact(message: &str, secret: &str) -> String {
        // 空模式会在每个字符之间插入替换文本
        if secret.is_empty() {
            return message.to_string();
        }
        message.replace(secret, REDACTED)
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rstest::rstest;

    #[rstest]
    #[case(401, ErrorKind::ProviderAuthRejected)]
    #[case(403, ErrorKind::ProviderAuthRejected)]
    #[case(429, ErrorKind::ProviderRateLimited)]
    #[case(408, ErrorKind::ProviderTimeout)]
    #[case(504, ErrorKind::ProviderTimeout)]
    #[case(500, ErrorKind::ProviderUnreachable)]
    #[case(503, ErrorKind::ProviderUnreachable)]
    #[case(400, ErrorKind::ValidationFailed)]
    #[case(404, ErrorKind::ValidationFailed)]
    fn status_families_map_to_kinds(#[case] status: u16, #[case] expected: ErrorKind) {
        let status = StatusCode::from_u16(status).unwrap();
        let provider_error = ErrorTranslator::classify_status(status, None);
        let err = ErrorTranslator::translate(
            ProviderKind::AiResearch,
            provider_error,
            Duration::from_secs(5),
        );
        assert_eq!(err.kind(), expected);
    }

    #[test]
    fn retry_after_is_parsed() {
        let header = HeaderValue::from_static("12");
        let err = ErrorTranslator::classify_status(StatusCode::TOO_MANY_REQUESTS, Some(&header));
        assert!(matches!(
            err,
            ProviderError::RateLimited {
                retry_after_secs: Some(12)
            }
        ));
    }

    #[test]
    fn timeout_reports_budget() {
        let err = ErrorTranslator::translate(
            ProviderKind::DataPlatform,
            ProviderError::Timeout,
            Duration::from_millis(1500),
        );
        assert!(err.to_string().contains("1500ms"));
        assert!(err.kind().is_transient());
    }

    #[test]
    fn redact_removes_secret() {
        let message = "request to host failed with key sk-live-123456";
        let redacted = ErrorTranslator::redact(message, "sk-live-123456");
        assert!(!redacted.contains("sk-live-123456"));
        assert!(redacted.contains(REDACTED));
    }

    #[test]
    fn redact_replaces_short_secrets_too() {
        let redacted = ErrorTranslator::redact("error sending request: token=ab; retry", "ab");
        assert!(!redacted.contains("ab;"));
        assert!(redacted.contains(REDACTED));
        assert_eq!(ErrorTranslator::redact("nothing to hide", ""), "nothing to hide");
    }
}
