//! # API 响应结构
//!
//! 统一的 JSON 响应格式：
//! - 成功：`{success: true, data, message, timestamp}`
//! - 失败：`{success: false, error: {code, kind, message, provider, field}, timestamp}`
//!
//! 前端只依据 `error.kind` 做分支判断。

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCategory, ErrorKind, GatewayError};
use crate::providers::ProviderKind;

/// # 标准成功响应
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// # 标准错误信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// # 标准错误响应
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorInfo,
    pub timestamp: DateTime<Utc>,
}

/// 错误分类对应的 HTTP 状态码
#[must_use]
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::CredentialMissing => StatusCode::PRECONDITION_REQUIRED,
        ErrorKind::CredentialInvalid | ErrorKind::ProviderAuthRejected => StatusCode::UNAUTHORIZED,
        ErrorKind::ValidationFailed => StatusCode::BAD_REQUEST,
        ErrorKind::ProviderRateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::ProviderTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::ProviderUnreachable | ErrorKind::UpstreamMalformedResponse => {
            StatusCode::BAD_GATEWAY
        }
        ErrorKind::ResourceExhausted => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// # API响应枚举
///
/// 统一所有API出口，方便转换为 `axum::response::Response`
#[derive(Debug)]
pub enum ApiResponse<T: Serialize> {
    Success(T),
    SuccessWithMessage(T, String),
    AppError(GatewayError),
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self {
            Self::Success(data) => (
                StatusCode::OK,
                Json(SuccessResponse {
                    success: true,
                    data: Some(data),
                    message: None,
                    timestamp: Utc::now(),
                }),
            )
                .into_response(),
            Self::SuccessWithMessage(data, message) => (
                StatusCode::OK,
                Json(SuccessResponse {
                    success: true,
                    data: Some(data),
                    message: Some(message),
                    timestamp: Utc::now(),
                }),
            )
                .into_response(),
            Self::AppError(error) => error_response(&error),
        }
    }
}

fn error_response(error: &GatewayError) -> Response {
    let kind = error.kind();
    let status = status_for(kind);

    match (kind, error.category()) {
        (ErrorKind::Internal, _) => {
            tracing::error!(error = ?error, "request failed with internal error");
        }
        (_, ErrorCategory::Server) => {
            tracing::warn!(kind = %kind, error = %error, "request failed upstream");
        }
        (_, ErrorCategory::Client) => {}
    }

    let body = ErrorResponse {
        success: false,
        error: ErrorInfo {
            code: kind.as_str().to_string(),
            kind,
            message: error.to_string(),
            provider: error.provider(),
            field: error.field().map(ToString::to_string),
        },
        timestamp: Utc::now(),
    };

    let mut response = (status, Json(body)).into_response();
    if let GatewayError::ProviderRateLimited {
        retry_after_secs: Some(secs),
        ..
    } = error
    {
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(*secs));
    }
    response
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        error_response(&self)
    }
}

/// # 便捷函数：成功响应
pub fn success<T: Serialize>(data: T) -> Response {
    ApiResponse::Success(data).into_response()
}

/// # 便捷函数：带消息的成功响应
pub fn success_with_message<T: Serialize>(data: T, message: &str) -> Response {
    ApiResponse::SuccessWithMessage(data, message.to_string()).into_response()
}

/// # 便捷函数：应用错误响应
pub fn app_error(error: GatewayError) -> Response {
    ApiResponse::<()>::AppError(error).into_response()
}
