//! # 凭证处理器
//!
//! 写入、查询、测试、删除凭证，以及通过存储的凭证调用服务商。

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{
        Path, State,
        rejection::{BytesRejection, JsonRejection},
    },
    response::Response,
};
use tracing::Instrument;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::api::middleware::RequestId;
use crate::api::response;
use crate::api::server::AppState;
use crate::error::{GatewayError, Result};
use crate::providers::{Auxiliary, OperationKind, ProviderKind};
use crate::session::ResolvedSession;
use crate::store::SecretMaterial;

/// 写入凭证请求
#[derive(Debug, Deserialize)]
pub struct SetCredentialRequest {
    pub secret: SecretMaterial,
    #[serde(default)]
    pub auxiliary: Auxiliary,
}

/// 测试凭证请求，字段都可省略
#[derive(Debug, Default, Deserialize)]
pub struct TestCredentialRequest {
    #[serde(default)]
    pub secret: Option<SecretMaterial>,
    #[serde(default)]
    pub auxiliary: Option<Auxiliary>,
}

/// 调用请求
#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    pub operation: OperationKind,
    #[serde(default)]
    pub payload: Value,
}

fn parse_provider(raw: &str) -> Result<ProviderKind> {
    raw.parse()
}

fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| GatewayError::validation(rejection.body_text()))
}

/// 原始请求体读取失败（如超出大小限制）同样归为校验错误
fn raw_body(body: std::result::Result<Bytes, BytesRejection>) -> Result<Bytes> {
    body.map_err(|rejection| GatewayError::validation(rejection.body_text()))
}

/// 空请求体视为默认值
fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| GatewayError::validation(format!("invalid JSON body: {e}")))
}

/// `PUT /providers/{provider}/credential`
pub async fn set_credential(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    Path(provider): Path<String>,
    body: std::result::Result<Json<SetCredentialRequest>, JsonRejection>,
) -> Result<Response> {
    let provider = parse_provider(&provider)?;
    let request = json_body(body)?;
    let view =
        state
            .gateway
            .set_credential(&session.id, provider, request.secret, request.auxiliary)?;
    Ok(response::success_with_message(view, "credential stored"))
}

/// `GET /providers/{provider}/credential`
pub async fn get_status(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    Path(provider): Path<String>,
) -> Result<Response> {
    let provider = parse_provider(&provider)?;
    Ok(response::success(state.gateway.status(&session.id, provider)))
}

/// `DELETE /providers/{provider}/credential`
pub async fn remove_credential(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    Path(provider): Path<String>,
) -> Result<Response> {
    let provider = parse_provider(&provider)?;
    let removed = state.gateway.remove_credential(&session.id, provider);
    Ok(response::success_with_message(
        json!({ "provider": provider, "removed": removed }),
        "credential removed",
    ))
}

/// `POST /providers/{provider}/credential/test`
pub async fn test_credential(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    Path(provider): Path<String>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Response> {
    let provider = parse_provider(&provider)?;
    let request: TestCredentialRequest = optional_body(&raw_body(body)?)?;
    let outcome = state
        .gateway
        .test_credential(&session.id, provider, request.secret, request.auxiliary)
        .await?;
    Ok(response::success(outcome))
}

/// `POST /providers/{provider}/invoke`
///
/// 请求ID作为本次操作的关联ID记录在日志中。
pub async fn invoke(
    State(state): State<AppState>,
    Extension(session): Extension<ResolvedSession>,
    Extension(request_id): Extension<RequestId>,
    Path(provider): Path<String>,
    body: std::result::Result<Json<InvokeRequest>, JsonRejection>,
) -> Result<Response> {
    let provider = parse_provider(&provider)?;
    let request = json_body(body)?;
    let span = tracing::info_span!(
        "operation",
        correlation_id = %request_id,
        operation = %request.operation
    );
    let data = state
        .gateway
        .invoke(&session.id, provider, request.operation, request.payload)
        .instrument(span)
        .await?;
    Ok(response::success(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_test_body_defaults() {
        let request: TestCredentialRequest = optional_body(&Bytes::from_static(b"  \n")).unwrap();
        assert!(request.secret.is_none());
        assert!(request.auxiliary.is_none());
    }

    #[test]
    fn malformed_test_body_is_validation_error() {
        let err = optional_body::<TestCredentialRequest>(&Bytes::from_static(b"{oops"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ValidationFailed);
    }

    #[test]
    fn request_debug_hides_secret() {
        let request: SetCredentialRequest =
            serde_json::from_str(r#"{"secret": "sk-hidden-value"}"#).unwrap();
        assert!(!format!("{request:?}").contains("sk-hidden-value"));
    }
}
