//! # 错误处理测试

use crate::error::{ErrorCategory, ErrorKind, GatewayError};
use crate::providers::ProviderKind;
use std::error::Error;

#[test]
fn test_credential_missing_is_structured() {
    let err = GatewayError::CredentialMissing {
        provider: ProviderKind::DataPlatform,
    };
    assert_eq!(err.kind(), ErrorKind::CredentialMissing);
    assert_eq!(err.provider(), Some(ProviderKind::DataPlatform));
    assert_eq!(err.category(), ErrorCategory::Client);
}

#[test]
fn test_validation_error_with_field() {
    let err = GatewayError::validation_field("host is required", "auxiliary.host");
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert_eq!(err.field(), Some("auxiliary.host"));
    assert_eq!(err.to_string(), "validation failed: host is required");
}

#[test]
fn test_config_error_with_source() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let err = GatewayError::config_with_source("failed to read config", io_err);

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(err.source().is_some());
}

#[test]
fn test_auto_conversion_from_io_error() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: GatewayError = io_err.into();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[test]
fn test_error_kind_serializes_stably() {
    let json = serde_json::to_string(&ErrorKind::CredentialMissing).unwrap();
    assert_eq!(json, "\"CREDENTIAL_MISSING\"");
    assert_eq!(ErrorKind::UpstreamMalformedResponse.as_str(), "UPSTREAM_MALFORMED_RESPONSE");
}

#[test]
fn test_transient_kinds() {
    assert!(ErrorKind::ProviderTimeout.is_transient());
    assert!(ErrorKind::ProviderUnreachable.is_transient());
    assert!(!ErrorKind::ProviderAuthRejected.is_transient());
    assert!(!ErrorKind::CredentialInvalid.is_transient());
}
