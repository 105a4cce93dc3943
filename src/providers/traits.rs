//! # 适配器特征定义
//!
//! 定义所有外部服务商适配器需要实现的通用接口。新增服务商只需要新增一个实现，
//! 并在注册表中登记。

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use super::types::{Auxiliary, OperationKind, ProbeResult, ProviderKind, ProviderTimeouts};
use crate::error::{ProviderResult, Result};
use crate::store::SecretMaterial;

/// 外部服务商适配器特征
///
/// 适配器只在单次调用期间借用明文密钥，不得保存或记录它。
#[async_trait]
pub trait ProviderAdapter: Send + Sync + fmt::Debug {
    /// 服务商类型
    fn kind(&self) -> ProviderKind;

    /// 支持的操作列表
    fn supported_operations(&self) -> &'static [OperationKind];

    /// 检查是否支持指定操作
    fn supports(&self, operation: OperationKind) -> bool {
        self.supported_operations().contains(&operation)
    }

    /// 探测与调用的超时预算
    fn timeouts(&self) -> ProviderTimeouts;

    /// 校验附加字段，失败时返回 `ValidationFailed`
    fn validate_auxiliary(&self, auxiliary: &Auxiliary) -> Result<()>;

    /// 连通性探测：一次轻量请求
    ///
    /// 服务商明确拒绝凭证时返回 `Ok(ProbeResult { valid: false, .. })`，
    /// 其余失败（超时、不可达、限流）以错误返回。
    async fn validate(
        &self,
        material: &SecretMaterial,
        auxiliary: &Auxiliary,
    ) -> ProviderResult<ProbeResult>;

    /// 执行一次操作
    async fn invoke(
        &self,
        operation: OperationKind,
        material: &SecretMaterial,
        auxiliary: &Auxiliary,
        payload: &Value,
    ) -> ProviderResult<Value>;
}
