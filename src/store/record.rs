//! # 凭证记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sealer::SealedSecret;
use crate::providers::Auxiliary;

/// 凭证验证状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialStatus {
    Unvalidated,
    Valid,
    Invalid,
}

impl CredentialStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unvalidated => "UNVALIDATED",
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
        }
    }
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 某个 (会话, 服务商) 下的凭证快照
///
/// 记录本身不可变：状态变化会生成一份新记录替换旧记录，
/// 已经拿到 `Arc` 快照的调用方不受影响。
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    sealed: SealedSecret,
    fingerprint: String,
    auxiliary: Auxiliary,
    status: CredentialStatus,
    validated_at: Option<DateTime<Utc>>,
    version: u64,
    stored_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub(crate) const fn new(
        sealed: SealedSecret,
        fingerprint: String,
        auxiliary: Auxiliary,
        version: u64,
        stored_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sealed,
            fingerprint,
            auxiliary,
            status: CredentialStatus::Unvalidated,
            validated_at: None,
            version,
            stored_at,
        }
    }

    /// 复制出一份新状态的记录，版本号不变
    #[must_use]
    pub fn with_status(&self, status: CredentialStatus, at: DateTime<Utc>) -> Self {
        Self {
            status,
            validated_at: Some(at),
            ..self.clone()
        }
    }

    #[must_use]
    pub const fn status(&self) -> CredentialStatus {
        self.status
    }

    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub const fn validated_at(&self) -> Option<DateTime<Utc>> {
        self.validated_at
    }

    #[must_use]
    pub const fn stored_at(&self) -> DateTime<Utc> {
        self.stored_at
    }

    #[must_use]
    pub const fn auxiliary(&self) -> &Auxiliary {
        &self.auxiliary
    }

    /// 与材料指纹比对
    #[must_use]
    pub fn matches_material(&self, fingerprint: &str) -> bool {
        self.fingerprint == fingerprint
    }

    pub(crate) const fn sealed(&self) -> &SealedSecret {
        &self.sealed
    }
}
