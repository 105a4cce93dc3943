//! # 会话标识
//!
//! 会话 ID 是客户端自带的关联键，不是身份凭据：这里只负责把请求归到某个会话，
//! 不做任何认证。

pub mod clock;

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::CredentialStore;

pub use clock::{Clock, ManualClock, SystemClock};

/// 客户端提交的会话 ID 最大长度
pub const MAX_SESSION_ID_LEN: usize = 128;

/// 会话ID类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// 生成新的随机会话ID
    #[must_use]
    pub fn mint() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// 校验客户端提交的会话ID
    ///
    /// 只接受 `[A-Za-z0-9._:-]`，长度 1..=128；其余一律视为未提供。
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let well_formed = !raw.is_empty()
            && raw.len() <= MAX_SESSION_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b':' | b'-'));
        well_formed.then(|| Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 日志中使用的截断形式
    #[must_use]
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map_or(self.0.len(), |(idx, _)| idx);
        &self.0[..end]
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for SessionId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub id: SessionId,
    /// 请求到达时不存在对应的存活会话
    pub created: bool,
}

/// 会话解析器
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    store: Arc<CredentialStore>,
}

impl SessionIdentity {
    #[must_use]
    pub const fn new(store: Arc<CredentialStore>) -> Self {
        Self { store }
    }

    /// 解析请求携带的关联键，总是成功
    ///
    /// - 命中存活会话：刷新 `last_seen` 并返回；
    /// - 格式合法但未知（或已过期）：沿用该键作为新会话；
    /// - 缺失或格式非法：生成新ID。
    ///
    /// 新会话不会立即写入存储，第一次写入凭证时才登记，
    /// 不带关联键的请求因此不会让会话表增长。
    #[must_use]
    pub fn resolve(&self, supplied: Option<&str>) -> ResolvedSession {
        if let Some(id) = supplied.and_then(SessionId::parse) {
            if self.store.touch(&id) {
                return ResolvedSession { id, created: false };
            }
            tracing::debug!(session = %id.short(), "adopted client supplied session");
            return ResolvedSession { id, created: true };
        }

        let id = SessionId::mint();
        tracing::debug!(session = %id.short(), "minted new session");
        ResolvedSession { id, created: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Auxiliary, ProviderKind};
    use crate::store::{SecretMaterial, SecretSealer, StoreSettings};
    use chrono::{Duration, Utc};
    use rstest::rstest;

    fn identity_with_clock() -> (SessionIdentity, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = CredentialStore::new(
            StoreSettings {
                ttl: Duration::hours(1),
                max_records: 16,
            },
            SecretSealer::ephemeral(),
            clock.clone(),
        );
        (SessionIdentity::new(Arc::new(store)), clock)
    }

    #[rstest]
    #[case("abc-123", true)]
    #[case("10.0.0.1_8812734", true)]
    #[case("tenant:session.v2", true)]
    #[case("", false)]
    #[case("   ", false)]
    #[case("has space", false)]
    #[case("semi;colon", false)]
    #[case("ünïcode", false)]
    fn parse_accepts_only_safe_keys(#[case] raw: &str, #[case] accepted: bool) {
        assert_eq!(SessionId::parse(raw).is_some(), accepted);
    }

    #[test]
    fn parse_rejects_oversized_keys() {
        let raw = "a".repeat(MAX_SESSION_ID_LEN + 1);
        assert!(SessionId::parse(&raw).is_none());
        assert!(SessionId::parse(&raw[..MAX_SESSION_ID_LEN]).is_some());
    }

    #[test]
    fn minted_ids_are_distinct() {
        assert_ne!(SessionId::mint(), SessionId::mint());
    }

    #[test]
    fn short_form_truncates() {
        let id = SessionId::parse("0123456789abcdef").unwrap();
        assert_eq!(id.short(), "01234567");
        let id = SessionId::parse("abc").unwrap();
        assert_eq!(id.short(), "abc");
    }

    fn store_credential(identity: &SessionIdentity, id: &SessionId) {
        identity
            .store
            .set(
                id,
                ProviderKind::AiResearch,
                &SecretMaterial::from("sk-session"),
                Auxiliary::new(),
            )
            .unwrap();
    }

    #[test]
    fn resolve_without_key_mints_session() {
        let (identity, _) = identity_with_clock();
        let resolved = identity.resolve(None);
        assert!(resolved.created);
        store_credential(&identity, &resolved.id);

        let again = identity.resolve(Some(resolved.id.as_str()));
        assert!(!again.created);
        assert_eq!(again.id, resolved.id);
    }

    #[test]
    fn anonymous_requests_do_not_grow_the_session_table() {
        let (identity, _) = identity_with_clock();
        for _ in 0..50 {
            assert!(identity.resolve(None).created);
        }
        assert!(identity.resolve(Some("never-written")).created);
        assert!(identity.resolve(Some("bad key!")).created);
        assert_eq!(identity.store.stats().sessions, 0);
    }

    #[test]
    fn resolve_adopts_unknown_well_formed_key() {
        let (identity, _) = identity_with_clock();
        let resolved = identity.resolve(Some("client-key-1"));
        assert!(resolved.created);
        assert_eq!(resolved.id.as_str(), "client-key-1");
    }

    #[test]
    fn resolve_replaces_malformed_key() {
        let (identity, _) = identity_with_clock();
        let resolved = identity.resolve(Some("bad key with spaces"));
        assert!(resolved.created);
        assert_ne!(resolved.id.as_str(), "bad key with spaces");
    }

    #[test]
    fn expired_session_is_resolved_as_new() {
        let (identity, clock) = identity_with_clock();
        let first = identity.resolve(Some("idle-session"));
        store_credential(&identity, &first.id);
        assert!(!identity.resolve(Some("idle-session")).created);
        clock.advance(Duration::hours(2));
        let second = identity.resolve(Some(first.id.as_str()));
        assert!(second.created);
        assert_eq!(second.id, first.id);
    }
}
