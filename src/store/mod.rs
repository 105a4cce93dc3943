//! # 凭证存储
//!
//! 按会话分片的并发映射：`DashMap` 管理会话，每个会话自带一把读写锁保护其
//! 服务商记录，不存在全局锁。
//!
//! 锁顺序：持有 `DashMap` 分片锁时可以再获取会话状态锁，反之不行。
//! 会话过期是惰性的，任何访问都会先检查 TTL，后台清理任务只是回收内存。

pub mod record;
pub mod sealer;
pub mod secret;

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::config::AppConfig;
use crate::error::{GatewayError, Result};
use crate::providers::{Auxiliary, ProviderKind};
use crate::session::{Clock, SessionId};

pub use record::{CredentialRecord, CredentialStatus};
pub use sealer::{SealedSecret, SecretSealer};
pub use secret::SecretMaterial;

/// 存储参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSettings {
    /// 会话空闲超时
    pub ttl: Duration,
    /// 全局记录上限
    pub max_records: usize,
}

impl StoreSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            ttl: Duration::seconds(i64::try_from(config.session.ttl_seconds).unwrap_or(i64::MAX)),
            max_records: config.store.max_records,
        }
    }
}

/// 一次清理的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub sessions: usize,
    pub records: usize,
}

/// 单个会话的概况，不含凭证内容
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub credentials: usize,
}

/// 存储统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub sessions: usize,
    pub records: usize,
    pub max_records: usize,
}

#[derive(Debug, Default)]
struct SessionCredentials {
    /// 已从映射中移除，持有旧 `Arc` 的写入方需要重试
    evicted: bool,
    records: HashMap<ProviderKind, Arc<CredentialRecord>>,
}

#[derive(Debug)]
struct SessionEntry {
    created_at: DateTime<Utc>,
    last_seen_ms: AtomicI64,
    state: RwLock<SessionCredentials>,
}

impl SessionEntry {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            last_seen_ms: AtomicI64::new(now.timestamp_millis()),
            state: RwLock::new(SessionCredentials::default()),
        }
    }

    fn touch(&self, now: DateTime<Utc>) {
        self.last_seen_ms
            .fetch_max(now.timestamp_millis(), Ordering::AcqRel);
    }

    fn last_seen(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_seen_ms.load(Ordering::Acquire))
            .unwrap_or(self.created_at)
    }

    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.timestamp_millis() - self.last_seen_ms.load(Ordering::Acquire) > ttl.num_milliseconds()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionCredentials> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionCredentials> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 会话级凭证存储
#[derive(Debug)]
pub struct CredentialStore {
    sessions: DashMap<SessionId, Arc<SessionEntry>>,
    settings: StoreSettings,
    sealer: SecretSealer,
    clock: Arc<dyn Clock>,
    next_version: AtomicU64,
    record_count: AtomicUsize,
}

impl CredentialStore {
    pub fn new(settings: StoreSettings, sealer: SecretSealer, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            settings,
            sealer,
            clock,
            next_version: AtomicU64::new(0),
            record_count: AtomicUsize::new(0),
        }
    }

    /// 根据配置创建；未配置封存密钥时使用进程级随机密钥
    pub fn from_config(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let sealer = match config.store.sealing_key.as_deref() {
            Some(key) => SecretSealer::from_hex_key(key)?,
            None => SecretSealer::ephemeral(),
        };
        Ok(Self::new(StoreSettings::from_config(config), sealer, clock))
    }

    #[must_use]
    pub const fn settings(&self) -> StoreSettings {
        self.settings
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// 刷新存活会话的 `last_seen`，会话不存在或已过期时返回 false
    pub fn touch(&self, session: &SessionId) -> bool {
        self.live_entry(session, true).is_some()
    }

    /// 写入凭证，原子替换已有记录，新记录状态为 `UNVALIDATED`
    ///
    /// 会话在第一次写入时才进入映射。只有新增（非替换）记录且达到容量上限时才会失败。
    pub fn set(
        &self,
        session: &SessionId,
        provider: ProviderKind,
        material: &SecretMaterial,
        auxiliary: Auxiliary,
    ) -> Result<Arc<CredentialRecord>> {
        let sealed = self.sealer.seal(material)?;
        let fingerprint = material.fingerprint();

        loop {
            let entry = self.entry_or_insert(session);
            let mut state = entry.write();
            if state.evicted {
                continue;
            }

            if !state.records.contains_key(&provider) {
                self.reserve_slot()?;
            }

            let version = self.next_version.fetch_add(1, Ordering::AcqRel) + 1;
            let record = Arc::new(CredentialRecord::new(
                sealed,
                fingerprint,
                auxiliary,
                version,
                self.clock.now(),
            ));
            state.records.insert(provider, Arc::clone(&record));

            tracing::debug!(
                session = %session.short(),
                provider = %provider,
                version,
                "credential stored"
            );
            return Ok(record);
        }
    }

    /// 读取记录快照
    #[must_use]
    pub fn get(&self, session: &SessionId, provider: ProviderKind) -> Option<Arc<CredentialRecord>> {
        let entry = self.live_entry(session, false)?;
        let state = entry.read();
        state.records.get(&provider).cloned()
    }

    /// 版本匹配时标记为 `VALID`
    pub fn mark_valid(&self, session: &SessionId, provider: ProviderKind, version: u64) -> bool {
        self.transition(session, provider, version, CredentialStatus::Valid)
    }

    /// 版本匹配时标记为 `INVALID`
    pub fn mark_invalid(&self, session: &SessionId, provider: ProviderKind, version: u64) -> bool {
        self.transition(session, provider, version, CredentialStatus::Invalid)
    }

    /// 删除凭证，幂等
    pub fn remove(&self, session: &SessionId, provider: ProviderKind) -> bool {
        let Some(entry) = self.live_entry(session, false) else {
            return false;
        };
        let removed = entry.write().records.remove(&provider).is_some();
        if removed {
            self.record_count.fetch_sub(1, Ordering::AcqRel);
            tracing::debug!(session = %session.short(), provider = %provider, "credential removed");
        }
        removed
    }

    /// 删除整个会话及其全部记录，返回删除的记录数
    pub fn remove_session(&self, session: &SessionId) -> usize {
        self.sessions
            .remove(session)
            .map_or(0, |(_, entry)| self.evict(&entry))
    }

    /// 回收在 `now` 时刻已过期的会话
    pub fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let ttl = self.settings.ttl;
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|item| item.value().is_expired(now, ttl))
            .map(|item| item.key().clone())
            .collect();

        let mut report = SweepReport::default();
        for id in expired {
            if let Some((_, entry)) = self
                .sessions
                .remove_if(&id, |_, entry| entry.is_expired(now, ttl))
            {
                report.sessions += 1;
                report.records += self.evict(&entry);
            }
        }
        report
    }

    /// 解封记录中的密钥，调用方只能在单次服务商调用期间持有
    pub fn open(&self, record: &CredentialRecord) -> Result<SecretMaterial> {
        self.sealer.open(record.sealed())
    }

    /// 存活会话的概况，不刷新 `last_seen`
    #[must_use]
    pub fn session_info(&self, session: &SessionId) -> Option<SessionInfo> {
        let entry = self.live_entry(session, false)?;
        let credentials = entry.read().records.len();
        Some(SessionInfo {
            created_at: entry.created_at,
            last_seen_at: entry.last_seen(),
            credentials,
        })
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            sessions: self.sessions.len(),
            records: self.record_count.load(Ordering::Acquire),
            max_records: self.settings.max_records,
        }
    }

    fn transition(
        &self,
        session: &SessionId,
        provider: ProviderKind,
        version: u64,
        status: CredentialStatus,
    ) -> bool {
        let Some(entry) = self.live_entry(session, false) else {
            return false;
        };
        let mut state = entry.write();
        match state.records.get_mut(&provider) {
            Some(record) if record.version() == version => {
                *record = Arc::new(record.with_status(status, self.clock.now()));
                tracing::debug!(
                    session = %session.short(),
                    provider = %provider,
                    version,
                    status = %status,
                    "credential status updated"
                );
                true
            }
            _ => false,
        }
    }

    fn reserve_slot(&self) -> Result<()> {
        let max = self.settings.max_records;
        self.record_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count < max).then_some(count + 1)
            })
            .map(drop)
            .map_err(|_| {
                tracing::warn!(max_records = max, "credential store capacity reached");
                GatewayError::ResourceExhausted {
                    message: format!("credential capacity of {max} records reached"),
                }
            })
    }

    /// 返回存活会话，顺带回收已过期的会话
    fn live_entry(&self, session: &SessionId, touch: bool) -> Option<Arc<SessionEntry>> {
        let now = self.clock.now();
        let entry = self.sessions.get(session).map(|e| Arc::clone(e.value()))?;
        if entry.is_expired(now, self.settings.ttl) {
            if let Some((_, expired)) = self
                .sessions
                .remove_if(session, |_, e| e.is_expired(now, self.settings.ttl))
            {
                let records = self.evict(&expired);
                tracing::debug!(session = %session.short(), records, "expired session evicted");
            }
            return None;
        }
        if touch {
            entry.touch(now);
        }
        Some(entry)
    }

    fn entry_or_insert(&self, session: &SessionId) -> Arc<SessionEntry> {
        if let Some(entry) = self.live_entry(session, true) {
            return entry;
        }
        let now = self.clock.now();
        let entry = self
            .sessions
            .entry(session.clone())
            .or_insert_with(|| Arc::new(SessionEntry::new(now)));
        Arc::clone(entry.value())
    }

    fn evict(&self, entry: &SessionEntry) -> usize {
        let mut state = entry.write();
        state.evicted = true;
        let count = state.records.len();
        state.records.clear();
        drop(state);
        self.record_count.fetch_sub(count, Ordering::AcqRel);
        count
    }
}
