//! # 后台任务
//!
//! 定期回收过期会话。过期判断本身是惰性的，清理任务只负责释放内存。

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::store::{CredentialStore, SweepReport};

/// 过期会话清理任务
#[derive(Debug, Clone)]
pub struct SessionSweepTask {
    store: Arc<CredentialStore>,
    interval: Duration,
}

impl SessionSweepTask {
    #[must_use]
    pub const fn new(store: Arc<CredentialStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// 执行一次清理
    pub fn run_once(&self) -> SweepReport {
        let report = self.store.sweep(self.store.now());
        if report.sessions > 0 {
            info!(
                sessions = report.sessions,
                records = report.records,
                "expired sessions swept"
            );
        } else {
            debug!("session sweep found nothing to remove");
        }
        report
    }

    /// 启动清理循环，直到 `shutdown` 被取消
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "starting session sweep task");

            let mut interval = time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // 第一次 tick 立即完成，跳过
            interval.tick().await;

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        self.run_once();
                    }
                }
            }

            info!("session sweep task stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Auxiliary, ProviderKind};
    use crate::session::{ManualClock, SessionId};
    use crate::store::{SecretMaterial, SecretSealer, StoreSettings};

    fn store(clock: Arc<ManualClock>) -> Arc<CredentialStore> {
        Arc::new(CredentialStore::new(
            StoreSettings {
                ttl: chrono::Duration::minutes(10),
                max_records: 16,
            },
            SecretSealer::ephemeral(),
            clock,
        ))
    }

    #[test]
    fn run_once_reports_removed_sessions() {
        let clock = Arc::new(ManualClock::default());
        let store = store(Arc::clone(&clock));
        let session = SessionId::parse("sweep-me").unwrap();
        store
            .set(
                &session,
                ProviderKind::AiResearch,
                &SecretMaterial::from("sk"),
                Auxiliary::new(),
            )
            .unwrap();

        let task = SessionSweepTask::new(Arc::clone(&store), Duration::from_secs(60));
        assert_eq!(task.run_once(), SweepReport::default());

        clock.advance(chrono::Duration::minutes(11));
        assert_eq!(
            task.run_once(),
            SweepReport {
                sessions: 1,
                records: 1
            }
        );
        assert_eq!(store.stats().sessions, 0);
    }

    #[tokio::test]
    async fn spawned_task_sweeps_and_stops() {
        let clock = Arc::new(ManualClock::default());
        let store = store(Arc::clone(&clock));
        store
            .set(
                &SessionId::parse("idle").unwrap(),
                ProviderKind::AiResearch,
                &SecretMaterial::from("sk"),
                Auxiliary::new(),
            )
            .unwrap();
        clock.advance(chrono::Duration::minutes(11));

        let shutdown = CancellationToken::new();
        let handle = SessionSweepTask::new(Arc::clone(&store), Duration::from_millis(10))
            .spawn(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.stats().sessions, 0);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
