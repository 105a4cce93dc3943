//! # 受限的服务商调用
//!
//! 每次出站调用都在独立的 tokio 任务上运行，并受超时预算约束。
//! 调用方放弃等待（超时或请求被取消）时任务随句柄一起中止。

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};

use crate::error::{ProviderError, ProviderResult, Result};

/// 丢弃时中止任务的句柄
#[derive(Debug)]
pub(crate) struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl<T> Future for AbortOnDrop<T> {
    type Output = std::result::Result<T, JoinError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().0).poll(cx)
    }
}

/// 在新任务上执行调用，超过 `budget` 返回 `ProviderError::Timeout`
///
/// 外层错误只表示任务本身失败（panic），不是服务商错误。
pub(crate) async fn run_bounded<T, F>(budget: Duration, call: F) -> Result<ProviderResult<T>>
where
    T: Send + 'static,
    F: Future<Output = ProviderResult<T>> + Send + 'static,
{
    let handle = AbortOnDrop(tokio::spawn(call));
    match tokio::time::timeout(budget, handle).await {
        Ok(joined) => Ok(joined?),
        Err(_) => Ok(Err(ProviderError::Timeout)),
    }
}
