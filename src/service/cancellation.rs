//! 取消信号
//!
//! 只在条目之间检查；已发出的设备往返不会被打断。

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{ConnectError, Result};

#[derive(Clone)]
pub struct CancellationToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// 触发取消，可重复调用
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// 已取消时返回 `Cancelled`
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ConnectError::Cancelled);
        }
        Ok(())
    }

    /// 挂起直到被取消
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // 发送端与 token 同生命周期，不会关闭
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
