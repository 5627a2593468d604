//! 命令对象
//!
//! 每个面向用户的操作是一个有状态的命令：构造时校验输入，
//! `execute` 依次驱动确认、执行与释放。

pub mod get_account_info;
pub mod get_address;

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    domain::{bundle::MethodResult, confirmation::ConfirmationState, firmware::FirmwareRange},
    error::{ConnectError, Result},
    infrastructure::ui_channel::UiChannel,
    service::{
        cancellation::CancellationToken,
        confirmation_gate::{ConfirmationGate, ConfirmationPrompt},
        device::DeviceCommands,
        execution::ExecutionLoop,
    },
};

pub use get_account_info::GetAccountInfo;
pub use get_address::GetAddress;

/// 命令共享的协作方与运行状态
pub struct MethodContext {
    device: Arc<dyn DeviceCommands>,
    ui: UiChannel,
    cancel: CancellationToken,
    progress: Arc<AtomicUsize>,
    gate_taken: AtomicBool,
}

impl MethodContext {
    pub fn new(device: Arc<dyn DeviceCommands>, ui: UiChannel) -> Self {
        Self {
            device,
            ui,
            cancel: CancellationToken::new(),
            progress: Arc::new(AtomicUsize::new(0)),
            gate_taken: AtomicBool::new(false),
        }
    }

    pub fn device(&self) -> &Arc<dyn DeviceCommands> {
        &self.device
    }

    pub fn ui(&self) -> &UiChannel {
        &self.ui
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn progress(&self) -> usize {
        self.progress.load(Ordering::SeqCst)
    }

    /// 确认闸门，每个命令实例只能取一次
    pub fn take_gate(&self) -> Result<ConfirmationGate> {
        if self.gate_taken.swap(true, Ordering::SeqCst) {
            return Err(ConnectError::Ui(
                "confirmation already requested for this command".to_string(),
            ));
        }
        Ok(ConfirmationGate::new(
            self.ui.clone(),
            self.device.device_id().clone(),
        ))
    }

    /// 绑定本命令取消信号与进度计数的执行循环
    pub fn execution_loop(&self) -> ExecutionLoop {
        ExecutionLoop::new(self.device.clone(), self.ui.clone())
            .with_cancellation(self.cancel.clone())
            .with_progress(self.progress.clone())
    }

    /// 取消剩余条目与未完成的 UI 等待
    pub fn dispose(&self) {
        self.cancel.cancel();
        self.ui.cancel_device(self.device.device_id());
    }
}

#[async_trait]
pub trait Method: Send + Sync {
    type Output: Serialize + Send;

    fn name(&self) -> &'static str;

    fn context(&self) -> &MethodContext;

    /// 所有条目固件要求的交集
    fn firmware_range(&self) -> &FirmwareRange;

    /// 确认弹窗内容
    fn confirmation_prompt(&self) -> ConfirmationPrompt;

    /// 是否可以跳过确认
    fn auto_confirm(&self) -> bool {
        false
    }

    async fn run(&self) -> Result<MethodResult<Self::Output>>;

    /// 已完成的条目数
    fn progress(&self) -> usize {
        self.context().progress()
    }

    fn dispose(&self) {
        self.context().dispose();
    }
}

/// 确认（拒绝即 `PermissionsNotGranted`）后执行，任何退出路径都会释放命令
pub async fn execute<M: Method>(method: &M) -> Result<MethodResult<M::Output>> {
    let result = confirm_and_run(method).await;
    method.dispose();
    if let Err(e) = &result {
        tracing::warn!(method = method.name(), error = %e, "Method failed");
    }
    result
}

async fn confirm_and_run<M: Method>(method: &M) -> Result<MethodResult<M::Output>> {
    let gate = method.context().take_gate()?;
    let state = gate
        .confirm(method.confirmation_prompt(), method.auto_confirm())
        .await?;
    if !state.is_granted() {
        return Err(ConnectError::PermissionsNotGranted);
    }
    if state == ConfirmationState::AutoConfirmed {
        tracing::debug!(method = method.name(), "Confirmation bypassed");
    }

    tracing::info!(method = method.name(), "Method started");
    let result = method.run().await?;
    tracing::info!(
        method = method.name(),
        results = result.len(),
        "Method finished"
    );
    Ok(result)
}
