//! 账户发现引擎
//!
//! 状态机：`Idle -> Scanning -> {Completed | Stopped}`
//!
//! 扫描在独立任务中进行，按固定顺序遍历账户类型，逐个索引向设备请求描述符、
//! 向后端查询账户是否为空；连续空账户数达到该类型的 gap limit 后切换到下一类型。
//! 每追加一个账户就通过事件通道发送完整的账户列表。
//!
//! 停止即关闭事件通道，可在任意时刻重复调用。

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    config::DiscoveryConfig,
    domain::{
        account::{AccountInfoRequest, AccountType, DetailLevel, DiscoveredAccount},
        network::NetworkInfo,
    },
    error::{ConnectError, Result},
    infrastructure::ui_channel::{
        SelectAccountEvent, UiChannel, UiMessage, UiRequestKind, UiResponsePayload,
    },
    service::{backend::Backend, cancellation::CancellationToken, device::DeviceCommands},
    utils::redact_descriptor,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStatus {
    Idle,
    Scanning,
    Completed,
    Stopped,
}

impl DiscoveryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DiscoveryStatus::Completed | DiscoveryStatus::Stopped)
    }
}

/// 扫描任务发出的事件
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryEvent {
    /// 目前为止的全部账户
    Progress(Vec<DiscoveredAccount>),
    Completed,
    Failed(ConnectError),
}

struct DiscoveryState {
    status: DiscoveryStatus,
    accounts: Vec<DiscoveredAccount>,
    /// 下一个要扫描的账户类型
    cursor: usize,
    events: Option<mpsc::UnboundedSender<DiscoveryEvent>>,
}

#[derive(Clone)]
struct Shared {
    state: Arc<Mutex<DiscoveryState>>,
    stop: Arc<watch::Sender<bool>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, DiscoveryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    fn emit(&self, event: DiscoveryEvent) {
        if let Some(tx) = &self.lock().events {
            // 接收端已丢弃时忽略
            let _ = tx.send(event);
        }
    }

    /// 进入终态并关闭事件通道
    fn finish(&self, status: DiscoveryStatus) {
        let mut state = self.lock();
        if !state.status.is_terminal() {
            state.status = status;
        }
        state.events = None;
    }
}

pub struct DiscoveryEngine {
    device: Arc<dyn DeviceCommands>,
    backend: Arc<dyn Backend>,
    network: NetworkInfo,
    account_types: Vec<AccountType>,
    page_size: u32,
    shared: Shared,
    task: Option<JoinHandle<()>>,
}

impl DiscoveryEngine {
    pub fn new(
        device: Arc<dyn DeviceCommands>,
        backend: Arc<dyn Backend>,
        network: NetworkInfo,
        config: &DiscoveryConfig,
    ) -> Self {
        let account_types =
            AccountType::for_network(&network, config.gap_limit, config.enable_taproot);
        let (stop, _) = watch::channel(false);
        Self {
            device,
            backend,
            network,
            account_types,
            page_size: config.scan_page_size,
            shared: Shared {
                state: Arc::new(Mutex::new(DiscoveryState {
                    status: DiscoveryStatus::Idle,
                    accounts: Vec::new(),
                    cursor: 0,
                    events: None,
                })),
                stop: Arc::new(stop),
            },
            task: None,
        }
    }

    pub fn network(&self) -> &NetworkInfo {
        &self.network
    }

    pub fn account_types(&self) -> &[AccountType] {
        &self.account_types
    }

    pub fn status(&self) -> DiscoveryStatus {
        self.shared.lock().status
    }

    pub fn is_completed(&self) -> bool {
        self.status() == DiscoveryStatus::Completed
    }

    /// 已发现账户的快照
    pub fn accounts(&self) -> Vec<DiscoveredAccount> {
        self.shared.lock().accounts.clone()
    }

    /// 事件通道是否仍然打开
    pub fn has_listener(&self) -> bool {
        self.shared.lock().events.is_some()
    }

    /// 启动扫描，返回事件接收端；只能从 Idle 启动
    pub fn start(&mut self) -> Result<mpsc::UnboundedReceiver<DiscoveryEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut state = self.shared.lock();
            if state.status != DiscoveryStatus::Idle {
                return Err(ConnectError::Ui(format!(
                    "discovery cannot start from {:?}",
                    state.status
                )));
            }
            state.status = DiscoveryStatus::Scanning;
            state.events = Some(tx);
        }

        tracing::info!(
            coin = %self.network.shortcut,
            account_types = self.account_types.len(),
            "Account discovery started"
        );

        let scan = Scan {
            device: self.device.clone(),
            backend: self.backend.clone(),
            network: self.network.clone(),
            account_types: self.account_types.clone(),
            page_size: self.page_size,
            shared: self.shared.clone(),
        };
        self.task = Some(tokio::spawn(scan.run()));
        Ok(rx)
    }

    /// 停止扫描并关闭事件通道，可重复调用，也可在启动前调用
    pub fn stop(&self) {
        self.shared.stop.send_replace(true);
        let was = self.status();
        self.shared.finish(DiscoveryStatus::Stopped);
        if !was.is_terminal() {
            tracing::debug!(coin = %self.network.shortcut, ?was, "Account discovery stopped");
        }
    }

    /// 等待扫描任务退出（进行中的设备往返会先完成）
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Discovery task panicked");
            }
        }
    }

    /// 面向调用方的选择流程
    ///
    /// 启动扫描并发布 start 消息，随后转发进度，直到用户选择一个账户。
    /// 扫描失败会拒绝等待中的选择。若选择时扫描尚未完成，停止后先等待设备就绪。
    pub async fn select(
        &mut self,
        ui: &UiChannel,
        cancel: &CancellationToken,
        default_account_type: Option<String>,
    ) -> Result<DiscoveredAccount> {
        let device_id = self.device.device_id().clone();
        let waiter = ui.register(UiRequestKind::ReceiveAccount, &device_id)?;
        let mut events = self.start()?;

        let start = UiMessage::SelectAccount {
            device: device_id.clone(),
            event: SelectAccountEvent::Start {
                request_id: waiter.id(),
                coin: self.network.shortcut.clone(),
                account_types: self.account_types.iter().map(|t| t.id.clone()).collect(),
                default_account_type,
            },
        };
        if let Err(e) = ui.post(start) {
            self.stop();
            return Err(e);
        }

        let selection = waiter.wait();
        tokio::pin!(selection);
        let mut listening = true;

        let payload = loop {
            tokio::select! {
                payload = &mut selection => break payload,
                _ = cancel.cancelled() => {
                    self.stop();
                    self.join().await;
                    return Err(ConnectError::Cancelled);
                }
                event = events.recv(), if listening => {
                    let event = match event {
                        Some(DiscoveryEvent::Progress(accounts)) => SelectAccountEvent::Progress { accounts },
                        Some(DiscoveryEvent::Completed) => SelectAccountEvent::End,
                        Some(DiscoveryEvent::Failed(e)) => {
                            tracing::warn!(error = %e, "Account discovery failed");
                            self.stop();
                            return Err(e);
                        }
                        None => {
                            listening = false;
                            continue;
                        }
                    };
                    if let Err(e) = ui.post(UiMessage::SelectAccount {
                        device: device_id.clone(),
                        event,
                    }) {
                        tracing::warn!(error = %e, "Failed to post discovery progress");
                    }
                }
            }
        };

        let completed = self.is_completed();
        self.stop();
        self.join().await;

        let index = match payload? {
            UiResponsePayload::AccountSelected(index) => index,
            other => {
                return Err(ConnectError::Ui(format!(
                    "unexpected selection payload {:?}",
                    other
                )))
            }
        };

        if !completed {
            self.device.wait_until_ready().await?;
        }

        let account = self
            .accounts()
            .get(index)
            .cloned()
            .ok_or_else(|| ConnectError::validation("account", format!("index {} out of range", index)))?;
        tracing::info!(
            coin = %self.network.shortcut,
            index,
            descriptor = %redact_descriptor(&account.descriptor),
            "Account selected"
        );
        Ok(account)
    }
}

impl Drop for DiscoveryEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 扫描任务
struct Scan {
    device: Arc<dyn DeviceCommands>,
    backend: Arc<dyn Backend>,
    network: NetworkInfo,
    account_types: Vec<AccountType>,
    page_size: u32,
    shared: Shared,
}

impl Scan {
    async fn run(self) {
        match self.scan().await {
            Ok(true) => {
                self.shared.emit(DiscoveryEvent::Completed);
                self.shared.finish(DiscoveryStatus::Completed);
                tracing::info!(coin = %self.network.shortcut, "Account discovery completed");
            }
            Ok(false) => self.shared.finish(DiscoveryStatus::Stopped),
            Err(e) => {
                self.shared.emit(DiscoveryEvent::Failed(e));
                self.shared.finish(DiscoveryStatus::Stopped);
            }
        }
    }

    /// 返回 true 表示全部类型扫描完毕，false 表示被停止
    async fn scan(&self) -> Result<bool> {
        for (cursor, account_type) in self.account_types.iter().enumerate() {
            self.shared.lock().cursor = cursor;
            let mut consecutive_empty = 0;
            let mut index = 0;

            while consecutive_empty < account_type.gap_limit {
                if self.shared.is_stopped() {
                    return Ok(false);
                }

                let account = self.scan_account(account_type, index).await?;
                if self.shared.is_stopped() {
                    return Ok(false);
                }

                if account.empty {
                    consecutive_empty += 1;
                } else {
                    consecutive_empty = 0;
                }

                let snapshot = {
                    let mut state = self.shared.lock();
                    state.accounts.push(account);
                    state.accounts.clone()
                };
                self.shared.emit(DiscoveryEvent::Progress(snapshot));
                index += 1;
            }

            tracing::debug!(
                coin = %self.network.shortcut,
                account_type = %account_type.id,
                scanned = index,
                "Account type exhausted"
            );
        }
        self.shared.lock().cursor = self.account_types.len();
        Ok(true)
    }

    async fn scan_account(&self, account_type: &AccountType, index: u32) -> Result<DiscoveredAccount> {
        let path = account_type.path(index);
        let descriptor = self
            .device
            .get_account_descriptor(&self.network, &path)
            .await?
            .ok_or(ConnectError::DescriptorNotFound)?;

        let info = self
            .backend
            .get_account_info(&AccountInfoRequest {
                descriptor: descriptor.descriptor.clone(),
                details: Some(DetailLevel::Basic),
                page_size: Some(self.page_size),
                ..Default::default()
            })
            .await?;

        Ok(DiscoveredAccount {
            account_type: account_type.id.clone(),
            index,
            label: self.network.account_label(&path),
            descriptor: descriptor.descriptor,
            path,
            balance: info.balance,
            empty: info.empty,
        })
    }
}
