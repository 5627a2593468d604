//! 执行循环
//!
//! 严格按输入顺序逐条处理 bundle，设备同一时刻只有一个命令在途。
//! 任一条目失败即中止整个 bundle；已发出的进度消息保留，但不返回结果。

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use serde::Serialize;

use crate::{
    config::DiscoveryConfig,
    domain::{
        account::AccountInfoResult,
        bundle::{AccountItem, AddressItem, AddressResult, Bundle, MethodResult},
    },
    error::{ConnectError, Result},
    infrastructure::ui_channel::{UiChannel, UiMessage},
    service::{
        backend::{fetch_account_info, Backend, BackendProvider},
        cancellation::CancellationToken,
        device::DeviceCommands,
        discovery::DiscoveryEngine,
    },
    utils::redact_address,
};

pub struct ExecutionLoop {
    device: Arc<dyn DeviceCommands>,
    ui: UiChannel,
    cancel: CancellationToken,
    progress: Arc<AtomicUsize>,
}

impl ExecutionLoop {
    pub fn new(device: Arc<dyn DeviceCommands>, ui: UiChannel) -> Self {
        Self {
            device,
            ui,
            cancel: CancellationToken::new(),
            progress: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 共享进度计数器（设备按键请求等外部上下文读取）
    pub fn with_progress(mut self, progress: Arc<AtomicUsize>) -> Self {
        self.progress = progress;
        self
    }

    /// 已完成的条目数，只增不减
    pub fn progress(&self) -> usize {
        self.progress.load(Ordering::SeqCst)
    }

    /// 地址导出
    pub async fn run_addresses(
        &self,
        bundle: &Bundle<AddressItem>,
    ) -> Result<MethodResult<AddressResult>> {
        let mut results = Vec::with_capacity(bundle.len());

        for (index, item) in bundle.iter().enumerate() {
            self.cancel.check()?;

            let address = self.resolve_address(item).await?;
            tracing::info!(
                index,
                coin = %item.network.shortcut,
                path = %item.path,
                address = %redact_address(&address),
                "Address exported"
            );

            let result = AddressResult::new(item.path.clone(), address);
            self.advance(bundle, index, &result);
            results.push(result);
        }

        MethodResult::from_results(results)
    }

    async fn resolve_address(&self, item: &AddressItem) -> Result<String> {
        // 调用方声明了地址时，显示前先静默查询比对
        if let (true, Some(expected)) = (item.show_on_device, &item.expected_address) {
            let silent = self
                .device
                .get_address(&item.path, &item.network, false)
                .await?;
            if expected != &silent {
                tracing::warn!(
                    path = %item.path,
                    expected = %redact_address(expected),
                    actual = %redact_address(&silent),
                    "Address mismatch"
                );
                return Err(ConnectError::AddressMismatch {
                    expected: expected.clone(),
                    actual: silent,
                });
            }
        }

        self.device
            .get_address(&item.path, &item.network, item.show_on_device)
            .await
    }

    /// 账户信息；单条目且无目标时转入账户发现
    pub async fn run_accounts(
        &self,
        bundle: &Bundle<AccountItem>,
        backends: &dyn BackendProvider,
        discovery: &DiscoveryConfig,
    ) -> Result<MethodResult<AccountInfoResult>> {
        let mut results = Vec::with_capacity(bundle.len());

        for (index, item) in bundle.iter().enumerate() {
            self.cancel.check()?;

            let backend = backends
                .backend_for(&item.network)
                .ok_or_else(|| ConnectError::UnsupportedBackend(item.network.label.clone()))?;

            let result = if item.needs_discovery() {
                if !bundle.is_single() {
                    return Err(ConnectError::CrossNetworkDiscoveryUnsupported);
                }
                self.discover(item, backend, discovery).await?
            } else {
                self.account_info(item, backend.as_ref()).await?
            };

            tracing::info!(
                index,
                coin = %item.network.shortcut,
                empty = result.info.empty,
                "Account info fetched"
            );
            self.advance(bundle, index, &result);
            results.push(result);
        }

        MethodResult::from_results(results)
    }

    async fn account_info(&self, item: &AccountItem, backend: &dyn Backend) -> Result<AccountInfoResult> {
        let descriptor = match (&item.descriptor, &item.path) {
            (Some(descriptor), _) => Some(descriptor.clone()),
            (None, Some(path)) => self
                .device
                .get_account_descriptor(&item.network, path)
                .await?
                .map(|d| d.descriptor),
            (None, None) => None,
        };
        let descriptor = descriptor.ok_or(ConnectError::DescriptorNotFound)?;

        fetch_account_info(
            backend,
            &item.network,
            &item.query,
            &descriptor,
            item.path.as_ref(),
        )
        .await
    }

    async fn discover(
        &self,
        item: &AccountItem,
        backend: Arc<dyn Backend>,
        config: &DiscoveryConfig,
    ) -> Result<AccountInfoResult> {
        let mut engine = DiscoveryEngine::new(
            self.device.clone(),
            backend.clone(),
            item.network.clone(),
            config,
        );
        let account = engine
            .select(&self.ui, &self.cancel, item.default_account_type.clone())
            .await?;

        fetch_account_info(
            backend.as_ref(),
            &item.network,
            &item.query,
            &account.descriptor,
            Some(&account.path),
        )
        .await
    }

    /// 推进进度计数；多条目时逐条发布进度消息
    fn advance<T, R: Serialize>(&self, bundle: &Bundle<T>, index: usize, result: &R) {
        self.progress.fetch_add(1, Ordering::SeqCst);
        if bundle.is_single() {
            return;
        }

        let response = match serde_json::to_value(result) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(index, error = %e, "Failed to encode bundle progress");
                return;
            }
        };
        if let Err(e) = self.ui.post(UiMessage::BundleProgress {
            progress: index,
            response,
        }) {
            tracing::warn!(index, error = %e, "Failed to post bundle progress");
        }
    }
}
