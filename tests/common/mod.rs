//! 测试辅助模块
//! 内存中的设备、后端与 UI 驱动

#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use ironconnect::{
    domain::{
        account::{AccountDescriptor, AccountInfo, AccountInfoRequest, Utxo},
        network::NetworkInfo,
        path::DerivationPath,
    },
    error::{ConnectError, Result},
    infrastructure::ui_channel::{
        DeviceId, SelectAccountEvent, UiHost, UiMessage, UiRequestKind, UiResponse,
        UiResponsePayload,
    },
    service::{backend::Backend, device::DeviceCommands},
};
use uuid::Uuid;

/// 设备调用记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Address { path: String, show: bool },
    Descriptor { path: String },
    WaitUntilReady,
}

pub struct MockDevice {
    id: DeviceId,
    addresses: HashMap<String, String>,
    missing_descriptors: HashSet<String>,
    descriptor_delay: Option<Duration>,
    calls: Mutex<Vec<DeviceCall>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            id: DeviceId::new("usb-1"),
            addresses: HashMap::new(),
            missing_descriptors: HashSet::new(),
            descriptor_delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 指定路径返回的地址；未指定的路径返回 `addr-<path>`
    pub fn with_address(mut self, path: &str, address: &str) -> Self {
        self.addresses.insert(path.to_string(), address.to_string());
        self
    }

    pub fn without_descriptor(mut self, path: &str) -> Self {
        self.missing_descriptors.insert(path.to_string());
        self
    }

    pub fn with_descriptor_delay(mut self, delay: Duration) -> Self {
        self.descriptor_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn address_for(path: &str) -> String {
        format!("addr-{}", path)
    }

    pub fn descriptor_for(network: &str, path: &str) -> String {
        format!("{}:{}", network, path)
    }
}

#[async_trait]
impl DeviceCommands for MockDevice {
    fn device_id(&self) -> &DeviceId {
        &self.id
    }

    async fn get_address(
        &self,
        path: &DerivationPath,
        _network: &NetworkInfo,
        show_on_device: bool,
    ) -> Result<String> {
        let path = path.serialize();
        self.calls.lock().unwrap().push(DeviceCall::Address {
            path: path.clone(),
            show: show_on_device,
        });
        Ok(self
            .addresses
            .get(&path)
            .cloned()
            .unwrap_or_else(|| Self::address_for(&path)))
    }

    async fn get_account_descriptor(
        &self,
        network: &NetworkInfo,
        path: &DerivationPath,
    ) -> Result<Option<AccountDescriptor>> {
        let serialized = path.serialize();
        self.calls.lock().unwrap().push(DeviceCall::Descriptor {
            path: serialized.clone(),
        });
        if let Some(delay) = self.descriptor_delay {
            tokio::time::sleep(delay).await;
        }
        if self.missing_descriptors.contains(&serialized) {
            return Ok(None);
        }
        Ok(Some(AccountDescriptor {
            descriptor: Self::descriptor_for(&network.shortcut, &serialized),
            path: path.clone(),
        }))
    }

    async fn wait_until_ready(&self) -> Result<()> {
        self.calls.lock().unwrap().push(DeviceCall::WaitUntilReady);
        Ok(())
    }
}

pub struct MockBackend {
    used: HashSet<String>,
    failure: Option<ConnectError>,
    requests: Mutex<Vec<AccountInfoRequest>>,
    utxo_requests: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            used: HashSet::new(),
            failure: None,
            requests: Mutex::new(Vec::new()),
            utxo_requests: Mutex::new(Vec::new()),
        }
    }

    /// 标记描述符为非空账户
    pub fn with_used(mut self, descriptor: &str) -> Self {
        self.used.insert(descriptor.to_string());
        self
    }

    pub fn failing(mut self, error: ConnectError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn requests(&self) -> Vec<AccountInfoRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn utxo_requests(&self) -> Vec<String> {
        self.utxo_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn get_account_info(&self, request: &AccountInfoRequest) -> Result<AccountInfo> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }
        let used = self.used.contains(&request.descriptor);
        Ok(AccountInfo {
            descriptor: request.descriptor.clone(),
            balance: if used { "1000".into() } else { "0".into() },
            available_balance: if used { "1000".into() } else { "0".into() },
            empty: !used,
            ..Default::default()
        })
    }

    async fn get_unspent_outputs(&self, descriptor: &str) -> Result<Vec<Utxo>> {
        self.utxo_requests.lock().unwrap().push(descriptor.to_string());
        Ok(vec![Utxo {
            txid: "ab".repeat(32),
            vout: 0,
            amount: "1000".into(),
            block_height: 1,
            address: "utxo-address".into(),
            path: "m/84'/0'/0'/0/0".into(),
            confirmations: 6,
        }])
    }
}

/// 何时回应账户选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectWhen {
    /// 扫描结束后
    OnEnd,
    /// 收到至少 n 个账户的进度后
    AfterAccounts(usize),
}

/// UI 侧脚本
#[derive(Debug, Clone)]
pub struct UiScript {
    pub approve: bool,
    pub selection: Option<(usize, SelectWhen)>,
}

impl UiScript {
    pub fn approve() -> Self {
        Self {
            approve: true,
            selection: None,
        }
    }

    pub fn reject() -> Self {
        Self {
            approve: false,
            selection: None,
        }
    }

    pub fn select(index: usize, when: SelectWhen) -> Self {
        Self {
            approve: true,
            selection: Some((index, when)),
        }
    }
}

/// 与 UI 脚本并发运行 `fut`，返回结果与所有收到的 UI 消息
pub async fn run_with_ui<F, T>(host: &mut UiHost, script: &UiScript, fut: F) -> (T, Vec<UiMessage>)
where
    F: Future<Output = T>,
{
    let mut seen = Vec::new();
    let output = {
        let driver = drive(host, script, &mut seen);
        tokio::pin!(fut);
        tokio::pin!(driver);
        tokio::select! {
            output = &mut fut => output,
            _ = &mut driver => unreachable!("UI driver never finishes"),
        }
    };
    while let Some(envelope) = host.try_recv() {
        seen.push(envelope.message);
    }
    (output, seen)
}

async fn drive(host: &mut UiHost, script: &UiScript, seen: &mut Vec<UiMessage>) {
    host.set_popup_ready();
    let mut selection: Option<(Uuid, DeviceId)> = None;

    while let Some(envelope) = host.recv().await {
        let message = envelope.message;
        seen.push(message.clone());

        match message {
            UiMessage::RequestConfirmation {
                request_id, device, ..
            } => {
                host.respond(UiResponse {
                    kind: UiRequestKind::ReceiveConfirmation,
                    device,
                    request_id: Some(request_id),
                    payload: UiResponsePayload::Confirmation(script.approve),
                })
                .unwrap();
            }
            UiMessage::SelectAccount { device, event } => {
                let Some((index, when)) = script.selection else {
                    continue;
                };
                let ready = match &event {
                    SelectAccountEvent::Start { request_id, .. } => {
                        selection = Some((*request_id, device));
                        false
                    }
                    SelectAccountEvent::Progress { accounts } => {
                        matches!(when, SelectWhen::AfterAccounts(n) if accounts.len() >= n)
                    }
                    SelectAccountEvent::End => when == SelectWhen::OnEnd,
                };
                if ready {
                    if let Some((request_id, device)) = selection.take() {
                        host.respond(UiResponse {
                            kind: UiRequestKind::ReceiveAccount,
                            device,
                            request_id: Some(request_id),
                            payload: UiResponsePayload::AccountSelected(index),
                        })
                        .unwrap();
                    }
                }
            }
            UiMessage::BundleProgress { .. } => {}
        }
    }
    std::future::pending::<()>().await
}
