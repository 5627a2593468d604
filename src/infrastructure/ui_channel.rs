// UI 通道
// 出站：有序消息队列；入站：按关联 ID 登记的一次性响应等待者

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use uuid::Uuid;

use crate::{
    domain::account::DiscoveredAccount,
    error::{ConnectError, Result},
};

// ============ 消息类型定义 ============

/// 设备身份（设备路径）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 入站响应种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UiRequestKind {
    ReceiveConfirmation,
    ReceiveAccount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomButton {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SelectAccountEvent {
    Start {
        request_id: Uuid,
        coin: String,
        account_types: Vec<String>,
        default_account_type: Option<String>,
    },
    Progress {
        accounts: Vec<DiscoveredAccount>,
    },
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum UiMessage {
    RequestConfirmation {
        request_id: Uuid,
        device: DeviceId,
        view: String,
        label: String,
        custom_confirm_button: Option<CustomButton>,
    },
    BundleProgress {
        progress: usize,
        response: serde_json::Value,
    },
    SelectAccount {
        device: DeviceId,
        event: SelectAccountEvent,
    },
}

impl UiMessage {
    pub fn kind_str(&self) -> &'static str {
        match self {
            UiMessage::RequestConfirmation { .. } => "request-confirmation",
            UiMessage::BundleProgress { .. } => "bundle-progress",
            UiMessage::SelectAccount { .. } => "select-account",
        }
    }
}

/// 出站信封
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiEnvelope {
    pub message_id: Uuid,
    pub posted_at: chrono::DateTime<chrono::Utc>,
    pub message: UiMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum UiResponsePayload {
    Confirmation(bool),
    AccountSelected(usize),
}

/// 入站响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiResponse {
    pub kind: UiRequestKind,
    pub device: DeviceId,
    /// 缺省时按 (kind, device) 匹配唯一等待者
    #[serde(default)]
    pub request_id: Option<Uuid>,
    pub payload: UiResponsePayload,
}

// ============ 通道实现 ============

/// 保留的已完成关联 ID 数量；更早的 ID 再次响应时按"无等待者"报错
const RESOLVED_HISTORY: usize = 256;

struct PendingWaiter {
    kind: UiRequestKind,
    device: DeviceId,
    tx: oneshot::Sender<UiResponsePayload>,
}

struct Inner {
    outbound: mpsc::UnboundedSender<UiEnvelope>,
    pending: Mutex<HashMap<Uuid, PendingWaiter>>,
    resolved: Mutex<VecDeque<Uuid>>,
    popup_ready: watch::Receiver<bool>,
}

impl Inner {
    fn pending(&self) -> MutexGuard<'_, HashMap<Uuid, PendingWaiter>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn resolved(&self) -> MutexGuard<'_, VecDeque<Uuid>> {
        self.resolved.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn remember_resolved(&self, id: Uuid) {
        let mut resolved = self.resolved();
        if resolved.len() == RESOLVED_HISTORY {
            resolved.pop_front();
        }
        resolved.push_back(id);
    }
}

/// 核心侧句柄
#[derive(Clone)]
pub struct UiChannel {
    inner: Arc<Inner>,
}

/// UI 侧句柄：接收消息、报告弹窗就绪、回送响应
pub struct UiHost {
    messages: mpsc::UnboundedReceiver<UiEnvelope>,
    popup: watch::Sender<bool>,
    channel: UiChannel,
}

impl UiChannel {
    pub fn new() -> (UiChannel, UiHost) {
        let (outbound, messages) = mpsc::unbounded_channel();
        let (popup, popup_ready) = watch::channel(false);
        let channel = UiChannel {
            inner: Arc::new(Inner {
                outbound,
                pending: Mutex::new(HashMap::new()),
                resolved: Mutex::new(VecDeque::with_capacity(RESOLVED_HISTORY)),
                popup_ready,
            }),
        };
        let host = UiHost {
            messages,
            popup,
            channel: channel.clone(),
        };
        (channel, host)
    }

    /// 发布消息
    pub fn post(&self, message: UiMessage) -> Result<()> {
        tracing::debug!(kind = message.kind_str(), "Posting UI message");
        let envelope = UiEnvelope {
            message_id: Uuid::new_v4(),
            posted_at: chrono::Utc::now(),
            message,
        };
        self.inner
            .outbound
            .send(envelope)
            .map_err(|_| ConnectError::Ui("UI channel closed".to_string()))
    }

    /// 等待弹窗就绪
    pub async fn wait_popup_ready(&self) -> Result<()> {
        let mut rx = self.inner.popup_ready.clone();
        rx.wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| ConnectError::Ui("popup closed before it became ready".to_string()))
    }

    /// 登记一次性等待者；同一设备同一种类只允许一个未完成的等待者
    pub fn register(&self, kind: UiRequestKind, device: &DeviceId) -> Result<UiWaiter> {
        let mut pending = self.inner.pending();
        if pending
            .values()
            .any(|w| w.kind == kind && &w.device == device)
        {
            tracing::error!(?kind, device = %device, "Duplicate UI waiter");
            return Err(ConnectError::Ui(format!(
                "a {:?} request is already pending for device {}",
                kind, device
            )));
        }

        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        pending.insert(
            id,
            PendingWaiter {
                kind,
                device: device.clone(),
                tx,
            },
        );
        Ok(UiWaiter {
            id,
            rx: Some(rx),
            inner: self.inner.clone(),
        })
    }

    /// 处理入站响应，每个关联 ID 只能完成一次
    pub fn resolve(&self, response: UiResponse) -> Result<()> {
        let mut pending = self.inner.pending();

        let id = match response.request_id {
            Some(id) => {
                if self.inner.resolved().contains(&id) {
                    tracing::error!(request_id = %id, "UI request resolved twice");
                    return Err(ConnectError::Ui(format!(
                        "request {} was already resolved",
                        id
                    )));
                }
                id
            }
            None => pending
                .iter()
                .find(|(_, w)| w.kind == response.kind && w.device == response.device)
                .map(|(id, _)| *id)
                .ok_or_else(|| {
                    ConnectError::Ui(format!(
                        "no pending {:?} request for device {}",
                        response.kind, response.device
                    ))
                })?,
        };

        let waiter = pending.remove(&id).ok_or_else(|| {
            ConnectError::Ui(format!("no pending request with id {}", id))
        })?;
        if waiter.kind != response.kind || waiter.device != response.device {
            // 不匹配则放回，等待正确的响应
            let kind = waiter.kind;
            pending.insert(id, waiter);
            return Err(ConnectError::Ui(format!(
                "response does not match pending {:?} request {}",
                kind, id
            )));
        }
        drop(pending);

        self.inner.remember_resolved(id);
        waiter
            .tx
            .send(response.payload)
            .map_err(|_| ConnectError::Ui(format!("waiter for request {} is gone", id)))
    }

    /// 移除设备的全部等待者，未完成的等待立即失败
    pub fn cancel_device(&self, device: &DeviceId) {
        let mut pending = self.inner.pending();
        let before = pending.len();
        pending.retain(|_, w| &w.device != device);
        let removed = before - pending.len();
        if removed > 0 {
            tracing::debug!(device = %device, removed, "Cancelled pending UI waiters");
        }
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending().len()
    }
}

/// 一次性响应等待者；被丢弃时自动注销
pub struct UiWaiter {
    id: Uuid,
    rx: Option<oneshot::Receiver<UiResponsePayload>>,
    inner: Arc<Inner>,
}

impl UiWaiter {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 挂起直到收到唯一的匹配响应
    pub async fn wait(mut self) -> Result<UiResponsePayload> {
        let rx = self
            .rx
            .take()
            .ok_or_else(|| ConnectError::Ui("waiter already consumed".to_string()))?;
        rx.await
            .map_err(|_| ConnectError::Ui(format!("request {} closed without response", self.id)))
    }
}

impl Drop for UiWaiter {
    fn drop(&mut self) {
        self.inner.pending().remove(&self.id);
    }
}

impl UiHost {
    pub async fn recv(&mut self) -> Option<UiEnvelope> {
        self.messages.recv().await
    }

    pub fn try_recv(&mut self) -> Option<UiEnvelope> {
        self.messages.try_recv().ok()
    }

    pub fn set_popup_ready(&self) {
        // 没有接收者时忽略
        let _ = self.popup.send(true);
    }

    pub fn respond(&self, response: UiResponse) -> Result<()> {
        self.channel.resolve(response)
    }

    pub fn channel(&self) -> &UiChannel {
        &self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> DeviceId {
        DeviceId::new("usb-1")
    }

    #[tokio::test]
    async fn test_waiter_resolves_once() {
        let (channel, host) = UiChannel::new();
        let waiter = channel
            .register(UiRequestKind::ReceiveConfirmation, &device())
            .unwrap();
        let id = waiter.id();

        host.respond(UiResponse {
            kind: UiRequestKind::ReceiveConfirmation,
            device: device(),
            request_id: Some(id),
            payload: UiResponsePayload::Confirmation(true),
        })
        .unwrap();

        assert_eq!(
            waiter.wait().await.unwrap(),
            UiResponsePayload::Confirmation(true)
        );

        // 重复响应必须报错
        let again = host.respond(UiResponse {
            kind: UiRequestKind::ReceiveConfirmation,
            device: device(),
            request_id: Some(id),
            payload: UiResponsePayload::Confirmation(false),
        });
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_waiter_rejected() {
        let (channel, _host) = UiChannel::new();
        let _first = channel
            .register(UiRequestKind::ReceiveConfirmation, &device())
            .unwrap();
        assert!(channel
            .register(UiRequestKind::ReceiveConfirmation, &device())
            .is_err());
        // 不同设备互不影响
        assert!(channel
            .register(UiRequestKind::ReceiveConfirmation, &DeviceId::new("usb-2"))
            .is_ok());
    }

    #[tokio::test]
    async fn test_dropped_waiter_unregisters() {
        let (channel, _host) = UiChannel::new();
        {
            let _waiter = channel
                .register(UiRequestKind::ReceiveAccount, &device())
                .unwrap();
            assert_eq!(channel.pending_count(), 1);
        }
        assert_eq!(channel.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_device_fails_waiter() {
        let (channel, _host) = UiChannel::new();
        let waiter = channel
            .register(UiRequestKind::ReceiveAccount, &device())
            .unwrap();
        channel.cancel_device(&device());
        assert!(waiter.wait().await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_without_pending_request() {
        let (_channel, host) = UiChannel::new();
        let result = host.respond(UiResponse {
            kind: UiRequestKind::ReceiveAccount,
            device: device(),
            request_id: None,
            payload: UiResponsePayload::AccountSelected(0),
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_post_and_popup_ready() {
        let (channel, mut host) = UiChannel::new();
        channel
            .post(UiMessage::BundleProgress {
                progress: 0,
                response: serde_json::json!({ "address": "x" }),
            })
            .unwrap();
        let envelope = host.recv().await.unwrap();
        assert_eq!(envelope.message.kind_str(), "bundle-progress");

        host.set_popup_ready();
        channel.wait_popup_ready().await.unwrap();
    }

    #[tokio::test]
    async fn test_resolved_history_is_bounded() {
        let (channel, host) = UiChannel::new();
        let mut ids = Vec::new();
        for _ in 0..RESOLVED_HISTORY + 10 {
            let waiter = channel
                .register(UiRequestKind::ReceiveConfirmation, &device())
                .unwrap();
            let id = waiter.id();
            host.respond(UiResponse {
                kind: UiRequestKind::ReceiveConfirmation,
                device: device(),
                request_id: Some(id),
                payload: UiResponsePayload::Confirmation(true),
            })
            .unwrap();
            waiter.wait().await.unwrap();
            ids.push(id);
        }
        assert_eq!(channel.inner.resolved().len(), RESOLVED_HISTORY);
        assert_eq!(channel.pending_count(), 0);

        // 已淘汰和仍保留的 ID 重复响应都会报错
        for id in [ids[0], ids[ids.len() - 1]] {
            let again = host.respond(UiResponse {
                kind: UiRequestKind::ReceiveConfirmation,
                device: device(),
                request_id: Some(id),
                payload: UiResponsePayload::Confirmation(false),
            });
            assert!(again.is_err());
        }
    }
}
