//! 确认闸门
//!
//! 在任何设备交互之前向用户请求许可。一次命令调用最多询问一次；
//! `confirm` 消耗闸门本身。

use crate::{
    domain::confirmation::ConfirmationState,
    error::Result,
    infrastructure::ui_channel::{
        CustomButton, DeviceId, UiChannel, UiMessage, UiRequestKind, UiResponsePayload,
    },
};

/// 默认确认视图
pub const EXPORT_ADDRESS_VIEW: &str = "export-address";
pub const EXPORT_ACCOUNT_INFO_VIEW: &str = "export-account-info";

/// 一次确认请求的展示内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPrompt {
    pub view: String,
    pub label: String,
    pub custom_confirm_button: Option<CustomButton>,
}

impl ConfirmationPrompt {
    pub fn new(view: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            label: label.into(),
            custom_confirm_button: None,
        }
    }

    pub fn with_button(mut self, label: impl Into<String>) -> Self {
        self.custom_confirm_button = Some(CustomButton {
            label: label.into(),
            class_name: None,
        });
        self
    }
}

pub struct ConfirmationGate {
    ui: UiChannel,
    device: DeviceId,
}

impl ConfirmationGate {
    pub fn new(ui: UiChannel, device: DeviceId) -> Self {
        Self { ui, device }
    }

    /// 请求确认
    ///
    /// `auto_confirm` 为 true 时直接返回 `AutoConfirmed`，不发送任何 UI 消息。
    /// 弹窗或 UI 通道在应答前关闭都视为拒绝。
    pub async fn confirm(
        self,
        prompt: ConfirmationPrompt,
        auto_confirm: bool,
    ) -> Result<ConfirmationState> {
        if auto_confirm {
            tracing::debug!(device = %self.device, "Confirmation skipped");
            return Ok(ConfirmationState::AutoConfirmed);
        }

        if let Err(e) = self.ui.wait_popup_ready().await {
            tracing::debug!(device = %self.device, error = %e, "Popup closed before confirmation");
            return ConfirmationState::Pending.resolve(false);
        }

        let waiter = self
            .ui
            .register(UiRequestKind::ReceiveConfirmation, &self.device)?;
        let posted = self.ui.post(UiMessage::RequestConfirmation {
            request_id: waiter.id(),
            device: self.device.clone(),
            view: prompt.view,
            label: prompt.label,
            custom_confirm_button: prompt.custom_confirm_button,
        });
        if let Err(e) = posted {
            tracing::debug!(device = %self.device, error = %e, "UI channel closed before confirmation");
            return ConfirmationState::Pending.resolve(false);
        }

        let approved = match waiter.wait().await {
            Ok(UiResponsePayload::Confirmation(approved)) => approved,
            Ok(other) => {
                tracing::warn!(?other, "Unexpected confirmation payload");
                false
            }
            Err(e) => {
                tracing::debug!(error = %e, "Confirmation channel closed");
                false
            }
        };

        let state = ConfirmationState::Pending.resolve(approved)?;
        tracing::info!(device = %self.device, ?state, "Confirmation resolved");
        Ok(state)
    }
}
