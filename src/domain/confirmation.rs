//! 确认状态机
//!
//! ```text
//! Pending -> Confirmed  ✅ 用户确认
//! Pending -> Rejected   ✅ 用户拒绝或通道关闭
//! AutoConfirmed         ✅ 快速路径，无需 UI 往返
//!
//! 终态不允许再转换
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConnectError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationState {
    AutoConfirmed,
    Pending,
    Confirmed,
    Rejected,
}

impl ConfirmationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConfirmationState::Pending)
    }

    /// 是否允许访问设备
    pub fn is_granted(&self) -> bool {
        matches!(
            self,
            ConfirmationState::AutoConfirmed | ConfirmationState::Confirmed
        )
    }

    /// 根据 UI 响应转换
    pub fn resolve(self, approved: bool) -> Result<ConfirmationState> {
        match self {
            ConfirmationState::Pending if approved => Ok(ConfirmationState::Confirmed),
            ConfirmationState::Pending => Ok(ConfirmationState::Rejected),
            other => Err(ConnectError::Ui(format!(
                "confirmation already resolved as {:?}",
                other
            ))),
        }
    }
}
