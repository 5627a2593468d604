//! 统一错误代码标准
//! 调用方与 UI 通过数字代码区分错误，消息支持中英文

use serde::{Deserialize, Serialize};

use crate::error::ConnectError;

/// 标准错误代码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum ErrorCode {
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 参数/构造期错误（1xxx）
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    /// 参数无效
    InvalidParameter = 1001,
    /// 未知币种
    UnknownCoin = 1002,
    /// 网络没有可用后端
    BackendNotSupported = 1003,
    /// 不支持多币种账户发现
    DiscoveryNotSupported = 1004,

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 运行期错误（2xxx）
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    /// 设备地址与请求地址不一致
    AddressMismatch = 2001,
    /// 账户描述符不存在
    DescriptorNotFound = 2002,
    /// 设备调用失败
    DeviceFailure = 2003,

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 用户交互（3xxx）
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    PermissionsNotGranted = 3001,
    Cancelled = 3002,
    UiProtocol = 3003,

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 外部服务（4xxx）
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    BackendUnavailable = 4001,
    ConfigurationError = 4002,
}

impl ErrorCode {
    pub fn message_en(&self) -> &'static str {
        match self {
            ErrorCode::InvalidParameter => "Invalid parameter",
            ErrorCode::UnknownCoin => "Coin not found",
            ErrorCode::BackendNotSupported => "Backend not supported for this coin",
            ErrorCode::DiscoveryNotSupported => "Discovery for multiple coins is not supported",
            ErrorCode::AddressMismatch => "Address does not match the device",
            ErrorCode::DescriptorNotFound => "Account descriptor not found",
            ErrorCode::DeviceFailure => "Device call failed",
            ErrorCode::PermissionsNotGranted => "Permissions not granted",
            ErrorCode::Cancelled => "Action cancelled",
            ErrorCode::UiProtocol => "UI communication error",
            ErrorCode::BackendUnavailable => "Backend unavailable",
            ErrorCode::ConfigurationError => "Configuration error",
        }
    }

    pub fn message_zh(&self) -> &'static str {
        match self {
            ErrorCode::InvalidParameter => "参数无效",
            ErrorCode::UnknownCoin => "未知币种",
            ErrorCode::BackendNotSupported => "该币种不支持后端查询",
            ErrorCode::DiscoveryNotSupported => "不支持多币种账户发现",
            ErrorCode::AddressMismatch => "地址与设备不一致",
            ErrorCode::DescriptorNotFound => "账户描述符不存在",
            ErrorCode::DeviceFailure => "设备调用失败",
            ErrorCode::PermissionsNotGranted => "用户未授权",
            ErrorCode::Cancelled => "操作已取消",
            ErrorCode::UiProtocol => "界面通信错误",
            ErrorCode::BackendUnavailable => "后端不可用",
            ErrorCode::ConfigurationError => "配置错误",
        }
    }

    pub fn message(&self, lang: &str) -> &'static str {
        match lang {
            "zh" | "zh-CN" | "zh-TW" => self.message_zh(),
            _ => self.message_en(),
        }
    }

    /// 账户发现失败时 UI 可以提示重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::BackendUnavailable | ErrorCode::DeviceFailure
        )
    }
}

/// 发给调用方/UI 的错误信封
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u32,
    pub message: String,
    pub user_message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, details: Option<String>, lang: &str) -> Self {
        Self {
            code: code as u32,
            message: code.message_en().to_string(),
            user_message: code.message(lang).to_string(),
            retryable: code.is_retryable(),
            details,
        }
    }

    pub fn from_error(err: &ConnectError, lang: &str) -> Self {
        Self::new(err.code(), Some(err.to_string()), lang)
    }
}
