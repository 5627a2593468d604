//! 错误类型
//!
//! 构造期错误（参数/网络解析）在任何 UI 消息或设备调用之前抛出；
//! 运行期错误中止整个 bundle，不存在部分成功的结果形态。

use thiserror::Error;

use crate::utils::error_codes::ErrorCode;

pub type Result<T> = std::result::Result<T, ConnectError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConnectError {
    /// 参数缺失或格式错误
    #[error("Parameter \"{field}\" {message}")]
    Validation { field: String, message: String },

    /// coin / path 无法解析出网络信息
    #[error("Coin not found: {0}")]
    NoNetworkInfo(String),

    /// 网络没有配置远程后端
    #[error("Backend not supported for {0}")]
    UnsupportedBackend(String),

    #[error("Account discovery for multiple coins is not supported")]
    CrossNetworkDiscoveryUnsupported,

    /// 设备返回的地址与调用方声明的地址不一致（安全检查）
    #[error("Address mismatch: expected {expected}, device returned {actual}")]
    AddressMismatch { expected: String, actual: String },

    #[error("Account descriptor not found")]
    DescriptorNotFound,

    /// 用户拒绝确认
    #[error("Permissions not granted")]
    PermissionsNotGranted,

    #[error("Action cancelled")]
    Cancelled,

    #[error("Device error: {0}")]
    Device(String),

    #[error("Backend error: {0}")]
    Backend(String),

    /// UI 通道协议错误：重复等待者、重复响应、通道关闭
    #[error("UI channel error: {0}")]
    Ui(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConnectError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// 对应的标准错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            ConnectError::Validation { .. } => ErrorCode::InvalidParameter,
            ConnectError::NoNetworkInfo(_) => ErrorCode::UnknownCoin,
            ConnectError::UnsupportedBackend(_) => ErrorCode::BackendNotSupported,
            ConnectError::CrossNetworkDiscoveryUnsupported => ErrorCode::DiscoveryNotSupported,
            ConnectError::AddressMismatch { .. } => ErrorCode::AddressMismatch,
            ConnectError::DescriptorNotFound => ErrorCode::DescriptorNotFound,
            ConnectError::PermissionsNotGranted => ErrorCode::PermissionsNotGranted,
            ConnectError::Cancelled => ErrorCode::Cancelled,
            ConnectError::Device(_) => ErrorCode::DeviceFailure,
            ConnectError::Backend(_) => ErrorCode::BackendUnavailable,
            ConnectError::Ui(_) => ErrorCode::UiProtocol,
            ConnectError::Config(_) => ErrorCode::ConfigurationError,
        }
    }

    /// 是否为构造期错误（不会产生任何副作用）
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            ConnectError::Validation { .. }
                | ConnectError::NoNetworkInfo(_)
                | ConnectError::UnsupportedBackend(_)
                | ConnectError::CrossNetworkDiscoveryUnsupported
        )
    }
}

impl From<anyhow::Error> for ConnectError {
    fn from(err: anyhow::Error) -> Self {
        ConnectError::Config(err.to_string())
    }
}
