//! IronConnect - 硬件钱包主机端命令执行核心
//!
//! 输入校验与 bundle 化、确认闸门、顺序执行循环、账户发现。
//! 设备传输、后端查询与 UI 渲染均作为外部协作方接入。

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod method;
pub mod service;
pub mod utils;

pub use error::{ConnectError, Result};

pub mod prelude {
    pub use crate::{
        config::{Config, DiscoveryConfig},
        domain::{
            AccountInfoResult, AddressResult, ConfirmationState, DerivationPath, MethodResult,
            NetworkRegistry,
        },
        error::{ConnectError, Result},
        infrastructure::{DeviceId, UiChannel, UiHost, UiMessage, UiResponse},
        method::{execute, GetAccountInfo, GetAddress, Method, MethodContext},
        service::{Backend, BackendProvider, CancellationToken, DeviceCommands, SharedBackend},
    };
}
