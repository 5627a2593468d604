//! 设备命令接口
//!
//! 传输层与设备协议编码不在本 crate 范围内；这里只声明核心需要的命令。
//! 设备是独占资源，同一时刻只允许一个命令在途，调用方负责串行化命令实例。

use async_trait::async_trait;

use crate::{
    domain::{account::AccountDescriptor, network::NetworkInfo, path::DerivationPath},
    error::Result,
    infrastructure::ui_channel::DeviceId,
};

#[async_trait]
pub trait DeviceCommands: Send + Sync {
    /// 设备身份，用于关联 UI 响应
    fn device_id(&self) -> &DeviceId;

    /// 获取地址；`show_on_device` 为 true 时设备会显示并要求确认
    async fn get_address(
        &self,
        path: &DerivationPath,
        network: &NetworkInfo,
        show_on_device: bool,
    ) -> Result<String>;

    /// 获取账户描述符（xpub 或地址），设备无法给出时返回 None
    async fn get_account_descriptor(
        &self,
        network: &NetworkInfo,
        path: &DerivationPath,
    ) -> Result<Option<AccountDescriptor>>;

    /// 等待设备退出忙碌状态
    async fn wait_until_ready(&self) -> Result<()>;
}
