//! GetAddress：导出一个或多个地址

use async_trait::async_trait;
use serde_json::Value;

use super::{Method, MethodContext};
use crate::{
    domain::{
        bundle::{AddressItem, AddressResult, Bundle, MethodResult},
        firmware::FirmwareRange,
        network::NetworkRegistry,
    },
    error::Result,
    service::{
        confirmation_gate::{ConfirmationPrompt, EXPORT_ADDRESS_VIEW},
        work_item_builder::{BuiltBundle, WorkItemBuilder},
    },
};

pub struct GetAddress {
    context: MethodContext,
    built: BuiltBundle<AddressItem>,
}

impl GetAddress {
    /// 校验负载；失败时不会触碰设备或 UI
    pub fn new(context: MethodContext, registry: &NetworkRegistry, payload: &Value) -> Result<Self> {
        let built = WorkItemBuilder::new(registry).build_address_bundle(payload)?;
        tracing::debug!(
            items = built.bundle.len(),
            label = %built.label,
            "GetAddress prepared"
        );
        Ok(Self { context, built })
    }

    pub fn bundle(&self) -> &Bundle<AddressItem> {
        &self.built.bundle
    }

    pub fn label(&self) -> &str {
        &self.built.label
    }

    /// 单个条目、已知目标地址且要求设备显示：设备自身的确认已足够
    fn is_fast_path(&self) -> bool {
        let bundle = &self.built.bundle;
        bundle.is_single() && {
            let item = bundle.first();
            item.expected_address.is_some() && item.show_on_device
        }
    }

    /// 调用方自行监听设备事件，不需要确认弹窗
    pub fn uses_event_listener(&self) -> bool {
        self.built.use_event_listener && self.is_fast_path()
    }
}

#[async_trait]
impl Method for GetAddress {
    type Output = AddressResult;

    fn name(&self) -> &'static str {
        "getAddress"
    }

    fn context(&self) -> &MethodContext {
        &self.context
    }

    fn firmware_range(&self) -> &FirmwareRange {
        &self.built.firmware_range
    }

    fn confirmation_prompt(&self) -> ConfirmationPrompt {
        ConfirmationPrompt::new(EXPORT_ADDRESS_VIEW, self.built.label.clone())
    }

    fn auto_confirm(&self) -> bool {
        if self.uses_event_listener() {
            tracing::debug!("Event listener mode, no popup");
        }
        self.is_fast_path()
    }

    async fn run(&self) -> Result<MethodResult<AddressResult>> {
        self.context
            .execution_loop()
            .run_addresses(&self.built.bundle)
            .await
    }
}
