//! GetAccountInfo：查询账户信息，未给出目标时进入账户发现

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{Method, MethodContext};
use crate::{
    config::DiscoveryConfig,
    domain::{
        account::AccountInfoResult,
        bundle::{AccountItem, Bundle, MethodResult},
        firmware::FirmwareRange,
        network::NetworkRegistry,
    },
    error::Result,
    service::{
        backend::BackendProvider,
        confirmation_gate::{ConfirmationPrompt, EXPORT_ACCOUNT_INFO_VIEW},
        work_item_builder::{BuiltBundle, WorkItemBuilder},
    },
};

pub struct GetAccountInfo {
    context: MethodContext,
    built: BuiltBundle<AccountItem>,
    backends: Arc<dyn BackendProvider>,
    discovery: DiscoveryConfig,
}

impl GetAccountInfo {
    pub fn new(
        context: MethodContext,
        registry: &NetworkRegistry,
        backends: Arc<dyn BackendProvider>,
        payload: &Value,
    ) -> Result<Self> {
        let built = WorkItemBuilder::new(registry).build_account_bundle(payload)?;
        tracing::debug!(
            items = built.bundle.len(),
            label = %built.label,
            "GetAccountInfo prepared"
        );
        Ok(Self {
            context,
            built,
            backends,
            discovery: DiscoveryConfig::default(),
        })
    }

    pub fn with_discovery_config(mut self, config: DiscoveryConfig) -> Self {
        self.discovery = config;
        self
    }

    pub fn bundle(&self) -> &Bundle<AccountItem> {
        &self.built.bundle
    }

    pub fn label(&self) -> &str {
        &self.built.label
    }

    fn needs_discovery(&self) -> bool {
        self.built.bundle.is_single() && self.built.bundle.first().needs_discovery()
    }
}

/// 按网络分组的账户摘要，例如 `Export info for: Bitcoin legacy account #1, Ethereum 0xabc`
pub fn account_summary(bundle: &Bundle<AccountItem>) -> String {
    let mut groups: Vec<(&str, Vec<String>)> = Vec::new();
    for item in bundle {
        let value = match (&item.descriptor, &item.path) {
            (Some(descriptor), _) => descriptor.clone(),
            (None, Some(path)) => item.network.account_label(path),
            (None, None) => continue,
        };
        match groups.iter_mut().find(|(label, _)| *label == item.network.label) {
            Some((_, values)) => values.push(value),
            None => groups.push((item.network.label.as_str(), vec![value])),
        }
    }

    let body = groups
        .iter()
        .map(|(label, values)| format!("{} {}", label, values.join(", ")))
        .collect::<Vec<_>>()
        .join(", ");
    let separator = if bundle.is_single() { " " } else { ": " };
    format!("Export info for{}{}", separator, body)
}

#[async_trait]
impl Method for GetAccountInfo {
    type Output = AccountInfoResult;

    fn name(&self) -> &'static str {
        "getAccountInfo"
    }

    fn context(&self) -> &MethodContext {
        &self.context
    }

    fn firmware_range(&self) -> &FirmwareRange {
        &self.built.firmware_range
    }

    fn confirmation_prompt(&self) -> ConfirmationPrompt {
        if self.needs_discovery() {
            let network = &self.built.bundle.first().network;
            return ConfirmationPrompt::new(
                EXPORT_ACCOUNT_INFO_VIEW,
                format!("Export info for {} account of your selection", network.label),
            )
            .with_button("Proceed to account selection");
        }
        ConfirmationPrompt::new(EXPORT_ACCOUNT_INFO_VIEW, account_summary(&self.built.bundle))
    }

    async fn run(&self) -> Result<MethodResult<AccountInfoResult>> {
        self.context
            .execution_loop()
            .run_accounts(&self.built.bundle, self.backends.as_ref(), &self.discovery)
            .await
    }
}
