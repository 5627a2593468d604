//! 工作条目构建
//!
//! 把原始调用负载（单条目或 `bundle` 数组）校验并归一化为有序的强类型 bundle：
//! 1. 按方法的固定模式校验字段
//! 2. 解析路径并检查最小深度
//! 3. 解析网络信息（coin 优先，否则由路径推断），校验路径与币种一致
//! 4. 按路径归一化 segwit/legacy 变体
//! 5. 收窄固件范围
//! 6. 计算人类可读的摘要标签
//!
//! 构建过程没有任何设备或 UI 访问。

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    domain::{
        account::{AccountQuery, DetailLevel, Marker, TokenFilter},
        bundle::{AccountItem, AddressItem, Bundle},
        firmware::FirmwareRange,
        network::{NetworkInfo, NetworkRegistry},
        path::{validate_path, DerivationPath},
    },
    error::{ConnectError, Result},
    service::backend::ensure_backend_supported,
    utils::params::{parse_params, split_bundle, ParamSpec, ParamType},
};

/// GetAddress 最小路径深度
pub const ADDRESS_MIN_PATH_DEPTH: usize = 1;
/// GetAccountInfo 最小路径深度
pub const ACCOUNT_MIN_PATH_DEPTH: usize = 3;

const ADDRESS_SCHEMA: &[ParamSpec] = &[
    ParamSpec::required("path", ParamType::Path),
    ParamSpec::optional("address", ParamType::String),
    ParamSpec::optional("coin", ParamType::String),
    ParamSpec::optional("showOnDevice", ParamType::Boolean),
    ParamSpec::optional("crossChain", ParamType::Boolean),
];

const ACCOUNT_SCHEMA: &[ParamSpec] = &[
    ParamSpec::required("coin", ParamType::String),
    ParamSpec::optional("path", ParamType::Path),
    ParamSpec::optional("descriptor", ParamType::String),
    ParamSpec::optional(
        "details",
        ParamType::OneOf(&["basic", "tokens", "tokenBalances", "txids", "txs"]),
    ),
    ParamSpec::optional("tokens", ParamType::OneOf(&["nonzero", "used", "derived"])),
    ParamSpec::optional("page", ParamType::U32),
    ParamSpec::optional("pageSize", ParamType::U32),
    ParamSpec::optional("from", ParamType::Number),
    ParamSpec::optional("to", ParamType::Number),
    ParamSpec::optional("contractFilter", ParamType::String),
    ParamSpec::optional("gap", ParamType::U32),
    ParamSpec::optional("marker", ParamType::Fields(&["ledger", "seq"])),
    ParamSpec::optional("defaultAccountType", ParamType::String),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAddressParams {
    path: Value,
    address: Option<String>,
    coin: Option<String>,
    show_on_device: Option<bool>,
    cross_chain: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAccountParams {
    coin: String,
    path: Option<Value>,
    descriptor: Option<String>,
    details: Option<DetailLevel>,
    tokens: Option<TokenFilter>,
    page: Option<u32>,
    page_size: Option<u32>,
    from: Option<u64>,
    to: Option<u64>,
    contract_filter: Option<String>,
    gap: Option<u32>,
    marker: Option<Marker>,
    default_account_type: Option<String>,
}

/// 构建结果
#[derive(Debug, Clone)]
pub struct BuiltBundle<T> {
    pub bundle: Bundle<T>,
    /// 摘要标签
    pub label: String,
    /// 所有条目固件范围的交集
    pub firmware_range: FirmwareRange,
    /// 调用方请求跳过确认弹窗
    pub use_event_listener: bool,
}

pub struct WorkItemBuilder<'a> {
    registry: &'a NetworkRegistry,
    method_range: FirmwareRange,
}

impl<'a> WorkItemBuilder<'a> {
    pub fn new(registry: &'a NetworkRegistry) -> Self {
        Self {
            registry,
            method_range: FirmwareRange::default(),
        }
    }

    /// 方法自身的固件要求
    pub fn with_method_range(mut self, range: FirmwareRange) -> Self {
        self.method_range = range;
        self
    }

    /// 构建地址导出 bundle
    pub fn build_address_bundle(&self, payload: &Value) -> Result<BuiltBundle<AddressItem>> {
        let raw_items = split_bundle(payload)?;
        let use_event_listener = read_flag(payload, "useEventListener");

        let mut items = Vec::with_capacity(raw_items.len());
        let mut firmware_range = self.method_range;
        for raw in &raw_items {
            let item = self.build_address_item(raw)?;
            firmware_range = firmware_range.narrow(&item.network.support);
            items.push(item);
        }

        let label = address_label(&items);
        Ok(BuiltBundle {
            bundle: Bundle::new(items)?,
            label,
            firmware_range,
            use_event_listener,
        })
    }

    fn build_address_item(&self, raw: &Map<String, Value>) -> Result<AddressItem> {
        let params: RawAddressParams = parse_params(raw, ADDRESS_SCHEMA)?;
        let path = validate_path(&params.path, ADDRESS_MIN_PATH_DEPTH)?;

        let network = match params.coin.as_deref() {
            Some(coin) => {
                let network = self
                    .registry
                    .get_by_coin(coin)
                    .ok_or_else(|| ConnectError::NoNetworkInfo(coin.to_string()))?;
                if !params.cross_chain.unwrap_or(false) {
                    network.validate_path(&path)?;
                }
                network
            }
            None => self
                .registry
                .get_by_path(&path)
                .ok_or_else(|| ConnectError::NoNetworkInfo(path.serialize()))?,
        };

        Ok(AddressItem {
            network: network.with_path_variant(&path),
            path,
            expected_address: params.address,
            show_on_device: params.show_on_device.unwrap_or(true),
        })
    }

    /// 构建账户信息 bundle
    pub fn build_account_bundle(&self, payload: &Value) -> Result<BuiltBundle<AccountItem>> {
        let raw_items = split_bundle(payload)?;

        let mut items = Vec::with_capacity(raw_items.len());
        let mut firmware_range = self.method_range;
        for raw in &raw_items {
            let item = self.build_account_item(raw)?;
            firmware_range = firmware_range.narrow(&item.network.support);
            items.push(item);
        }

        if items.len() > 1 && items.iter().any(AccountItem::needs_discovery) {
            return Err(ConnectError::CrossNetworkDiscoveryUnsupported);
        }

        let label = account_label(&items);
        Ok(BuiltBundle {
            bundle: Bundle::new(items)?,
            label,
            firmware_range,
            use_event_listener: false,
        })
    }

    fn build_account_item(&self, raw: &Map<String, Value>) -> Result<AccountItem> {
        let params: RawAccountParams = parse_params(raw, ACCOUNT_SCHEMA)?;

        let network = self
            .registry
            .get_by_coin(&params.coin)
            .ok_or_else(|| ConnectError::NoNetworkInfo(params.coin.clone()))?;
        ensure_backend_supported(network)?;

        let path: Option<DerivationPath> = match &params.path {
            Some(value) => {
                let path = validate_path(value, ACCOUNT_MIN_PATH_DEPTH)?;
                network.validate_path(&path)?;
                Some(path)
            }
            None => None,
        };

        let network = match &path {
            Some(path) => network.with_path_variant(path),
            None => network.clone(),
        };

        Ok(AccountItem {
            path,
            descriptor: params.descriptor,
            network,
            query: AccountQuery {
                details: params.details,
                tokens: params.tokens,
                page: params.page,
                page_size: params.page_size,
                from: params.from,
                to: params.to,
                contract_filter: params.contract_filter,
                gap: params.gap,
                marker: params.marker,
            },
            default_account_type: params.default_account_type,
        })
    }
}

fn read_flag(payload: &Value, name: &str) -> bool {
    payload
        .get(name)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// 按网络身份去重
fn distinct_networks<'n>(networks: impl Iterator<Item = &'n NetworkInfo>) -> Vec<&'n NetworkInfo> {
    let mut seen = HashSet::new();
    networks.filter(|n| seen.insert(n.id().to_string())).collect()
}

/// 地址导出标签
pub fn address_label(items: &[AddressItem]) -> String {
    let networks = distinct_networks(items.iter().map(|i| &i.network));
    match (items.len(), networks.as_slice()) {
        (1, [network]) => format!("Export {} address", network.label),
        (_, [network]) => format!("Export multiple {} addresses", network.label),
        _ => "Export multiple addresses".to_string(),
    }
}

/// 账户信息标签
pub fn account_label(items: &[AccountItem]) -> String {
    let networks = distinct_networks(items.iter().map(|i| &i.network));
    match (items.len(), networks.as_slice()) {
        (1, [network]) => format!("Export {} account info", network.label),
        (_, [network]) => format!("Export info of multiple {} accounts", network.label),
        _ => "Export info of multiple accounts".to_string(),
    }
}
