//! 账户模型
//!
//! 后端查询请求/响应、UTXO 集合以及账户发现使用的账户类型。

use serde::{Deserialize, Serialize};

use crate::domain::{
    network::{NetworkInfo, NetworkKind},
    path::{to_hardened, DerivationPath},
};

/// 设备返回的账户描述符
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDescriptor {
    /// 地址或扩展公钥
    pub descriptor: String,
    pub path: DerivationPath,
}

/// 账户信息详细程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DetailLevel {
    Basic,
    Tokens,
    TokenBalances,
    Txids,
    Txs,
}

impl Default for DetailLevel {
    fn default() -> Self {
        DetailLevel::Basic
    }
}

/// 代币过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenFilter {
    Nonzero,
    Used,
    Derived,
}

/// 分页游标（XRP Ledger）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub ledger: u64,
    pub seq: u64,
}

/// 发往后端的账户查询
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfoRequest {
    pub descriptor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<DetailLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
}

/// 查询参数（不含描述符），由方法参数携带
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountQuery {
    pub details: Option<DetailLevel>,
    pub tokens: Option<TokenFilter>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub from: Option<u64>,
    pub to: Option<u64>,
    pub contract_filter: Option<String>,
    pub gap: Option<u32>,
    pub marker: Option<Marker>,
}

impl AccountQuery {
    pub fn request_for(&self, descriptor: &str) -> AccountInfoRequest {
        AccountInfoRequest {
            descriptor: descriptor.to_string(),
            details: self.details,
            tokens: self.tokens,
            page: self.page,
            page_size: self.page_size,
            from: self.from,
            to: self.to,
            contract_filter: self.contract_filter.clone(),
            gap: self.gap,
            marker: self.marker.clone(),
        }
    }

    /// UTXO 网络在详细程度超过 basic 时需要额外查询 UTXO 集合
    pub fn wants_utxo(&self, network: &NetworkInfo) -> bool {
        network.is_utxo_based() && self.details.map_or(false, |d| d > DetailLevel::Basic)
    }
}

/// 交易历史摘要
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountHistory {
    pub total: u64,
    pub unconfirmed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<serde_json::Value>>,
}

/// 分页信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paging {
    pub index: u32,
    pub size: u32,
    pub total: u32,
}

/// 后端返回的账户信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub descriptor: String,
    /// 最小单位余额（字符串避免精度损失）
    pub balance: String,
    pub available_balance: String,
    pub empty: bool,
    pub history: AccountHistory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<Paging>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<serde_json::Value>>,
}

/// 未花费输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub amount: String,
    pub block_height: u64,
    pub address: String,
    pub path: String,
    pub confirmations: u64,
}

/// 返回给调用方的账户结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfoResult {
    /// 规范序列化路径
    pub path: Option<String>,
    #[serde(flatten)]
    pub info: AccountInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utxo: Option<Vec<Utxo>>,
}

/// 账户发现的扫描策略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountType {
    /// 标识 ("p2tr", "p2wpkh", "p2sh", "p2pkh", "normal")
    pub id: String,
    pub purpose: u32,
    pub coin_type: u32,
    /// 连续空账户上限
    pub gap_limit: u32,
    account_based: bool,
}

impl AccountType {
    /// 第 `index` 个账户的路径
    pub fn path(&self, index: u32) -> DerivationPath {
        if self.account_based {
            DerivationPath::new(vec![
                to_hardened(self.purpose),
                to_hardened(self.coin_type),
                to_hardened(index),
                0,
                0,
            ])
        } else {
            DerivationPath::new(vec![
                to_hardened(self.purpose),
                to_hardened(self.coin_type),
                to_hardened(index),
            ])
        }
    }

    /// 网络对应的扫描策略，顺序固定
    pub fn for_network(network: &NetworkInfo, gap_limit: u32, enable_taproot: bool) -> Vec<AccountType> {
        let make = |id: &str, purpose: u32, account_based: bool| AccountType {
            id: id.to_string(),
            purpose,
            coin_type: network.slip44,
            gap_limit,
            account_based,
        };

        match network.kind {
            NetworkKind::Bitcoin => {
                let mut types = Vec::new();
                if enable_taproot && network.taproot {
                    types.push(make("p2tr", 86, false));
                }
                if network.segwit {
                    types.push(make("p2wpkh", 84, false));
                    types.push(make("p2sh", 49, false));
                }
                types.push(make("p2pkh", 44, false));
                types
            }
            NetworkKind::Ethereum | NetworkKind::Ripple => vec![make("normal", 44, true)],
        }
    }
}

/// 发现的账户摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredAccount {
    pub account_type: String,
    pub index: u32,
    pub label: String,
    pub descriptor: String,
    pub path: DerivationPath,
    pub balance: String,
    pub empty: bool,
}
