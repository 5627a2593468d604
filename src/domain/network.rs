//! 网络（币种）元数据
//!
//! 注册表支持通过币种标识（shortcut、名称、别名）或派生路径查找网络，
//! 并负责路径与币种的一致性校验、segwit 变体归一化以及账户标签。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        firmware::{FirmwareRange, FirmwareVersion, VersionRange},
        path::{from_hardened, to_hardened, DerivationPath},
    },
    error::{ConnectError, Result},
};

/// 网络类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    /// UTXO 模型 (Bitcoin, Litecoin, Dogecoin ...)
    Bitcoin,
    /// 账户模型 EVM
    Ethereum,
    /// 账户模型 XRP Ledger
    Ripple,
}

/// 地址变体，由路径的 purpose 决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressVariant {
    /// BIP44 (xpub)
    Legacy,
    /// BIP49 (ypub)
    P2shSegwit,
    /// BIP84 (zpub)
    NativeSegwit,
    /// BIP86
    Taproot,
    /// 账户模型网络
    Account,
}

/// 远程后端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockchainLink {
    /// 后端类型 ("blockbook", "ripple")
    pub backend: String,
    pub urls: Vec<String>,
}

/// 网络描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// 规范短名（小写，作为网络身份）
    pub shortcut: String,
    pub name: String,
    /// 面向用户的标签
    pub label: String,
    pub kind: NetworkKind,
    /// SLIP-44 coin type
    pub slip44: u32,
    pub segwit: bool,
    pub taproot: bool,
    /// EIP-155 chain id
    pub chain_id: Option<u64>,
    pub blockchain_link: Option<BlockchainLink>,
    pub support: FirmwareRange,
    pub variant: AddressVariant,
    #[serde(skip)]
    aliases: Vec<&'static str>,
}

impl NetworkInfo {
    /// 网络身份（用于去重）
    pub fn id(&self) -> &str {
        &self.shortcut
    }

    pub fn is_utxo_based(&self) -> bool {
        self.kind == NetworkKind::Bitcoin
    }

    /// 校验路径与网络是否匹配
    pub fn validate_path(&self, path: &DerivationPath) -> Result<()> {
        let mismatch =
            || ConnectError::validation("path", "and \"coin\" do not match");

        let components = path.components();
        if components.len() < 2 || components[1] != to_hardened(self.slip44) {
            return Err(mismatch());
        }

        if self.kind == NetworkKind::Bitcoin {
            let purpose = components[0];
            if !self.segwit && (purpose == to_hardened(49) || purpose == to_hardened(84)) {
                return Err(mismatch());
            }
            if !self.taproot && purpose == to_hardened(86) {
                return Err(mismatch());
            }
        }
        Ok(())
    }

    /// 按路径归一化地址变体，返回新的网络描述
    pub fn with_path_variant(&self, path: &DerivationPath) -> NetworkInfo {
        let mut network = self.clone();
        network.variant = match self.kind {
            NetworkKind::Bitcoin => match path.purpose().map(from_hardened) {
                Some(84) if self.segwit => AddressVariant::NativeSegwit,
                Some(49) if self.segwit => AddressVariant::P2shSegwit,
                Some(86) if self.taproot => AddressVariant::Taproot,
                _ => AddressVariant::Legacy,
            },
            NetworkKind::Ethereum | NetworkKind::Ripple => AddressVariant::Account,
        };
        network
    }

    /// 账户标签，例如 `legacy account #1`
    pub fn account_label(&self, path: &DerivationPath) -> String {
        let number = path.account().map(|a| a + 1).unwrap_or(1);
        if self.kind != NetworkKind::Bitcoin {
            return format!("account #{}", number);
        }
        let prefix = match path.purpose().map(from_hardened) {
            Some(48) => "multisig ",
            Some(49) if self.segwit => "segwit ",
            Some(44) if self.segwit => "legacy ",
            Some(86) => "taproot ",
            _ => "",
        };
        format!("{}account #{}", prefix, number)
    }
}

/// 网络注册表
pub struct NetworkRegistry {
    networks: Vec<NetworkInfo>,
    index: HashMap<String, usize>,
}

impl NetworkRegistry {
    /// 创建预配置的注册表
    pub fn new() -> Self {
        let mut registry = Self {
            networks: Vec::new(),
            index: HashMap::new(),
        };
        registry.register_default_networks();
        registry
    }

    fn register_default_networks(&mut self) {
        let blockbook = |urls: &[&str]| {
            Some(BlockchainLink {
                backend: "blockbook".to_string(),
                urls: urls.iter().map(|u| u.to_string()).collect(),
            })
        };
        let since = |one: (u32, u32, u32), t: (u32, u32, u32)| {
            FirmwareRange::new(
                VersionRange::since(FirmwareVersion::new(one.0, one.1, one.2)),
                VersionRange::since(FirmwareVersion::new(t.0, t.1, t.2)),
            )
        };

        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        // UTXO 网络
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

        self.register(NetworkInfo {
            shortcut: "btc".to_string(),
            name: "Bitcoin".to_string(),
            label: "Bitcoin".to_string(),
            kind: NetworkKind::Bitcoin,
            slip44: 0,
            segwit: true,
            taproot: true,
            chain_id: None,
            blockchain_link: blockbook(&["https://btc1.trezor.io", "https://btc2.trezor.io"]),
            support: since((1, 6, 2), (2, 0, 5)),
            variant: AddressVariant::Legacy,
            aliases: vec!["bitcoin"],
        });

        self.register(NetworkInfo {
            shortcut: "test".to_string(),
            name: "Testnet".to_string(),
            label: "Bitcoin Testnet".to_string(),
            kind: NetworkKind::Bitcoin,
            slip44: 1,
            segwit: true,
            taproot: true,
            chain_id: None,
            blockchain_link: blockbook(&["https://tbtc1.trezor.io"]),
            support: since((1, 6, 2), (2, 0, 5)),
            variant: AddressVariant::Legacy,
            aliases: vec!["testnet", "tbtc"],
        });

        self.register(NetworkInfo {
            shortcut: "ltc".to_string(),
            name: "Litecoin".to_string(),
            label: "Litecoin".to_string(),
            kind: NetworkKind::Bitcoin,
            slip44: 2,
            segwit: true,
            taproot: false,
            chain_id: None,
            blockchain_link: blockbook(&["https://ltc1.trezor.io"]),
            support: since((1, 6, 2), (2, 0, 5)),
            variant: AddressVariant::Legacy,
            aliases: vec!["litecoin"],
        });

        self.register(NetworkInfo {
            shortcut: "doge".to_string(),
            name: "Dogecoin".to_string(),
            label: "Dogecoin".to_string(),
            kind: NetworkKind::Bitcoin,
            slip44: 3,
            segwit: false,
            taproot: false,
            chain_id: None,
            blockchain_link: blockbook(&["https://doge1.trezor.io"]),
            support: since((1, 6, 2), (2, 0, 5)),
            variant: AddressVariant::Legacy,
            aliases: vec!["dogecoin"],
        });

        // Namecoin 没有后端
        self.register(NetworkInfo {
            shortcut: "nmc".to_string(),
            name: "Namecoin".to_string(),
            label: "Namecoin".to_string(),
            kind: NetworkKind::Bitcoin,
            slip44: 7,
            segwit: false,
            taproot: false,
            chain_id: None,
            blockchain_link: None,
            support: since((1, 6, 2), (2, 0, 5)),
            variant: AddressVariant::Legacy,
            aliases: vec!["namecoin"],
        });

        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        // 账户模型网络
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

        self.register(NetworkInfo {
            shortcut: "eth".to_string(),
            name: "Ethereum".to_string(),
            label: "Ethereum".to_string(),
            kind: NetworkKind::Ethereum,
            slip44: 60,
            segwit: false,
            taproot: false,
            chain_id: Some(1),
            blockchain_link: blockbook(&["https://eth1.trezor.io"]),
            support: since((1, 6, 2), (2, 0, 7)),
            variant: AddressVariant::Account,
            aliases: vec!["ethereum"],
        });

        // Sepolia 与 Bitcoin Testnet 共享 slip44 = 1，路径推断时优先 Testnet
        self.register(NetworkInfo {
            shortcut: "tsep".to_string(),
            name: "Ethereum Sepolia".to_string(),
            label: "Ethereum Sepolia".to_string(),
            kind: NetworkKind::Ethereum,
            slip44: 1,
            segwit: false,
            taproot: false,
            chain_id: Some(11155111),
            blockchain_link: blockbook(&["https://sepolia1.trezor.io"]),
            support: since((1, 6, 2), (2, 0, 7)),
            variant: AddressVariant::Account,
            aliases: vec!["sepolia"],
        });

        self.register(NetworkInfo {
            shortcut: "xrp".to_string(),
            name: "Ripple".to_string(),
            label: "XRP".to_string(),
            kind: NetworkKind::Ripple,
            slip44: 144,
            segwit: false,
            taproot: false,
            chain_id: None,
            blockchain_link: Some(BlockchainLink {
                backend: "ripple".to_string(),
                urls: vec!["wss://s1.ripple.com".to_string()],
            }),
            support: FirmwareRange::new(
                VersionRange::unsupported(),
                VersionRange::since(FirmwareVersion::new(2, 0, 8)),
            ),
            variant: AddressVariant::Account,
            aliases: vec!["ripple"],
        });
    }

    /// 注册网络
    pub fn register(&mut self, network: NetworkInfo) {
        let position = self.networks.len();
        self.index.insert(network.shortcut.to_lowercase(), position);
        self.index
            .entry(network.name.to_lowercase())
            .or_insert(position);
        for alias in &network.aliases {
            self.index.entry(alias.to_lowercase()).or_insert(position);
        }
        self.networks.push(network);
    }

    /// 通过币种标识获取
    pub fn get_by_coin(&self, coin: &str) -> Option<&NetworkInfo> {
        let key = coin.trim().to_lowercase();
        self.index.get(&key).map(|i| &self.networks[*i])
    }

    /// 通过派生路径推断
    ///
    /// 依据 coin type 匹配；segwit/taproot purpose 只匹配 UTXO 网络。
    pub fn get_by_path(&self, path: &DerivationPath) -> Option<&NetworkInfo> {
        let purpose = from_hardened(path.purpose()?);
        let coin_type = path.coin_type()?;
        let utxo_only = matches!(purpose, 49 | 84 | 86);

        self.networks
            .iter()
            .filter(|n| n.slip44 == coin_type)
            .find(|n| !utxo_only || n.kind == NetworkKind::Bitcoin)
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::new()
    }
}
