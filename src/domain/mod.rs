//! Domain 模块
//!
//! 路径、网络、固件范围、条目与账户等领域模型

pub mod account;
pub mod bundle;
pub mod confirmation;
pub mod firmware;
pub mod network;
pub mod path;

// Re-exports
pub use account::{
    AccountDescriptor, AccountInfo, AccountInfoRequest, AccountInfoResult, AccountQuery,
    AccountType, DetailLevel, DiscoveredAccount, Utxo,
};
pub use bundle::{AccountItem, AddressItem, AddressResult, Bundle, MethodResult};
pub use confirmation::ConfirmationState;
pub use firmware::{FirmwareRange, FirmwareVersion, VersionRange};
pub use network::{AddressVariant, NetworkInfo, NetworkKind, NetworkRegistry};
pub use path::DerivationPath;
