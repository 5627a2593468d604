//! 远程后端接口
//!
//! 后端（Blockbook、XRP 节点等）只暴露账户查询与 UTXO 查询两类请求。

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    domain::{
        account::{AccountInfo, AccountInfoRequest, AccountInfoResult, AccountQuery, Utxo},
        network::NetworkInfo,
        path::DerivationPath,
    },
    error::{ConnectError, Result},
};

#[async_trait]
pub trait Backend: Send + Sync {
    async fn get_account_info(&self, request: &AccountInfoRequest) -> Result<AccountInfo>;

    async fn get_unspent_outputs(&self, descriptor: &str) -> Result<Vec<Utxo>>;
}

/// 按网络选择后端
pub trait BackendProvider: Send + Sync {
    fn backend_for(&self, network: &NetworkInfo) -> Option<Arc<dyn Backend>>;
}

/// 网络必须配置了后端
pub fn ensure_backend_supported(network: &NetworkInfo) -> Result<()> {
    if network.blockchain_link.is_none() {
        return Err(ConnectError::UnsupportedBackend(network.label.clone()));
    }
    Ok(())
}

/// 查询账户信息；UTXO 网络且详细程度超过 basic 时追加 UTXO 集合
pub async fn fetch_account_info(
    backend: &dyn Backend,
    network: &NetworkInfo,
    query: &AccountQuery,
    descriptor: &str,
    path: Option<&DerivationPath>,
) -> Result<AccountInfoResult> {
    let info = backend.get_account_info(&query.request_for(descriptor)).await?;

    let utxo = if query.wants_utxo(network) {
        Some(backend.get_unspent_outputs(descriptor).await?)
    } else {
        None
    };

    Ok(AccountInfoResult {
        path: path.map(DerivationPath::serialize),
        info,
        utxo,
    })
}

/// 所有网络共享同一个后端
pub struct SharedBackend(pub Arc<dyn Backend>);

impl BackendProvider for SharedBackend {
    fn backend_for(&self, network: &NetworkInfo) -> Option<Arc<dyn Backend>> {
        network.blockchain_link.as_ref().map(|_| self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::network::NetworkRegistry;

    #[test]
    fn test_backend_support_follows_blockchain_link() {
        let registry = NetworkRegistry::new();
        assert!(ensure_backend_supported(registry.get_by_coin("btc").unwrap()).is_ok());
        let err = ensure_backend_supported(registry.get_by_coin("nmc").unwrap()).unwrap_err();
        assert_eq!(err, ConnectError::UnsupportedBackend("Namecoin".to_string()));
    }
}
