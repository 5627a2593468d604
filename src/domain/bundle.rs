//! 工作条目与 bundle
//!
//! bundle 是非空、有序的条目序列：插入顺序即调用方顺序即进度顺序。

use serde::{Deserialize, Serialize};

use crate::{
    domain::{account::AccountQuery, network::NetworkInfo, path::DerivationPath},
    error::{ConnectError, Result},
};

/// 地址导出条目
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressItem {
    pub path: DerivationPath,
    /// 调用方声明的地址
    pub expected_address: Option<String>,
    pub network: NetworkInfo,
    pub show_on_device: bool,
}

/// 地址导出结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressResult {
    pub path: DerivationPath,
    pub serialized_path: String,
    pub address: String,
}

impl AddressResult {
    pub fn new(path: DerivationPath, address: String) -> Self {
        Self {
            serialized_path: path.serialize(),
            path,
            address,
        }
    }
}

/// 账户信息条目
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountItem {
    pub path: Option<DerivationPath>,
    pub descriptor: Option<String>,
    pub network: NetworkInfo,
    pub query: AccountQuery,
    pub default_account_type: Option<String>,
}

impl AccountItem {
    /// 既无路径也无描述符：需要账户发现
    pub fn needs_discovery(&self) -> bool {
        self.path.is_none() && self.descriptor.is_none()
    }
}

/// 非空有序条目序列
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle<T> {
    items: Vec<T>,
}

impl<T> Bundle<T> {
    pub fn new(items: Vec<T>) -> Result<Self> {
        if items.is_empty() {
            return Err(ConnectError::validation("bundle", "must not be empty"));
        }
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 恒为 false，保留以满足惯用接口
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_single(&self) -> bool {
        self.items.len() == 1
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn first(&self) -> &T {
        &self.items[0]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<'a, T> IntoIterator for &'a Bundle<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// 方法结果：单条目返回单值，多条目返回有序列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MethodResult<T> {
    Single(T),
    Bundle(Vec<T>),
}

impl<T> MethodResult<T> {
    /// 按条目数量决定结果形态
    pub fn from_results(mut results: Vec<T>) -> Result<Self> {
        match results.len() {
            0 => Err(ConnectError::validation("bundle", "produced no results")),
            1 => Ok(MethodResult::Single(results.remove(0))),
            _ => Ok(MethodResult::Bundle(results)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MethodResult::Single(_) => 1,
            MethodResult::Bundle(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            MethodResult::Single(item) => vec![item],
            MethodResult::Bundle(items) => items,
        }
    }

    pub fn single(self) -> Option<T> {
        match self {
            MethodResult::Single(item) => Some(item),
            MethodResult::Bundle(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_rejects_empty() {
        assert!(Bundle::<u32>::new(vec![]).is_err());
        let bundle = Bundle::new(vec![1, 2, 3]).unwrap();
        assert_eq!(bundle.len(), 3);
        assert!(!bundle.is_single());
        assert_eq!(bundle.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_result_shape_follows_count() {
        let single = MethodResult::from_results(vec!["a"]).unwrap();
        assert_eq!(single, MethodResult::Single("a"));

        let many = MethodResult::from_results(vec!["a", "b"]).unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many.into_vec(), vec!["a", "b"]);
    }

    #[test]
    fn test_result_serializes_untagged() {
        let single = MethodResult::Single(1u32);
        assert_eq!(serde_json::to_string(&single).unwrap(), "1");
        let many = MethodResult::Bundle(vec![1u32, 2]);
        assert_eq!(serde_json::to_string(&many).unwrap(), "[1,2]");
    }
}
