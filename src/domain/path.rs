//! BIP32 派生路径
//!
//! 解析字符串形式（`m/44'/0'/0'`，支持 `'`、`h`、`H` 硬化标记）或数字数组形式的路径，
//! 并序列化回规范字符串。

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConnectError, Result};

/// 硬化派生偏移量
pub const HARDENED: u32 = 0x8000_0000;

static COMPONENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(['hH])?$").expect("static path component regex"));

pub const fn to_hardened(index: u32) -> u32 {
    index | HARDENED
}

pub const fn from_hardened(index: u32) -> u32 {
    index & !HARDENED
}

pub const fn is_hardened(index: u32) -> bool {
    index & HARDENED != 0
}

/// 派生路径（组件有序序列）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    pub fn new(components: Vec<u32>) -> Self {
        Self(components)
    }

    /// 解析字符串路径
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = || ConnectError::validation("path", format!("is not a valid path: {}", path));

        let lower = path.trim().to_lowercase();
        let mut parts: Vec<&str> = lower.split('/').collect();
        if parts.first() == Some(&"m") {
            parts.remove(0);
        }
        if parts.is_empty() || parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }

        let mut components = Vec::with_capacity(parts.len());
        for part in parts {
            let caps = COMPONENT_RE.captures(part).ok_or_else(invalid)?;
            let index: u32 = caps[1].parse().map_err(|_| invalid())?;
            if index >= HARDENED {
                return Err(invalid());
            }
            if caps.get(2).is_some() {
                components.push(to_hardened(index));
            } else {
                components.push(index);
            }
        }
        Ok(Self(components))
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 第一个组件（BIP43 purpose）
    pub fn purpose(&self) -> Option<u32> {
        self.0.first().copied()
    }

    /// SLIP-44 coin type（已去除硬化位）
    pub fn coin_type(&self) -> Option<u32> {
        self.0.get(1).map(|c| from_hardened(*c))
    }

    /// 账户索引（已去除硬化位）
    pub fn account(&self) -> Option<u32> {
        self.0.get(2).map(|c| from_hardened(*c))
    }

    /// 规范字符串形式：`m/44'/0'/0'/0/0`
    pub fn serialize(&self) -> String {
        let mut out = String::from("m");
        for component in &self.0 {
            if is_hardened(*component) {
                out.push_str(&format!("/{}'", from_hardened(*component)));
            } else {
                out.push_str(&format!("/{}", component));
            }
        }
        out
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl From<Vec<u32>> for DerivationPath {
    fn from(components: Vec<u32>) -> Self {
        Self(components)
    }
}

/// 从原始参数解析路径并检查最小深度
pub fn validate_path(value: &Value, min_length: usize) -> Result<DerivationPath> {
    let path = match value {
        Value::String(s) => DerivationPath::parse(s)?,
        Value::Array(items) => {
            let mut components = Vec::with_capacity(items.len());
            for item in items {
                let n = item
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| ConnectError::validation("path", "is not a valid path"))?;
                components.push(n);
            }
            DerivationPath(components)
        }
        _ => return Err(ConnectError::validation("path", "is not a valid path")),
    };

    if path.len() < min_length {
        return Err(ConnectError::validation(
            "path",
            format!("is not a valid path: expected at least {} levels", min_length),
        ));
    }
    Ok(path)
}
