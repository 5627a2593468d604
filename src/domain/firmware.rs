//! 固件版本范围
//!
//! 每个方法、每个网络都声明其支持的固件范围；bundle 内所有条目的范围取交集
//! （最大下界、最小上界）。交集是否可满足由调用方在连接设备后判断。

use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

/// 固件版本 `major.minor.patch`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl FirmwareVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// `0.0.0` 表示该型号不支持
    pub const UNSUPPORTED: FirmwareVersion = FirmwareVersion::new(0, 0, 0);

    pub fn is_unsupported(&self) -> bool {
        *self == Self::UNSUPPORTED
    }
}

impl PartialOrd for FirmwareVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FirmwareVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// 单个型号的版本范围，`max` 为空表示无上界
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRange {
    pub min: FirmwareVersion,
    pub max: Option<FirmwareVersion>,
}

impl VersionRange {
    pub const fn since(min: FirmwareVersion) -> Self {
        Self { min, max: None }
    }

    pub const fn unsupported() -> Self {
        Self {
            min: FirmwareVersion::UNSUPPORTED,
            max: None,
        }
    }

    /// 收窄：取较大的下界与较小的上界
    pub fn narrow(&self, other: &VersionRange) -> VersionRange {
        // 任一方不支持则结果不支持
        if self.min.is_unsupported() || other.min.is_unsupported() {
            return VersionRange::unsupported();
        }
        let max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) | (None, Some(a)) => Some(a),
            (None, None) => None,
        };
        VersionRange {
            min: self.min.max(other.min),
            max,
        }
    }

    pub fn is_satisfiable(&self) -> bool {
        if self.min.is_unsupported() {
            return false;
        }
        match self.max {
            Some(max) => self.min <= max,
            None => true,
        }
    }
}

/// 全部型号的固件范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareRange {
    pub model_one: VersionRange,
    pub model_t: VersionRange,
}

impl FirmwareRange {
    pub const fn new(model_one: VersionRange, model_t: VersionRange) -> Self {
        Self { model_one, model_t }
    }

    pub fn narrow(&self, other: &FirmwareRange) -> FirmwareRange {
        FirmwareRange {
            model_one: self.model_one.narrow(&other.model_one),
            model_t: self.model_t.narrow(&other.model_t),
        }
    }
}

impl Default for FirmwareRange {
    fn default() -> Self {
        Self::new(
            VersionRange::since(FirmwareVersion::new(1, 0, 0)),
            VersionRange::since(FirmwareVersion::new(2, 0, 0)),
        )
    }
}
