//! 参数校验模块
//!
//! 每个方法声明固定的字段模式，原始 JSON 负载先按模式校验，再反序列化为强类型参数。

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ConnectError, Result};

/// 字段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Boolean,
    /// 派生路径：字符串或数字数组
    Path,
    /// 不超过 `u32::MAX` 的非负整数
    U32,
    /// 取值限定在给定集合内的字符串
    OneOf(&'static [&'static str]),
    /// 对象，且列出的键都是非负整数
    Fields(&'static [&'static str]),
}

impl ParamType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Path => {
                value.is_string()
                    || value
                        .as_array()
                        .map(|items| items.iter().all(Value::is_u64))
                        .unwrap_or(false)
            }
            ParamType::U32 => value
                .as_u64()
                .map(|n| n <= u64::from(u32::MAX))
                .unwrap_or(false),
            ParamType::OneOf(allowed) => value
                .as_str()
                .map(|s| allowed.iter().any(|a| *a == s))
                .unwrap_or(false),
            ParamType::Fields(keys) => value
                .as_object()
                .map(|object| {
                    keys.iter()
                        .all(|key| object.get(*key).map(Value::is_u64).unwrap_or(false))
                })
                .unwrap_or(false),
        }
    }

    fn describe(&self) -> String {
        match self {
            ParamType::String => "string".to_string(),
            ParamType::Number => "unsigned number".to_string(),
            ParamType::Boolean => "boolean".to_string(),
            ParamType::Path => "string or array of numbers".to_string(),
            ParamType::U32 => "unsigned 32-bit number".to_string(),
            ParamType::OneOf(allowed) => format!("one of {}", allowed.join(", ")),
            ParamType::Fields(keys) => {
                format!("object with unsigned number fields {}", keys.join(", "))
            }
        }
    }
}

/// 字段声明
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: ParamType,
    pub required: bool,
}

impl ParamSpec {
    pub const fn required(name: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            ty,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, ty: ParamType) -> Self {
        Self {
            name,
            ty,
            required: false,
        }
    }
}

/// 按模式校验一个对象。`null` 视为未提供。
pub fn validate_params(params: &Map<String, Value>, schema: &[ParamSpec]) -> Result<()> {
    for param in schema {
        match params.get(param.name) {
            None | Some(Value::Null) => {
                if param.required {
                    return Err(ConnectError::validation(param.name, "is missing"));
                }
            }
            Some(value) => {
                if !param.ty.matches(value) {
                    return Err(ConnectError::validation(
                        param.name,
                        format!("is invalid, expected {}", param.ty.describe()),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// 拆分负载：`{ bundle: [...] }` 或单个条目
pub fn split_bundle(payload: &Value) -> Result<Vec<Map<String, Value>>> {
    let object = payload
        .as_object()
        .ok_or_else(|| ConnectError::validation("payload", "must be an object"))?;

    match object.get("bundle") {
        None | Some(Value::Null) => Ok(vec![object.clone()]),
        Some(Value::Array(items)) => {
            if items.is_empty() {
                return Err(ConnectError::validation("bundle", "must not be empty"));
            }
            let mut result = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let item = item.as_object().ok_or_else(|| {
                    ConnectError::validation(
                        format!("bundle[{}]", index),
                        "must be an object",
                    )
                })?;
                result.push(item.clone());
            }
            Ok(result)
        }
        Some(_) => Err(ConnectError::validation("bundle", "must be an array")),
    }
}

/// 校验通过后反序列化为强类型参数
///
/// 模式需覆盖 `T` 的全部类型约束，否则反序列化错误只能归到 `payload`。
pub fn parse_params<T: DeserializeOwned>(
    params: &Map<String, Value>,
    schema: &[ParamSpec],
) -> Result<T> {
    validate_params(params, schema)?;
    serde_json::from_value(Value::Object(params.clone()))
        .map_err(|e| ConnectError::validation("payload", e.to_string()))
}
