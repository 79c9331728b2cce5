//! 值与参数集合
//!
//! [`Value`] 是结果行中单元格的值，也是绑定参数的值。只有 integer / boolean /
//! NULL / string 可以作为参数绑定，由 [`BindKind::infer`] 在绑定时判断。

use std::fmt;

use serde::Serialize;

use crate::error::{DbalError, Result};
use crate::utils::normalize_param_key;

/// SQL 值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Bool(bool),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// 运行时类型名，用于错误信息
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Int(_) => "integer",
            Value::Bool(_) => "boolean",
            Value::Float(_) => "double",
            Value::Text(_) => "string",
            Value::Bytes(_) => "bytes",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

macro_rules! impl_from_for_value {
    ($variant:ident => $($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for_value!(Int => i64, i32, i16, i8, u32, u16, u8);
impl_from_for_value!(Float => f64, f32);
impl_from_for_value!(Text => String, &str, &String);
impl_from_for_value!(Bytes => Vec<u8>, &[u8]);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// 绑定类型：驱动对参数编码时使用的原生类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindKind {
    Integer,
    Boolean,
    Null,
    String,
}

impl BindKind {
    /// 根据值的类型推断绑定类型，`key` 只用于错误信息
    pub fn infer(key: &str, value: &Value) -> Result<Self> {
        Binding::new(key, value).map(|binding| binding.kind())
    }
}

/// 已确定绑定类型的参数值
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Integer(i64),
    Boolean(bool),
    Null,
    String(String),
}

impl Binding {
    pub fn new(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(Binding::Integer(*i)),
            Value::Bool(b) => Ok(Binding::Boolean(*b)),
            Value::Null => Ok(Binding::Null),
            Value::Text(s) => Ok(Binding::String(s.clone())),
            Value::Float(_) | Value::Bytes(_) => Err(DbalError::InvalidDataType {
                key: key.to_string(),
                observed: value.type_name().to_string(),
            }),
        }
    }

    pub fn kind(&self) -> BindKind {
        match self {
            Binding::Integer(_) => BindKind::Integer,
            Binding::Boolean(_) => BindKind::Boolean,
            Binding::Null => BindKind::Null,
            Binding::String(_) => BindKind::String,
        }
    }
}

/// 命名参数集合
///
/// 键在插入时去掉一个前导的 `:`，保持插入顺序。同名（规范化后）的键会覆盖旧值。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, Value)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式添加参数
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// 添加参数，返回被覆盖的旧值
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<Value>) -> Option<Value> {
        let key = normalize_param_key(key.as_ref());
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key.to_string(), value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        let key = normalize_param_key(key);
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 规范化后的键（不带 `:`）
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 合并 data 与子查询参数。两者的键必须互不相同，否则返回
    /// [`DbalError::ParameterKeyCollision`]。
    pub fn merge_disjoint(data: &Params, parameters: &Params) -> Result<Params> {
        if let Some(key) = data.keys().find(|k| parameters.contains_key(k)) {
            return Err(DbalError::ParameterKeyCollision {
                key: key.to_string(),
            });
        }
        let mut merged = data.clone();
        merged.entries.extend(parameters.entries.iter().cloned());
        Ok(merged)
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl<K: AsRef<str>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Params {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl TryFrom<serde_json::Value> for Params {
    type Error = DbalError;

    /// 从 JSON 对象构建参数。数组和对象这类复合值在这里直接拒绝。
    fn try_from(json: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = json else {
            return Err(DbalError::InvalidNamedParameter(
                "Given data must have named parameters".to_string(),
            ));
        };

        let mut params = Params::new();
        for (key, value) in map {
            let value = match value {
                serde_json::Value::Null => Value::Null,
                serde_json::Value::Bool(b) => Value::Bool(b),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(i) => Value::Int(i),
                    None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
                },
                serde_json::Value::String(s) => Value::Text(s),
                serde_json::Value::Array(_) => {
                    return Err(DbalError::InvalidDataType {
                        key,
                        observed: "array".to_string(),
                    })
                }
                serde_json::Value::Object(_) => {
                    return Err(DbalError::InvalidDataType {
                        key,
                        observed: "object".to_string(),
                    })
                }
            };
            params.insert(key, value);
        }
        Ok(params)
    }
}

/// 构建 [`Params`]
///
/// ```rust,ignore
/// let params = sqlxdbal::params! { ":id" => 2, "title" => "Article 2" };
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::value::Params::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::value::Params::new()$(.with($key, $value))+
    };
}
