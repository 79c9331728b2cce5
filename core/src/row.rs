//! 结果行
//!
//! 驱动返回的行先解码为 [`Record`]（列名 + 值），再按 [`FetchStyle`] 整理成
//! 调用方需要的形状 [`FetchedRow`]。

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{DbalError, Result};
use crate::value::Value;

/// 结果行的形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStyle {
    /// 列名 -> 值 的有序映射，重名列后者覆盖前者
    Assoc,
    /// 同时支持列名和下标访问
    Both,
    /// 同 `Obj`
    Bound,
    /// 同 `Obj`
    Lazy,
    /// 列名 -> 值 的有序映射，重名列的值全部保留
    Named,
    /// 按列顺序的值序列
    Num,
    /// 结构化记录
    #[default]
    Obj,
}

impl FetchStyle {
    pub const ALL: [FetchStyle; 7] = [
        FetchStyle::Assoc,
        FetchStyle::Both,
        FetchStyle::Bound,
        FetchStyle::Lazy,
        FetchStyle::Named,
        FetchStyle::Num,
        FetchStyle::Obj,
    ];

    /// 惯用的整数编号
    pub fn code(&self) -> i32 {
        match self {
            FetchStyle::Lazy => 1,
            FetchStyle::Assoc => 2,
            FetchStyle::Num => 3,
            FetchStyle::Both => 4,
            FetchStyle::Obj => 5,
            FetchStyle::Bound => 6,
            FetchStyle::Named => 11,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FetchStyle::Assoc => "assoc",
            FetchStyle::Both => "both",
            FetchStyle::Bound => "bound",
            FetchStyle::Lazy => "lazy",
            FetchStyle::Named => "named",
            FetchStyle::Num => "num",
            FetchStyle::Obj => "obj",
        }
    }
}

impl fmt::Display for FetchStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i32> for FetchStyle {
    type Error = DbalError;

    fn try_from(code: i32) -> Result<Self> {
        FetchStyle::ALL
            .into_iter()
            .find(|style| style.code() == code)
            .ok_or_else(|| DbalError::InvalidFetchStyle(code.to_string()))
    }
}

impl FromStr for FetchStyle {
    type Err = DbalError;

    /// 接受 `assoc`、`ASSOC`、`fetch_assoc` 等写法
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower.strip_prefix("fetch_").unwrap_or(&lower);
        FetchStyle::ALL
            .into_iter()
            .find(|style| style.name() == name)
            .ok_or_else(|| DbalError::InvalidFetchStyle(s.to_string()))
    }
}

impl TryFrom<&str> for FetchStyle {
    type Error = DbalError;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

/// 一行结果：共享的列名 + 按列顺序的值
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// 按列名取值，重名列取最后一个（与 `Assoc` 一致）
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .rposition(|c| c == column)
            .map(|index| &self.values[index])
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }

    /// 按风格整理成最终返回的形状
    pub fn shape(self, style: FetchStyle) -> FetchedRow {
        match style {
            FetchStyle::Assoc => {
                let mut map = ColumnMap::default();
                for (column, value) in self.columns.iter().zip(self.values) {
                    map.insert(column.clone(), value);
                }
                FetchedRow::Assoc(map)
            }
            FetchStyle::Named => {
                let mut named: Vec<(String, Vec<Value>)> = Vec::new();
                for (column, value) in self.columns.iter().zip(self.values) {
                    match named.iter_mut().find(|(c, _)| c == column) {
                        Some((_, values)) => values.push(value),
                        None => named.push((column.clone(), vec![value])),
                    }
                }
                FetchedRow::Named(named)
            }
            FetchStyle::Num => FetchedRow::Num(self.values),
            FetchStyle::Both => FetchedRow::Both(self),
            FetchStyle::Obj | FetchStyle::Lazy | FetchStyle::Bound => FetchedRow::Obj(self),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// 列名唯一的有序映射
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    entries: Vec<(String, Value)>,
}

impl ColumnMap {
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ColumnMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ColumnMap::default();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for ColumnMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// 按 [`FetchStyle`] 整理后的行
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FetchedRow {
    Assoc(ColumnMap),
    Named(Vec<(String, Vec<Value>)>),
    Num(Vec<Value>),
    Both(Record),
    Obj(Record),
}

impl FetchedRow {
    /// 按列名取值。`Num` 没有列名，总是返回 `None`；`Named` 返回重名列的第一个值
    pub fn get(&self, column: &str) -> Option<&Value> {
        match self {
            FetchedRow::Assoc(map) => map.get(column),
            FetchedRow::Named(named) => named
                .iter()
                .find(|(c, _)| c == column)
                .and_then(|(_, values)| values.first()),
            FetchedRow::Num(_) => None,
            FetchedRow::Both(record) | FetchedRow::Obj(record) => record.get(column),
        }
    }

    /// 按下标取值，只有 `Num` 和 `Both` 支持
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            FetchedRow::Num(values) => values.get(index),
            FetchedRow::Both(record) => record.get_index(index),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            FetchedRow::Both(record) | FetchedRow::Obj(record) => Some(record),
            _ => None,
        }
    }
}

// ========== 行解码 ==========

/// 结果集的列名
pub(crate) fn column_names<R: sqlx::Row>(row: &R) -> Arc<[String]> {
    use sqlx::Column;
    row.columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect()
}

/// 解码一行 SQLite 结果。按值的实际存储类型解码
#[cfg(feature = "sqlite")]
pub(crate) fn decode_sqlite_row(
    row: &sqlx::sqlite::SqliteRow,
    columns: &Arc<[String]>,
) -> Result<Record> {
    use sqlx::{Row, TypeInfo, ValueRef};

    let mut values = Vec::with_capacity(columns.len());
    for index in 0..columns.len() {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            values.push(Value::Null);
            continue;
        }
        let type_name = raw.type_info().name().to_string();
        let value = match type_name.as_str() {
            "INTEGER" | "BOOLEAN" => Value::Int(row.try_get::<i64, _>(index)?),
            "REAL" | "NUMERIC" => Value::Float(row.try_get::<f64, _>(index)?),
            "BLOB" => Value::Bytes(row.try_get::<Vec<u8>, _>(index)?),
            _ => Value::Text(row.try_get::<String, _>(index)?),
        };
        values.push(value);
    }
    Ok(Record::new(columns.clone(), values))
}

/// 解码一行 MySQL 结果。时间、定点数、JSON 列转换为文本
#[cfg(feature = "mysql")]
pub(crate) fn decode_mysql_row(
    row: &sqlx::mysql::MySqlRow,
    columns: &Arc<[String]>,
) -> Result<Record> {
    use sqlx::{Row, TypeInfo, ValueRef};

    let mut values = Vec::with_capacity(columns.len());
    for index in 0..columns.len() {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            values.push(Value::Null);
            continue;
        }
        let type_name = raw.type_info().name().to_string();
        let value = match type_name.as_str() {
            "BOOLEAN" => Value::Bool(row.try_get::<bool, _>(index)?),
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                Value::Int(row.try_get::<i64, _>(index)?)
            }
            name if name.ends_with(" UNSIGNED") => {
                let unsigned = row.try_get::<u64, _>(index)?;
                i64::try_from(unsigned)
                    .map(Value::Int)
                    .unwrap_or_else(|_| Value::Text(unsigned.to_string()))
            }
            "FLOAT" => Value::Float(row.try_get::<f32, _>(index)? as f64),
            "DOUBLE" => Value::Float(row.try_get::<f64, _>(index)?),
            "DECIMAL" => Value::Text(row.try_get::<bigdecimal::BigDecimal, _>(index)?.to_string()),
            "DATE" => Value::Text(row.try_get::<chrono::NaiveDate, _>(index)?.to_string()),
            "TIME" => Value::Text(row.try_get::<chrono::NaiveTime, _>(index)?.to_string()),
            "DATETIME" => Value::Text(row.try_get::<chrono::NaiveDateTime, _>(index)?.to_string()),
            "TIMESTAMP" => Value::Text(
                row.try_get::<chrono::DateTime<chrono::Utc>, _>(index)?
                    .naive_utc()
                    .to_string(),
            ),
            "JSON" => Value::Text(row.try_get::<serde_json::Value, _>(index)?.to_string()),
            name if name.contains("BLOB") || name.contains("BINARY") => {
                Value::Bytes(row.try_get::<Vec<u8>, _>(index)?)
            }
            _ => match row.try_get::<String, _>(index) {
                Ok(text) => Value::Text(text),
                Err(_) => Value::Bytes(row.try_get::<Vec<u8>, _>(index)?),
            },
        };
        values.push(value);
    }
    Ok(Record::new(columns.clone(), values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(columns: &[&str], values: Vec<Value>) -> Record {
        let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
        Record::new(columns, values)
    }

    #[test]
    fn test_fetch_style_codes() {
        for style in FetchStyle::ALL {
            assert_eq!(FetchStyle::try_from(style.code()).unwrap(), style);
        }
        assert!(matches!(
            FetchStyle::try_from(-99),
            Err(DbalError::InvalidFetchStyle(_))
        ));
        assert_eq!(FetchStyle::default(), FetchStyle::Obj);
    }

    #[test]
    fn test_fetch_style_from_str() {
        assert_eq!("assoc".parse::<FetchStyle>().unwrap(), FetchStyle::Assoc);
        assert_eq!("FETCH_NUM".parse::<FetchStyle>().unwrap(), FetchStyle::Num);
        assert_eq!(FetchStyle::try_from("Obj").unwrap(), FetchStyle::Obj);
        assert!(matches!(
            "column".parse::<FetchStyle>(),
            Err(DbalError::InvalidFetchStyle(_))
        ));
    }

    #[test]
    fn test_shape_assoc_and_num() {
        let row = record(&["id", "title"], vec![Value::Int(1), Value::from("A")]);

        let assoc = row.clone().shape(FetchStyle::Assoc);
        let expected: ColumnMap = [("id", Value::Int(1)), ("title", Value::from("A"))]
            .into_iter()
            .collect();
        assert_eq!(assoc, FetchedRow::Assoc(expected));
        assert_eq!(assoc.get("title"), Some(&Value::from("A")));
        assert_eq!(assoc.get_index(0), None);

        let num = row.shape(FetchStyle::Num);
        assert_eq!(num, FetchedRow::Num(vec![Value::Int(1), Value::from("A")]));
        assert_eq!(num.get("id"), None);
        assert_eq!(num.get_index(1), Some(&Value::from("A")));
    }

    #[test]
    fn test_shape_duplicate_columns() {
        let row = record(&["id", "id"], vec![Value::Int(1), Value::Int(2)]);

        let assoc = row.clone().shape(FetchStyle::Assoc);
        assert_eq!(assoc.get("id"), Some(&Value::Int(2)));

        let named = row.clone().shape(FetchStyle::Named);
        assert_eq!(
            named,
            FetchedRow::Named(vec![("id".to_string(), vec![Value::Int(1), Value::Int(2)])])
        );

        let both = row.shape(FetchStyle::Both);
        assert_eq!(both.get("id"), Some(&Value::Int(2)));
        assert_eq!(both.get_index(0), Some(&Value::Int(1)));
    }

    #[test]
    fn test_shape_record_styles() {
        let row = record(&["title"], vec![Value::from("A")]);
        for style in [FetchStyle::Obj, FetchStyle::Lazy, FetchStyle::Bound] {
            let shaped = row.clone().shape(style);
            assert_eq!(shaped.as_record(), Some(&row));
        }
    }

    #[test]
    fn test_record_serialize() {
        let row = record(&["id", "title"], vec![Value::Int(1), Value::Null]);
        let json = serde_json::to_value(row.shape(FetchStyle::Obj)).unwrap();
        assert_eq!(json, serde_json::json!({ "id": 1, "title": null }));
    }
}
