//! 连接配置

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::row::FetchStyle;

/// 构造 [`Db`](crate::Db) 时的选项
///
/// 可以直接构造，也可以从配置文件反序列化：
///
/// ```rust,ignore
/// let options: DbOptions = serde_json::from_str(r#"{ "fetch_style": "assoc" }"#)?;
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbOptions {
    /// 默认的结果行形状
    pub fetch_style: FetchStyle,
    /// 是否让 sqlx 记录每条语句
    pub log_statements: bool,
    /// SQLite 文件不存在时是否创建
    pub create_if_missing: bool,
    /// 原样交给驱动的会话选项：SQLite 作为 PRAGMA，MySQL 作为 `SET SESSION` 变量
    pub session: BTreeMap<String, String>,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            fetch_style: FetchStyle::default(),
            log_statements: false,
            create_if_missing: true,
            session: BTreeMap::new(),
        }
    }
}

impl DbOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch_style(mut self, style: FetchStyle) -> Self {
        self.fetch_style = style;
        self
    }

    pub fn log_statements(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    pub fn create_if_missing(mut self, enabled: bool) -> Self {
        self.create_if_missing = enabled;
        self
    }

    pub fn session(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.session.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DbOptions::default();
        assert_eq!(options.fetch_style, FetchStyle::Obj);
        assert!(!options.log_statements);
        assert!(options.create_if_missing);
        assert!(options.session.is_empty());
    }

    #[test]
    fn test_deserialize_partial() {
        let options: DbOptions = serde_json::from_str(
            r#"{ "fetch_style": "assoc", "session": { "busy_timeout": "5000" } }"#,
        )
        .unwrap();
        assert_eq!(options.fetch_style, FetchStyle::Assoc);
        assert!(options.create_if_missing);
        assert_eq!(options.session.get("busy_timeout").map(String::as_str), Some("5000"));
    }
}
