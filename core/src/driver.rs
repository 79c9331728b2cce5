use crate::error::{DbalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbDriver {
    MySql,
    Sqlite,
}

impl DbDriver {
    /// 根据 DSN 前缀判断驱动类型
    pub fn from_dsn(dsn: &str) -> Result<Self> {
        if dsn.starts_with("mysql:") {
            Ok(DbDriver::MySql)
        } else if dsn.starts_with("sqlite:") {
            Ok(DbDriver::Sqlite)
        } else {
            Err(DbalError::InvalidDsn(format!(
                "unsupported driver, only mysql and sqlite are supported, got: {}",
                dsn
            )))
        }
    }

    /// 转义 SQL 标识符（表名、列名）
    ///
    /// * MySQL: `` `name` ``
    /// * SQLite: `"name"`
    ///
    /// 标识符内出现的引号字符会被双写。
    pub fn escape_identifier(&self, name: &str) -> String {
        match self {
            DbDriver::MySql => format!("`{}`", name.replace('`', "``")),
            DbDriver::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// 打开/关闭外键检查的会话级命令
    pub fn foreign_key_check_sql(&self, enabled: bool) -> String {
        match self {
            DbDriver::MySql => format!("SET FOREIGN_KEY_CHECKS={}", enabled as i32),
            DbDriver::Sqlite => {
                format!("PRAGMA foreign_keys = {}", if enabled { "ON" } else { "OFF" })
            }
        }
    }

    /// 清空表的语句。SQLite 没有 TRUNCATE，使用不带条件的 DELETE（SQLite 的 truncate 优化）
    pub fn truncate_sql(&self, table: &str) -> String {
        let table = self.escape_identifier(table);
        match self {
            DbDriver::MySql => format!("TRUNCATE {}", table),
            DbDriver::Sqlite => format!("DELETE FROM {}", table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dsn() {
        assert_eq!(
            DbDriver::from_dsn("mysql:host=localhost;dbname=db;charset=UTF8").unwrap(),
            DbDriver::MySql
        );
        assert_eq!(DbDriver::from_dsn("sqlite::memory:").unwrap(), DbDriver::Sqlite);
        assert!(matches!(
            DbDriver::from_dsn("pgsql:host=localhost"),
            Err(DbalError::InvalidDsn(_))
        ));
    }

    #[test]
    fn test_escape_identifier() {
        assert_eq!(DbDriver::MySql.escape_identifier("user"), "`user`");
        assert_eq!(DbDriver::MySql.escape_identifier("a`b"), "`a``b`");
        assert_eq!(DbDriver::Sqlite.escape_identifier("user"), "\"user\"");
        assert_eq!(DbDriver::Sqlite.escape_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_session_commands() {
        assert_eq!(
            DbDriver::MySql.foreign_key_check_sql(false),
            "SET FOREIGN_KEY_CHECKS=0"
        );
        assert_eq!(
            DbDriver::MySql.foreign_key_check_sql(true),
            "SET FOREIGN_KEY_CHECKS=1"
        );
        assert_eq!(
            DbDriver::Sqlite.foreign_key_check_sql(false),
            "PRAGMA foreign_keys = OFF"
        );
        assert_eq!(DbDriver::MySql.truncate_sql("articles"), "TRUNCATE `articles`");
        assert_eq!(
            DbDriver::Sqlite.truncate_sql("articles"),
            "DELETE FROM \"articles\""
        );
    }
}
