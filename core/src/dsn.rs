//! DSN（Data Source Name）构建
//!
//! 每种后端一个不可变的值对象，统一通过 [`DataSource`] 渲染成规范的连接字符串：
//!
//! | 变体 | 格式 |
//! |---|---|
//! | mysql（带端口） | `mysql:host=HOST;dbname=DB;port=PORT;charset=CHARSET` |
//! | mysql（无端口） | `mysql:host=HOST;dbname=DB;charset=CHARSET` |
//! | mysql socket | `mysql:unix_socket=SOCK;dbname=DB;charset=CHARSET` |
//! | sqlite 文件 | `sqlite:FILENAME` |
//! | sqlite 内存库 | `sqlite::memory:` |

use std::fmt;
use std::str::FromStr;

use crate::driver::DbDriver;
use crate::error::{DbalError, Result};

/// 默认字符集
pub const DEFAULT_CHARSET: &str = "UTF8";

/// 可以渲染成 DSN 字符串的数据源
pub trait DataSource {
    /// 渲染规范的 DSN 字符串
    fn to_dsn_string(&self) -> String;

    /// 数据源对应的驱动
    fn driver(&self) -> DbDriver;
}

/// 通过 TCP 连接的 MySQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mysql {
    database: String,
    host: String,
    port: Option<u16>,
    charset: String,
}

impl Mysql {
    pub fn new(database: impl Into<String>, host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            database: database.into(),
            host: host.into(),
            port,
            charset: DEFAULT_CHARSET.to_string(),
        }
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }
}

impl DataSource for Mysql {
    fn to_dsn_string(&self) -> String {
        let mut dsn = format!("mysql:host={};dbname={};", self.host, self.database);
        if let Some(port) = self.port {
            dsn.push_str(&format!("port={};", port));
        }
        dsn.push_str(&format!("charset={};", self.charset));
        dsn.trim_end_matches(';').to_string()
    }

    fn driver(&self) -> DbDriver {
        DbDriver::MySql
    }
}

/// 通过 unix socket 连接的 MySQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MysqlSocket {
    database: String,
    socket: String,
    charset: String,
}

impl MysqlSocket {
    pub fn new(database: impl Into<String>, socket: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            socket: socket.into(),
            charset: DEFAULT_CHARSET.to_string(),
        }
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn socket(&self) -> &str {
        &self.socket
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }
}

impl DataSource for MysqlSocket {
    fn to_dsn_string(&self) -> String {
        format!(
            "mysql:unix_socket={};dbname={};charset={}",
            self.socket, self.database, self.charset
        )
    }

    fn driver(&self) -> DbDriver {
        DbDriver::MySql
    }
}

/// SQLite 数据库文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sqlite {
    filename: String,
}

impl Sqlite {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl DataSource for Sqlite {
    fn to_dsn_string(&self) -> String {
        format!("sqlite:{}", self.filename)
    }

    fn driver(&self) -> DbDriver {
        DbDriver::Sqlite
    }
}

/// SQLite 内存数据库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SqliteMemory;

impl DataSource for SqliteMemory {
    fn to_dsn_string(&self) -> String {
        "sqlite::memory:".to_string()
    }

    fn driver(&self) -> DbDriver {
        DbDriver::Sqlite
    }
}

/// 所有 DSN 变体的统一表示，用于在运行时保存和传递
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dsn {
    Mysql(Mysql),
    MysqlSocket(MysqlSocket),
    Sqlite(Sqlite),
    SqliteMemory(SqliteMemory),
}

impl Dsn {
    pub fn mysql(database: impl Into<String>, host: impl Into<String>, port: Option<u16>) -> Self {
        Dsn::Mysql(Mysql::new(database, host, port))
    }

    pub fn mysql_socket(database: impl Into<String>, socket: impl Into<String>) -> Self {
        Dsn::MysqlSocket(MysqlSocket::new(database, socket))
    }

    pub fn sqlite(filename: impl Into<String>) -> Self {
        Dsn::Sqlite(Sqlite::new(filename))
    }

    pub fn sqlite_memory() -> Self {
        Dsn::SqliteMemory(SqliteMemory)
    }

    fn inner(&self) -> &dyn DataSource {
        match self {
            Dsn::Mysql(dsn) => dsn,
            Dsn::MysqlSocket(dsn) => dsn,
            Dsn::Sqlite(dsn) => dsn,
            Dsn::SqliteMemory(dsn) => dsn,
        }
    }
}

impl DataSource for Dsn {
    fn to_dsn_string(&self) -> String {
        self.inner().to_dsn_string()
    }

    fn driver(&self) -> DbDriver {
        self.inner().driver()
    }
}

macro_rules! impl_dsn_variant {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Dsn {
                fn from(dsn: $variant) -> Self {
                    Dsn::$variant(dsn)
                }
            }

            impl fmt::Display for $variant {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.to_dsn_string())
                }
            }
        )*
    };
}

impl_dsn_variant!(Mysql, MysqlSocket, Sqlite, SqliteMemory);

impl fmt::Display for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dsn_string())
    }
}

impl FromStr for Dsn {
    type Err = DbalError;

    /// 解析规范格式的 DSN 字符串（用于从配置/环境变量读取连接信息）
    fn from_str(s: &str) -> Result<Self> {
        match DbDriver::from_dsn(s)? {
            DbDriver::Sqlite => {
                let filename = &s["sqlite:".len()..];
                if filename == ":memory:" {
                    Ok(Dsn::sqlite_memory())
                } else if filename.is_empty() {
                    Err(DbalError::InvalidDsn(format!("missing sqlite filename: {}", s)))
                } else {
                    Ok(Dsn::sqlite(filename))
                }
            }
            DbDriver::MySql => parse_mysql(s, &s["mysql:".len()..]),
        }
    }
}

fn parse_mysql(dsn: &str, body: &str) -> Result<Dsn> {
    let mut host = None;
    let mut socket = None;
    let mut database = None;
    let mut port = None;
    let mut charset = None;

    for pair in body.split(';').filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| DbalError::InvalidDsn(format!("malformed segment '{}' in {}", pair, dsn)))?;
        match key {
            "host" => host = Some(value),
            "unix_socket" => socket = Some(value),
            "dbname" => database = Some(value),
            "charset" => charset = Some(value),
            "port" => {
                port = Some(value.parse::<u16>().map_err(|_| {
                    DbalError::InvalidDsn(format!("invalid port '{}' in {}", value, dsn))
                })?)
            }
            other => {
                return Err(DbalError::InvalidDsn(format!(
                    "unknown key '{}' in {}",
                    other, dsn
                )))
            }
        }
    }

    let database =
        database.ok_or_else(|| DbalError::InvalidDsn(format!("missing dbname in {}", dsn)))?;
    let charset = charset.unwrap_or(DEFAULT_CHARSET);

    match (socket, host) {
        (Some(socket), None) => Ok(MysqlSocket::new(database, socket)
            .with_charset(charset)
            .into()),
        (None, Some(host)) => Ok(Mysql::new(database, host, port)
            .with_charset(charset)
            .into()),
        (Some(_), Some(_)) => Err(DbalError::InvalidDsn(format!(
            "host and unix_socket are mutually exclusive in {}",
            dsn
        ))),
        (None, None) => Err(DbalError::InvalidDsn(format!(
            "missing host or unix_socket in {}",
            dsn
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_dsn() {
        let dsn = Mysql::new("some_db", "localhost", Some(3996));
        assert_eq!(
            dsn.to_dsn_string(),
            "mysql:host=localhost;dbname=some_db;port=3996;charset=UTF8"
        );

        let dsn = Dsn::mysql("mega_db", "127.0.0.1", None);
        assert_eq!(
            dsn.to_dsn_string(),
            "mysql:host=127.0.0.1;dbname=mega_db;charset=UTF8"
        );
        assert_eq!(dsn.driver(), DbDriver::MySql);
    }

    #[test]
    fn test_mysql_dsn_with_charset() {
        let dsn = Mysql::new("db", "localhost", None).with_charset("utf8mb4");
        assert_eq!(dsn.to_string(), "mysql:host=localhost;dbname=db;charset=utf8mb4");
    }

    #[test]
    fn test_mysql_socket_dsn() {
        let dsn = MysqlSocket::new("some_db", "/var/run/mysql.sock");
        assert_eq!(
            dsn.to_dsn_string(),
            "mysql:unix_socket=/var/run/mysql.sock;dbname=some_db;charset=UTF8"
        );

        let dsn = Dsn::mysql_socket("mega_db", "/var/run/mysql.sock");
        assert_eq!(
            dsn.to_string(),
            "mysql:unix_socket=/var/run/mysql.sock;dbname=mega_db;charset=UTF8"
        );
    }

    #[test]
    fn test_sqlite_dsn() {
        let dsn = Sqlite::new("database.sqlite");
        assert_eq!(dsn.to_dsn_string(), "sqlite:database.sqlite");

        let dsn = Dsn::sqlite("/var/lib/sqlite/database.sqlite");
        assert_eq!(dsn.to_dsn_string(), "sqlite:/var/lib/sqlite/database.sqlite");
        assert_eq!(dsn.driver(), DbDriver::Sqlite);
    }

    #[test]
    fn test_sqlite_memory_dsn() {
        assert_eq!(SqliteMemory.to_dsn_string(), "sqlite::memory:");
        assert_eq!(Dsn::sqlite_memory().to_string(), "sqlite::memory:");
    }

    #[test]
    fn test_parse_canonical_strings() {
        for s in [
            "mysql:host=localhost;dbname=some_db;port=3996;charset=UTF8",
            "mysql:host=127.0.0.1;dbname=mega_db;charset=UTF8",
            "mysql:unix_socket=/var/run/mysql.sock;dbname=some_db;charset=UTF8",
            "sqlite:/var/lib/sqlite/database.sqlite",
            "sqlite::memory:",
        ] {
            let dsn: Dsn = s.parse().unwrap();
            assert_eq!(dsn.to_string(), s);
        }
    }

    #[test]
    fn test_parse_defaults_charset() {
        let dsn: Dsn = "mysql:host=db;dbname=app".parse().unwrap();
        assert_eq!(dsn, Dsn::mysql("app", "db", None));
    }

    #[test]
    fn test_parse_rejects_invalid() {
        for s in [
            "pgsql:host=localhost;dbname=db",
            "mysql:host=localhost",
            "mysql:dbname=db",
            "mysql:host=localhost;dbname=db;port=abc",
            "mysql:host=localhost;unix_socket=/tmp/s;dbname=db",
            "mysql:host=localhost;dbname=db;bogus",
            "sqlite:",
        ] {
            assert!(
                matches!(s.parse::<Dsn>(), Err(DbalError::InvalidDsn(_))),
                "{} should be rejected",
                s
            );
        }
    }
}
