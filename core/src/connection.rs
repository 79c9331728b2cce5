//! 单个数据库连接
//!
//! 对 sqlx 连接的薄封装：打开连接、预处理 + 绑定 + 执行、执行不带参数的会话命令。

#[cfg(feature = "sqlite")]
use std::str::FromStr;

use sqlx::Connection as _;
use sqlx::{ConnectOptions, Executor, Statement};

use crate::config::DbOptions;
use crate::driver::DbDriver;
use crate::dsn::Dsn;
use crate::error::{DbalError, Result};
use crate::row::{column_names, FetchStyle, FetchedRow, Record};
use crate::value::Binding;

/// 把一个绑定值应用到 sqlx 查询上
macro_rules! apply_binding {
    ($query:ident, $binding:expr) => {
        match $binding {
            $crate::value::Binding::Integer(i) => {
                $query = $query.bind(i);
            }
            $crate::value::Binding::Boolean(b) => {
                $query = $query.bind(b);
            }
            $crate::value::Binding::Null => {
                $query = $query.bind(Option::<String>::None);
            }
            $crate::value::Binding::String(s) => {
                $query = $query.bind(s);
            }
        }
    };
}

/// 预处理、绑定并执行。返回列的语句取回所有行，其余语句返回影响行数
macro_rules! run_prepared {
    ($conn:ident, $sql:expr, $bindings:expr, $decode:path, |$done:ident| $last_id:expr) => {{
        let statement = (&mut *$conn).prepare($sql).await?;
        let returns_rows = !statement.columns().is_empty();
        let mut query = statement.query();
        for binding in $bindings {
            apply_binding!(query, binding);
        }
        if returns_rows {
            let rows = query.fetch_all(&mut *$conn).await?;
            let mut records = Vec::with_capacity(rows.len());
            if let Some(first) = rows.first() {
                let columns = column_names(first);
                for row in &rows {
                    records.push($decode(row, &columns)?);
                }
            }
            Ok(ResultSet::from_rows(records))
        } else {
            let $done = query.execute(&mut *$conn).await?;
            Ok(ResultSet::from_done($done.rows_affected(), $last_id))
        }
    }};
}

/// 数据库连接
#[derive(Debug)]
pub enum Connection {
    #[cfg(feature = "mysql")]
    MySql(sqlx::MySqlConnection),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlx::SqliteConnection),
}

impl Connection {
    /// 打开连接。SQLite 忽略用户名和密码
    pub async fn connect(
        dsn: &Dsn,
        username: &str,
        password: &str,
        options: &DbOptions,
    ) -> Result<Self> {
        match dsn {
            #[cfg(feature = "mysql")]
            Dsn::Mysql(mysql) => {
                let mut connect_options = sqlx::mysql::MySqlConnectOptions::new()
                    .host(mysql.host())
                    .database(mysql.database())
                    .charset(&mysql.charset().to_ascii_lowercase());
                if let Some(port) = mysql.port() {
                    connect_options = connect_options.port(port);
                }
                Self::connect_mysql(connect_options, username, password, options).await
            }
            #[cfg(feature = "mysql")]
            Dsn::MysqlSocket(socket) => {
                let connect_options = sqlx::mysql::MySqlConnectOptions::new()
                    .socket(socket.socket())
                    .database(socket.database())
                    .charset(&socket.charset().to_ascii_lowercase());
                Self::connect_mysql(connect_options, username, password, options).await
            }
            #[cfg(feature = "sqlite")]
            Dsn::Sqlite(sqlite) => {
                let connect_options = sqlx::sqlite::SqliteConnectOptions::new()
                    .filename(sqlite.filename())
                    .create_if_missing(options.create_if_missing);
                Self::connect_sqlite(connect_options, options).await
            }
            #[cfg(feature = "sqlite")]
            Dsn::SqliteMemory(_) => {
                let connect_options = sqlx::sqlite::SqliteConnectOptions::from_str("sqlite::memory:")?;
                Self::connect_sqlite(connect_options, options).await
            }
            #[allow(unreachable_patterns)]
            _ => Err(DbalError::InvalidDsn(format!(
                "driver for '{}' is not enabled in this build",
                dsn
            ))),
        }
    }

    #[cfg(feature = "mysql")]
    async fn connect_mysql(
        connect_options: sqlx::mysql::MySqlConnectOptions,
        username: &str,
        password: &str,
        options: &DbOptions,
    ) -> Result<Self> {
        let mut connect_options = connect_options.username(username).password(password);
        if !options.log_statements {
            connect_options = connect_options.disable_statement_logging();
        }
        let mut conn = sqlx::MySqlConnection::connect_with(&connect_options).await?;
        for (key, value) in &options.session {
            let sql = format!("SET SESSION {} = {}", key, value);
            conn.execute(sql.as_str()).await?;
        }
        Ok(Connection::MySql(conn))
    }

    #[cfg(feature = "sqlite")]
    async fn connect_sqlite(
        mut connect_options: sqlx::sqlite::SqliteConnectOptions,
        options: &DbOptions,
    ) -> Result<Self> {
        for (key, value) in &options.session {
            connect_options = connect_options.pragma(key.clone(), value.clone());
        }
        if !options.log_statements {
            connect_options = connect_options.disable_statement_logging();
        }
        let conn = sqlx::SqliteConnection::connect_with(&connect_options).await?;
        Ok(Connection::Sqlite(conn))
    }

    pub fn driver(&self) -> DbDriver {
        match self {
            #[cfg(feature = "mysql")]
            Connection::MySql(_) => DbDriver::MySql,
            #[cfg(feature = "sqlite")]
            Connection::Sqlite(_) => DbDriver::Sqlite,
        }
    }

    /// 底层的 MySQL 连接（如果适用）
    #[cfg(feature = "mysql")]
    pub fn as_mysql(&mut self) -> Option<&mut sqlx::MySqlConnection> {
        match self {
            Connection::MySql(conn) => Some(conn),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// 底层的 SQLite 连接（如果适用）
    #[cfg(feature = "sqlite")]
    pub fn as_sqlite(&mut self) -> Option<&mut sqlx::SqliteConnection> {
        match self {
            Connection::Sqlite(conn) => Some(conn),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// 执行已改写为位置占位符的 SQL，`bindings` 与占位符一一对应
    pub async fn run(&mut self, sql: &str, bindings: Vec<Binding>) -> Result<ResultSet> {
        match self {
            #[cfg(feature = "mysql")]
            Connection::MySql(conn) => run_prepared!(
                conn,
                sql,
                bindings,
                crate::row::decode_mysql_row,
                |done| i64::try_from(done.last_insert_id()).ok()
            ),
            #[cfg(feature = "sqlite")]
            Connection::Sqlite(conn) => run_prepared!(
                conn,
                sql,
                bindings,
                crate::row::decode_sqlite_row,
                |done| Some(done.last_insert_rowid())
            ),
        }
    }

    /// 执行不带参数的会话命令（不走预处理），返回影响行数
    pub async fn execute_raw(&mut self, sql: &str) -> Result<u64> {
        match self {
            #[cfg(feature = "mysql")]
            Connection::MySql(conn) => Ok(conn.execute(sql).await?.rows_affected()),
            #[cfg(feature = "sqlite")]
            Connection::Sqlite(conn) => Ok(conn.execute(sql).await?.rows_affected()),
        }
    }

    /// 关闭连接
    pub async fn close(self) -> Result<()> {
        match self {
            #[cfg(feature = "mysql")]
            Connection::MySql(conn) => conn.close().await?,
            #[cfg(feature = "sqlite")]
            Connection::Sqlite(conn) => conn.close().await?,
        }
        Ok(())
    }
}

/// 一条语句的执行结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    rows: Vec<Record>,
    rows_affected: u64,
    last_insert_id: Option<i64>,
}

impl ResultSet {
    fn from_rows(rows: Vec<Record>) -> Self {
        Self {
            rows,
            rows_affected: 0,
            last_insert_id: None,
        }
    }

    fn from_done(rows_affected: u64, last_insert_id: Option<i64>) -> Self {
        Self {
            rows: Vec::new(),
            rows_affected,
            last_insert_id,
        }
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    /// 语句影响的行数，返回结果行的语句为 0
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// 语句生成的自增 ID
    pub fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id
    }

    /// 第一行，没有结果时返回 `None`
    pub fn fetch(self, style: FetchStyle) -> Option<FetchedRow> {
        self.rows.into_iter().next().map(|row| row.shape(style))
    }

    /// 所有行
    pub fn fetch_all(self, style: FetchStyle) -> Vec<FetchedRow> {
        self.rows.into_iter().map(|row| row.shape(style)).collect()
    }
}
