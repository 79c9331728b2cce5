//! 查询引擎
//!
//! [`Db`] 持有一个连接，提供 fetch / fetch_all / insert / update / delete / truncate
//! 以及最底层的 [`Db::execute`]。所有高层方法最终都经过 `execute`：参数名规范化、
//! 绑定类型推断、命名占位符改写，然后交给驱动预处理并执行。

use tracing::{debug, info, warn};

use crate::config::DbOptions;
use crate::connection::{Connection, ResultSet};
use crate::driver::DbDriver;
use crate::dsn::Dsn;
use crate::error::{DbalError, Result};
use crate::named_params::rewrite_named;
use crate::row::{FetchStyle, FetchedRow};
use crate::utils::is_valid_param_name;
use crate::value::{Binding, Params};

/// 查询引擎
///
/// 只有两种状态：打开（持有连接）和关闭。[`Db::close`] 之后所有操作都返回
/// [`DbalError::ConnectionClosed`]。
///
/// 所有语句方法都需要 `&mut self`，同一个实例不能被并发使用；
/// 多个任务共享时每个任务各自持有一个 `Db`，或者在外部加锁。
#[derive(Debug)]
pub struct Db {
    conn: Option<Connection>,
    fetch_style: FetchStyle,
    last_insert_id: Option<i64>,
}

impl Db {
    /// 打开连接
    pub async fn connect(
        dsn: &Dsn,
        username: &str,
        password: &str,
        options: DbOptions,
    ) -> Result<Self> {
        let conn = Connection::connect(dsn, username, password, &options).await?;
        info!(driver = ?conn.driver(), "database connection opened");
        Ok(Self {
            conn: Some(conn),
            fetch_style: options.fetch_style,
            last_insert_id: None,
        })
    }

    /// 不带用户名密码、使用默认选项打开连接（SQLite）
    pub async fn open(dsn: &Dsn) -> Result<Self> {
        Self::connect(dsn, "", "", DbOptions::default()).await
    }

    /// 关闭连接。重复调用没有影响
    pub async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
            info!("database connection closed");
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    /// 底层连接
    pub fn connection(&mut self) -> Result<&mut Connection> {
        self.conn.as_mut().ok_or(DbalError::ConnectionClosed)
    }

    pub fn driver(&self) -> Result<DbDriver> {
        self.conn
            .as_ref()
            .map(Connection::driver)
            .ok_or(DbalError::ConnectionClosed)
    }

    pub fn fetch_style(&self) -> FetchStyle {
        self.fetch_style
    }

    /// 设置默认的结果行形状
    ///
    /// 接受 [`FetchStyle`]、整数编号或名称；非法值返回
    /// [`DbalError::InvalidFetchStyle`]，原设置保持不变。
    pub fn set_fetch_style<S>(&mut self, style: S) -> Result<()>
    where
        S: TryInto<FetchStyle>,
        DbalError: From<S::Error>,
    {
        self.fetch_style = style.try_into()?;
        Ok(())
    }

    /// 最近一条语句生成的自增 ID
    pub fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id
    }

    /// 打开或关闭外键检查（会话级）
    pub async fn set_foreign_key_check(&mut self, enabled: bool) -> Result<()> {
        let conn = self.connection()?;
        let sql = conn.driver().foreign_key_check_sql(enabled);
        debug!(sql = %sql, "executing session command");
        conn.execute_raw(&sql).await?;
        Ok(())
    }

    /// 清空表
    ///
    /// `force` 为 true 时先关闭外键检查，清空后再打开。只要关闭成功，
    /// 无论清空是否成功都会重新打开；清空的错误优先返回。
    pub async fn truncate(&mut self, table: &str, force: bool) -> Result<()> {
        let sql = self.driver()?.truncate_sql(table);
        if !force {
            self.execute(&sql, &Params::new()).await?;
            return Ok(());
        }

        self.set_foreign_key_check(false).await?;
        let truncated = self.execute(&sql, &Params::new()).await;
        let restored = self.set_foreign_key_check(true).await;

        match (truncated, restored) {
            (Ok(_), restored) => restored,
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(restore_err)) => {
                warn!(
                    table,
                    error = %restore_err,
                    "failed to re-enable foreign key checks after truncate failure"
                );
                Err(err)
            }
        }
    }

    /// 取第一行，没有结果时返回 `None`
    ///
    /// SQL：`SELECT <columns|*> FROM <table> <sub_query>`
    pub async fn fetch(
        &mut self,
        table: &str,
        sub_query: &str,
        parameters: &Params,
        columns: &[&str],
    ) -> Result<Option<FetchedRow>> {
        let style = self.fetch_style;
        self.fetch_as(style, table, sub_query, parameters, columns)
            .await
    }

    /// 与 [`Db::fetch`] 相同，但使用指定的行形状
    pub async fn fetch_as(
        &mut self,
        style: FetchStyle,
        table: &str,
        sub_query: &str,
        parameters: &Params,
        columns: &[&str],
    ) -> Result<Option<FetchedRow>> {
        let result = self.pre_fetch(table, sub_query, parameters, columns).await?;
        Ok(result.fetch(style))
    }

    /// 取所有行
    pub async fn fetch_all(
        &mut self,
        table: &str,
        sub_query: &str,
        parameters: &Params,
        columns: &[&str],
    ) -> Result<Vec<FetchedRow>> {
        let style = self.fetch_style;
        self.fetch_all_as(style, table, sub_query, parameters, columns)
            .await
    }

    /// 与 [`Db::fetch_all`] 相同，但使用指定的行形状
    pub async fn fetch_all_as(
        &mut self,
        style: FetchStyle,
        table: &str,
        sub_query: &str,
        parameters: &Params,
        columns: &[&str],
    ) -> Result<Vec<FetchedRow>> {
        let result = self.pre_fetch(table, sub_query, parameters, columns).await?;
        Ok(result.fetch_all(style))
    }

    /// 插入一行，`data` 的每个键既是列名也是参数名
    ///
    /// SQL：`INSERT INTO <table> (<keys>) VALUES (:<keys>)`
    pub async fn insert(&mut self, table: &str, data: &Params) -> Result<()> {
        let driver = self.driver()?;
        let columns: Vec<String> = data.keys().map(|k| driver.escape_identifier(k)).collect();
        let values: Vec<String> = data.keys().map(|k| format!(":{}", k)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            driver.escape_identifier(table),
            columns.join(", "),
            values.join(", ")
        );
        self.execute(&sql, data).await?;
        Ok(())
    }

    /// 更新，返回影响行数
    ///
    /// `data` 与 `parameters` 的参数名（去掉 `:` 后）不能重复，否则返回
    /// [`DbalError::ParameterKeyCollision`]，不执行任何语句。
    ///
    /// SQL：`UPDATE <table> SET <col> = :<col>, ... <sub_query>`
    pub async fn update(
        &mut self,
        table: &str,
        data: &Params,
        sub_query: &str,
        parameters: &Params,
    ) -> Result<u64> {
        let merged = Params::merge_disjoint(data, parameters)?;
        let driver = self.driver()?;
        let fields: Vec<String> = data
            .keys()
            .map(|k| format!("{} = :{}", driver.escape_identifier(k), k))
            .collect();
        let sql = compose(&[
            "UPDATE",
            &driver.escape_identifier(table),
            "SET",
            &fields.join(", "),
            sub_query,
        ]);
        let result = self.execute(&sql, &merged).await?;
        Ok(result.rows_affected())
    }

    /// 删除，返回影响行数
    ///
    /// SQL：`DELETE FROM <table> <sub_query>`
    pub async fn delete(
        &mut self,
        table: &str,
        sub_query: &str,
        parameters: &Params,
    ) -> Result<u64> {
        let driver = self.driver()?;
        let sql = compose(&["DELETE FROM", &driver.escape_identifier(table), sub_query]);
        let result = self.execute(&sql, parameters).await?;
        Ok(result.rows_affected())
    }

    /// 执行带命名参数的 SQL
    ///
    /// 每个参数先检查名称、推断绑定类型，任何一个不合法都不会执行语句。
    /// SQL 中的 `:name` 必须都有对应的参数，参数也必须都在 SQL 中出现。
    pub async fn execute(&mut self, sql: &str, parameters: &Params) -> Result<ResultSet> {
        if self.conn.is_none() {
            return Err(DbalError::ConnectionClosed);
        }

        let mut bound = Vec::with_capacity(parameters.len());
        for (key, value) in parameters.iter() {
            if !is_valid_param_name(key) {
                return Err(DbalError::InvalidNamedParameter(format!(
                    "Given data must have named parameters, got key '{}'",
                    key
                )));
            }
            bound.push((key, Binding::new(key, value)?));
        }

        let driver = self.driver()?;
        let named = rewrite_named(sql, driver);

        if let Some((unused, _)) = bound
            .iter()
            .find(|(key, _)| !named.names().iter().any(|n| n == key))
        {
            return Err(DbalError::InvalidNamedParameter(format!(
                "parameter ':{}' is not used in the statement",
                unused
            )));
        }

        let mut bindings = Vec::with_capacity(named.names().len());
        for name in named.names() {
            let binding = bound
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, binding)| binding.clone())
                .ok_or_else(|| {
                    DbalError::InvalidNamedParameter(format!(
                        "no value bound for parameter ':{}'",
                        name
                    ))
                })?;
            bindings.push(binding);
        }

        debug!(sql = %named.sql(), params = bindings.len(), "executing statement");
        let result = self.connection()?.run(named.sql(), bindings).await?;
        if result.last_insert_id().is_some() {
            self.last_insert_id = result.last_insert_id();
        }
        Ok(result)
    }

    /// [`Db::execute`] 的别名
    pub async fn query(&mut self, sql: &str, parameters: &Params) -> Result<ResultSet> {
        self.execute(sql, parameters).await
    }

    async fn pre_fetch(
        &mut self,
        table: &str,
        sub_query: &str,
        parameters: &Params,
        columns: &[&str],
    ) -> Result<ResultSet> {
        let driver = self.driver()?;
        let columns = if columns.is_empty() {
            "*".to_string()
        } else {
            columns
                .iter()
                .map(|c| driver.escape_identifier(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let sql = compose(&[
            "SELECT",
            &columns,
            "FROM",
            &driver.escape_identifier(table),
            sub_query,
        ]);
        self.execute(&sql, parameters).await
    }
}

/// 用空格拼接 SQL 片段，忽略空片段
fn compose(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
