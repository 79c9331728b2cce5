pub mod config;
pub mod connection;
pub mod db;
pub mod driver;
pub mod dsn;
pub mod error;
pub mod named_params;
pub mod row;
pub mod utils;
pub mod value;

pub use config::DbOptions;
pub use connection::{Connection, ResultSet};
pub use db::Db;
pub use driver::DbDriver;
pub use dsn::{DataSource, Dsn, Mysql, MysqlSocket, Sqlite, SqliteMemory};
pub use error::{DbalError, Result};
pub use row::{ColumnMap, FetchStyle, FetchedRow, Record};
pub use value::{BindKind, Binding, Params, Value};
