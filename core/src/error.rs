use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbalError {
    /// 底层驱动返回的错误，原样携带驱动的消息和 SQLSTATE 代码
    #[error("Database error: {message}")]
    Driver {
        message: String,
        code: Option<String>,
        #[source]
        source: sqlx::Error,
    },
    #[error("Illegal fetch style: {0}")]
    InvalidFetchStyle(String),
    /// 绑定值的类型不在 integer / boolean / NULL / string 之内
    #[error("Illegal data type for key '{key}', data type given '{observed}'")]
    InvalidDataType { key: String, observed: String },
    /// update 的 data 与子查询参数使用了同一个参数名
    #[error("Parameter key collision, key '{key}' exists in data and sub query parameters")]
    ParameterKeyCollision { key: String },
    #[error("Invalid named parameter: {0}")]
    InvalidNamedParameter(String),
    #[error("Invalid DSN: {0}")]
    InvalidDsn(String),
    /// 连接已经关闭
    #[error("Connection is closed")]
    ConnectionClosed,
}

impl DbalError {
    /// 驱动错误的 SQLSTATE 代码（如果有）
    pub fn code(&self) -> Option<&str> {
        match self {
            DbalError::Driver { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_driver_error(&self) -> bool {
        matches!(self, DbalError::Driver { .. })
    }
}

impl From<sqlx::Error> for DbalError {
    fn from(err: sqlx::Error) -> Self {
        let (message, code) = match &err {
            sqlx::Error::Database(db_err) => (
                db_err.message().to_string(),
                db_err.code().map(|c| c.into_owned()),
            ),
            other => (other.to_string(), None),
        };
        DbalError::Driver {
            message,
            code,
            source: err,
        }
    }
}

// `FetchStyle` 自身转换为 `FetchStyle` 时的错误类型
impl From<std::convert::Infallible> for DbalError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

pub type Result<T> = std::result::Result<T, DbalError>;
