//! 命名占位符改写
//!
//! 把 SQL 中的 `:name` 改写成位置占位符 `?`，并按出现顺序记录参数名。
//! 字符串字面量、带引号的标识符和注释中的内容原样保留。

use crate::driver::DbDriver;
use crate::utils::is_param_char;

/// 改写后的 SQL 与占位符顺序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSql {
    sql: String,
    names: Vec<String>,
}

impl NamedSql {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// 每个 `?` 对应的参数名（不带 `:`），同名参数可以出现多次
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[derive(Clone, Copy, PartialEq)]
enum State {
    Normal,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// 改写命名占位符
///
/// MySQL 字符串中的反斜杠会转义下一个字符；SQLite 没有这种转义。
pub fn rewrite_named(sql: &str, driver: DbDriver) -> NamedSql {
    let backslash_escapes = driver == DbDriver::MySql;
    let mut result = String::with_capacity(sql.len());
    let mut names = Vec::new();
    let mut state = State::Normal;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            State::Normal => match ch {
                '\'' | '"' | '`' => {
                    state = State::Quoted(ch);
                    result.push(ch);
                }
                '-' if chars.peek() == Some(&'-') => {
                    state = State::LineComment;
                    result.push(ch);
                }
                '#' if driver == DbDriver::MySql => {
                    state = State::LineComment;
                    result.push(ch);
                }
                '/' if chars.peek() == Some(&'*') => {
                    state = State::BlockComment;
                    result.push(ch);
                    result.push('*');
                    chars.next();
                }
                ':' => match chars.peek() {
                    // `::` 不是占位符
                    Some(':') => {
                        result.push_str("::");
                        chars.next();
                    }
                    Some(&c) if c.is_ascii_alphabetic() || c == '_' => {
                        let mut name = String::new();
                        while let Some(&c) = chars.peek() {
                            if !is_param_char(c) {
                                break;
                            }
                            name.push(c);
                            chars.next();
                        }
                        result.push('?');
                        names.push(name);
                    }
                    _ => result.push(ch),
                },
                _ => result.push(ch),
            },
            State::Quoted(quote) => {
                result.push(ch);
                if ch == '\\' && backslash_escapes && quote != '`' {
                    if let Some(next) = chars.next() {
                        result.push(next);
                    }
                } else if ch == quote {
                    // 连续两个引号是转义，状态切换两次后仍在字面量内
                    state = State::Normal;
                }
            }
            State::LineComment => {
                result.push(ch);
                if ch == '\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                result.push(ch);
                if ch == '*' && chars.peek() == Some(&'/') {
                    result.push('/');
                    chars.next();
                    state = State::Normal;
                }
            }
        }
    }

    NamedSql {
        sql: result,
        names,
    }
}
