//! 工具函数模块

/// 参数名前缀（绑定标记）
pub const PARAM_MARKER: char = ':';

/// 去掉参数名前面的一个绑定标记：`":id"` 和 `"id"` 都得到 `"id"`
pub fn normalize_param_key(key: &str) -> &str {
    key.strip_prefix(PARAM_MARKER).unwrap_or(key)
}

/// 验证参数名是否合法：`[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(is_param_char)
}

/// 参数名中允许出现的字符
pub fn is_param_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_param_key() {
        assert_eq!(normalize_param_key(":id"), "id");
        assert_eq!(normalize_param_key("id"), "id");
        // 只去掉一个标记
        assert_eq!(normalize_param_key("::id"), ":id");
    }

    #[test]
    fn test_is_valid_param_name() {
        assert!(is_valid_param_name("id"));
        assert!(is_valid_param_name("_created_at"));
        assert!(is_valid_param_name("title2"));
        assert!(!is_valid_param_name(""));
        assert!(!is_valid_param_name("0"));
        assert!(!is_valid_param_name("some data"));
        assert!(!is_valid_param_name(":id"));
    }
}
