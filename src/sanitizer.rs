// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # URI 清洗模块
//!
//! 把请求 URI 的路径部分解码并校验为一个可以安全拼接到文档根目录下的相对路径。
//! 这是防御目录遍历与标记注入的唯一关口，分发器在访问文件系统之前必须先经过这里。
//!
//! 清洗是纯函数，并且是幂等的：把一个已经清洗过的路径再送进来，得到的是同一个路径。

use std::fmt;
use std::path::MAIN_SEPARATOR;

use percent_encoding::percent_decode_str;

use crate::{exception::Exception, param::INSECURE_URI};

/// 通过校验的路径：以分隔符开头，不含遍历片段、隐藏片段与不安全字符。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedPath(String);

impl SanitizedPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 去掉前导分隔符后的部分，用于与文档根目录拼接。根路径返回空串。
    pub fn relative(&self) -> &str {
        self.0.trim_start_matches(MAIN_SEPARATOR)
    }
}

impl fmt::Display for SanitizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 解码并校验 URI 路径。
///
/// # 逻辑步骤
/// 1. 百分号解码：优先按 UTF-8；结果不是合法 UTF-8 时按 ISO-8859-1 逐字节解释，
///    兼容那些不按 UTF-8 编码 URI 的客户端。转义序列本身不合法时返回 `MalformedUri`。
/// 2. 解码结果必须以 `/` 开头。
/// 3. 把 `/` 换成平台路径分隔符。
/// 4. 拒绝包含 `分隔符.`、`.分隔符`，以 `.` 开头或结尾，或含有 `< > & "` 的路径。
///    还拒绝 `%`（保证再次解码不会改变路径）、NUL 与反斜杠。
pub fn sanitize_uri(raw_uri: &str) -> Result<SanitizedPath, Exception> {
    let decoded = decode_uri(raw_uri)?;

    if !decoded.starts_with('/') {
        return Err(Exception::PathRejected);
    }
    if decoded.contains(|c: char| matches!(c, '%' | '\0' | '\\')) {
        return Err(Exception::PathRejected);
    }

    let path = decoded.replace('/', &MAIN_SEPARATOR.to_string());
    let dot_after_separator = format!("{}.", MAIN_SEPARATOR);
    let dot_before_separator = format!(".{}", MAIN_SEPARATOR);
    if path.contains(&dot_after_separator)
        || path.contains(&dot_before_separator)
        || path.starts_with('.')
        || path.ends_with('.')
        || INSECURE_URI.is_match(&path)
    {
        return Err(Exception::PathRejected);
    }

    Ok(SanitizedPath(path))
}

/// 严格的百分号解码。
fn decode_uri(raw_uri: &str) -> Result<String, Exception> {
    if !has_valid_escapes(raw_uri) {
        return Err(Exception::MalformedUri);
    }
    match percent_decode_str(raw_uri).decode_utf8() {
        Ok(decoded) => Ok(decoded.into_owned()),
        // ISO-8859-1 的每个字节恰好对应同值的 Unicode 码位，因此这一步不会失败
        Err(_) => Ok(percent_decode_str(raw_uri).map(char::from).collect()),
    }
}

/// 每个 `%` 后面都必须紧跟两位十六进制数字。
fn has_valid_escapes(raw_uri: &str) -> bool {
    let bytes = raw_uri.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sep(path: &str) -> String {
        path.replace('/', &MAIN_SEPARATOR.to_string())
    }

    #[test]
    fn test_plain_paths_pass() {
        assert_eq!(sanitize_uri("/").unwrap().as_str(), sep("/"));
        assert_eq!(sanitize_uri("/docs/readme.txt").unwrap().as_str(), sep("/docs/readme.txt"));
        assert_eq!(sanitize_uri("/dir/").unwrap().as_str(), sep("/dir/"));
    }

    #[test]
    fn test_relative_strips_root() {
        assert_eq!(sanitize_uri("/").unwrap().relative(), "");
        assert_eq!(sanitize_uri("/a/b.txt").unwrap().relative(), sep("a/b.txt"));
    }

    #[test]
    fn test_percent_decoding() {
        assert_eq!(sanitize_uri("/a%20b.txt").unwrap().as_str(), sep("/a b.txt"));
        assert_eq!(sanitize_uri("/%E4%B8%AD.txt").unwrap().as_str(), sep("/中.txt"));
    }

    /// 非 UTF-8 的字节按 ISO-8859-1 解释
    #[test]
    fn test_latin1_fallback() {
        assert_eq!(sanitize_uri("/caf%E9").unwrap().as_str(), sep("/café"));
    }

    #[test]
    fn test_malformed_escapes() {
        for uri in ["/a%zz", "/a%4", "/%", "/a%g1"] {
            assert_eq!(sanitize_uri(uri), Err(Exception::MalformedUri), "{}", uri);
        }
    }

    #[test]
    fn test_traversal_rejected() {
        for uri in [
            "/../etc/passwd",
            "/a/../../b",
            "/..",
            "/%2e%2e/etc/passwd",
            "/%2E%2E%2Fetc%2Fpasswd",
            "/a/..",
        ] {
            assert_eq!(sanitize_uri(uri), Err(Exception::PathRejected), "{}", uri);
        }
    }

    #[test]
    fn test_dot_segments_rejected() {
        for uri in ["/.git/config", "/a/.hidden", "/name.", "/a./b", "/./a"] {
            assert_eq!(sanitize_uri(uri), Err(Exception::PathRejected), "{}", uri);
        }
    }

    #[test]
    fn test_must_start_with_slash() {
        for uri in ["", "a/b", "*", "http://host/a"] {
            assert_eq!(sanitize_uri(uri), Err(Exception::PathRejected), "{}", uri);
        }
    }

    #[test]
    fn test_insecure_characters_rejected() {
        for uri in ["/a<b", "/%3Cscript%3E", "/a&b", "/a%22b", "/x>y"] {
            assert_eq!(sanitize_uri(uri), Err(Exception::PathRejected), "{}", uri);
        }
    }

    #[test]
    fn test_double_encoding_and_nul_rejected() {
        assert_eq!(sanitize_uri("/a%2541"), Err(Exception::PathRejected));
        assert_eq!(sanitize_uri("/index.html%00.jpg"), Err(Exception::PathRejected));
        assert_eq!(sanitize_uri("/a%5C..%5Cb"), Err(Exception::PathRejected));
    }

    proptest! {
        #[test]
        fn prop_traversal_always_rejected(
            prefix in "(/[a-zA-Z0-9_-]{1,8}){0,3}",
            suffix in "(/[a-zA-Z0-9_-]{1,8}){0,3}",
        ) {
            let uri = format!("{}/..{}", prefix, suffix);
            prop_assert_eq!(sanitize_uri(&uri), Err(Exception::PathRejected));
        }

        #[test]
        fn prop_must_start_with_slash(uri in "[a-zA-Z0-9._~-][a-zA-Z0-9/._~-]{0,24}") {
            prop_assert!(sanitize_uri(&uri).is_err());
        }

        #[test]
        fn prop_sanitize_is_idempotent(uri in "/[a-zA-Z0-9/._ %<>&\"-]{0,32}") {
            if let Ok(first) = sanitize_uri(&uri) {
                let second = sanitize_uri(&first.as_str().replace(MAIN_SEPARATOR, "/"));
                prop_assert_eq!(second, Ok(first));
            }
        }
    }
}
