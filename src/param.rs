// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与全局静态表
//!
//! 该模块集中存放文件服务器在启动后即不再变化的进程级数据：
//! - HTTP 状态码及其原因短语（Reason Phrase）。
//! - 文件后缀名到 MIME 类型的映射表。
//! - URI 安全检查与目录列表文件名过滤所使用的正则表达式。
//! - HTTP 方法与版本的强类型枚举。
//!
//! 这些表只在首次访问时初始化一次，之后被所有连接只读共享，不需要任何同步手段。

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 文件分块传输时每一块的默认大小
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// 无法识别后缀时使用的兜底 MIME 类型
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// 目录列表与错误页面使用的 MIME 类型
pub const HTML_MIME: &str = "text/html;charset=utf-8";

lazy_static! {
    /// 含有这些字符的 URI 被视为不安全（可能用于标记注入），一律拒绝。
    pub static ref INSECURE_URI: Regex = Regex::new(r#"[<>&"]"#).unwrap();

    /// 目录列表中允许展示的文件名。不匹配的条目会被静默跳过。
    pub static ref ALLOWED_FILE_NAME: Regex = Regex::new(r"^[A-Za-z0-9][-_A-Za-z0-9.]*$").unwrap();
}

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(200, "OK");
        map.insert(301, "Moved Permanently");
        map.insert(302, "Found");
        map.insert(304, "Not Modified");
        map.insert(400, "Bad Request");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(408, "Request Timeout");
        map.insert(413, "Content Too Large");
        map.insert(500, "Internal Server Error");
        map.insert(501, "Not Implemented");
        map.insert(505, "HTTP Version Not Supported");
        map
    };
}

lazy_static! {
    /// 文件后缀名（小写）到 MIME 类型的映射表。
    ///
    /// 用于设置文件响应的 `Content-Type` 字段；查不到时使用 [`FALLBACK_MIME`]。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("aac", "audio/aac");
        map.insert("avi", "video/x-msvideo");
        map.insert("avif", "image/avif");
        map.insert("bin", "application/octet-stream");
        map.insert("bmp", "image/bmp");
        map.insert("bz2", "application/x-bzip2");
        map.insert("css", "text/css;charset=utf-8");
        map.insert("csv", "text/csv");
        map.insert("doc", "application/msword");
        map.insert("epub", "application/epub+zip");
        map.insert("gif", "image/gif");
        map.insert("gz", "application/gzip");
        map.insert("htm", "text/html;charset=utf-8");
        map.insert("html", "text/html;charset=utf-8");
        map.insert("ico", "image/x-icon");
        map.insert("iso", "application/x-iso9660-image");
        map.insert("jar", "application/java-archive");
        map.insert("jpeg", "image/jpeg");
        map.insert("jpg", "image/jpeg");
        map.insert("js", "text/javascript;charset=utf-8");
        map.insert("json", "application/json");
        map.insert("md", "text/markdown;charset=utf-8");
        map.insert("mjs", "text/javascript;charset=utf-8");
        map.insert("mkv", "video/x-matroska");
        map.insert("mp3", "audio/mpeg");
        map.insert("mp4", "video/mp4");
        map.insert("ogg", "audio/ogg");
        map.insert("otf", "font/otf");
        map.insert("pdf", "application/pdf");
        map.insert("png", "image/png");
        map.insert("rar", "application/vnd.rar");
        map.insert("sh", "application/x-sh");
        map.insert("svg", "image/svg+xml");
        map.insert("tar", "application/x-tar");
        map.insert("tif", "image/tiff");
        map.insert("tiff", "image/tiff");
        map.insert("ttf", "font/ttf");
        map.insert("txt", "text/plain");
        map.insert("wasm", "application/wasm");
        map.insert("wav", "audio/wav");
        map.insert("webm", "video/webm");
        map.insert("webp", "image/webp");
        map.insert("woff", "font/woff");
        map.insert("woff2", "font/woff2");
        map.insert("xml", "text/xml");
        map.insert("zip", "application/zip");
        map.insert("7z", "application/x-7z-compressed");
        map
    };
}

/// 支持的 HTTP 协议版本
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpVersion {
    /// HTTP/1.0 版本，默认不保持连接
    V1_0,
    /// HTTP/1.1 版本，默认保持连接
    V1_1,
}

/// HTTP 请求方法
///
/// 服务器只处理 `Get`，其余方法仍需被识别出来，以便回应 405 而不是 400。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpRequestMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
    Trace,
    Connect,
    /// 语法合法但不认识的扩展方法
    Extension,
}

impl HttpRequestMethod {
    /// 按请求行中的方法名识别。方法名区分大小写（RFC 9110 §9.1）。
    pub fn from_token(token: &str) -> Option<Self> {
        let method = match token {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "OPTIONS" => Self::Options,
            "PATCH" => Self::Patch,
            "TRACE" => Self::Trace,
            "CONNECT" => Self::Connect,
            _ if !token.is_empty() && token.bytes().all(is_tchar) => Self::Extension,
            _ => return None,
        };
        Some(method)
    }
}

/// RFC 9110 §5.6.2 中 `token` 允许的字符
fn is_tchar(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

impl fmt::Display for HttpVersion {
    /// 将枚举格式化为 HTTP 报文中的版本字符串
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpVersion::V1_0 => write!(f, "1.0"),
            HttpVersion::V1_1 => write!(f, "1.1"),
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    /// 将枚举格式化为 HTTP 标准大写方法名
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            HttpRequestMethod::Get => "GET",
            HttpRequestMethod::Head => "HEAD",
            HttpRequestMethod::Post => "POST",
            HttpRequestMethod::Put => "PUT",
            HttpRequestMethod::Delete => "DELETE",
            HttpRequestMethod::Options => "OPTIONS",
            HttpRequestMethod::Patch => "PATCH",
            HttpRequestMethod::Trace => "TRACE",
            HttpRequestMethod::Connect => "CONNECT",
            HttpRequestMethod::Extension => "EXTENSION",
        };
        write!(f, "{}", name)
    }
}
