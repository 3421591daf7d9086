// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了文件服务器在处理单个请求时可能遇到的各类异常情况，
//! 以及它们到错误响应种类（[`ErrorKind`]）的映射。
//!
//! 所有异常都只作用于当前请求：它们会被转换为一个错误响应，随后连接关闭，不会重试。

use std::fmt;

/// 服务器处理请求过程中发生的异常类型。
///
/// 该枚举通常作为 `Result` 的 `Err` 部分返回，由请求分发器统一转换为错误响应。
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Exception {
    /// 传输层未能把字节流解码为合法的 HTTP 请求头。
    RequestDecodeFailed,
    /// URI 中的百分号编码不合法（例如 `%zz` 或被截断的 `%4`）。
    MalformedUri,
    /// 客户端使用了 GET 以外的方法。
    UnsupportedMethod,
    /// 路径未通过安全检查：目录遍历、隐藏文件、不安全字符或不以 `/` 开头。
    PathRejected,
    /// 资源不存在或是隐藏文件。
    ResourceAbsent,
    /// 资源既不是目录也不是普通文件（设备文件、管道等）。
    ResourceKindUnsupported,
    /// 资源通过了检查，但随后的打开或读取失败（例如文件在此期间被删除）。
    TransferFailure,
    /// 状态机之外的意外失败。
    Internal,
}

/// 错误响应的种类，每种对应一个固定的状态码。
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ErrorKind {
    BadRequest,
    MethodNotAllowed,
    Forbidden,
    NotFound,
    InternalFailure,
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::MethodNotAllowed => 405,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::InternalFailure => 500,
        }
    }
}

impl Exception {
    /// 该异常应当以哪一种错误响应回应客户端。
    ///
    /// `TransferFailure` 被降级为 404：资源确实已经无法提供，而不是服务器出了故障。
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            RequestDecodeFailed | MalformedUri => ErrorKind::BadRequest,
            UnsupportedMethod => ErrorKind::MethodNotAllowed,
            PathRejected | ResourceKindUnsupported => ErrorKind::Forbidden,
            ResourceAbsent | TransferFailure => ErrorKind::NotFound,
            Internal => ErrorKind::InternalFailure,
        }
    }
}

use Exception::*;

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestDecodeFailed => write!(f, "Request head couldn't be decoded"),
            MalformedUri => write!(f, "Malformed percent-encoding in URI"),
            UnsupportedMethod => write!(f, "Unsupported request method"),
            PathRejected => write!(f, "Path rejected by sanitizer"),
            ResourceAbsent => write!(f, "Resource not found or hidden"),
            ResourceKindUnsupported => write!(f, "Resource is neither a file nor a directory"),
            TransferFailure => write!(f, "Resource vanished before it could be read"),
            Internal => write!(f, "Unexpected internal failure"),
        }
    }
}

impl std::error::Error for Exception {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(RequestDecodeFailed.error_kind().status_code(), 400);
        assert_eq!(MalformedUri.error_kind().status_code(), 400);
        assert_eq!(UnsupportedMethod.error_kind().status_code(), 405);
        assert_eq!(PathRejected.error_kind().status_code(), 403);
        assert_eq!(ResourceKindUnsupported.error_kind().status_code(), 403);
        assert_eq!(ResourceAbsent.error_kind().status_code(), 404);
        assert_eq!(TransferFailure.error_kind().status_code(), 404);
        assert_eq!(Internal.error_kind().status_code(), 500);
    }

    #[test]
    fn test_display_does_not_leak_paths() {
        let text = ResourceAbsent.to_string();
        assert!(!text.contains('/'));
    }
}
