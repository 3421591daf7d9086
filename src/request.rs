// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求头解析模块
//!
//! 该模块属于传输层：它把从 TCP 流中读到的请求头字节解析为 `Request`，
//! 供请求分发器使用。解析失败不会产生错误值，而是得到一个
//! `decode_success() == false` 的请求，由分发器统一回应 400。
//!
//! 解析内容包括：
//! 1. 请求行（方法、URI、版本）。
//! 2. `Connection` 标头，用于推导 keep-alive。
//! 3. `User-Agent` 与 `Content-Length` 标头。

use crate::param::*;
use log::{debug, warn};

/// 一次解码后的 HTTP 请求。每个请求创建一次，之后不再修改。
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP 请求方法
    method: HttpRequestMethod,
    /// 原始请求 URI（包含查询字符串，未做百分号解码）
    uri: String,
    /// HTTP 协议版本
    version: HttpVersion,
    /// 请求头是否被成功解码
    decode_success: bool,
    /// 响应结束后客户端是否希望保持连接
    keep_alive: bool,
    /// 客户端标识字符串
    user_agent: String,
    /// 请求体长度，GET 请求通常为 0
    content_length: u64,
}

impl Request {
    /// 构造一个解码成功的请求，主要供测试与基准使用。
    pub fn new(method: HttpRequestMethod, uri: &str, keep_alive: bool) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            version: HttpVersion::V1_1,
            decode_success: true,
            keep_alive,
            user_agent: String::new(),
            content_length: 0,
        }
    }

    /// 构造一个解码失败的请求。
    pub fn decode_failed() -> Self {
        Self {
            method: HttpRequestMethod::Extension,
            uri: String::new(),
            version: HttpVersion::V1_1,
            decode_success: false,
            keep_alive: false,
            user_agent: String::new(),
            content_length: 0,
        }
    }

    /// 从请求头字节（到空行为止）解析 `Request`。
    ///
    /// # 逻辑步骤
    /// 1. 验证编码：请求头必须是合法的 UTF-8。
    /// 2. 解析请求行：必须恰好由方法、URI、版本三部分组成。
    /// 3. 迭代解析标头：每一行都必须是 `名称: 值` 的形式。
    /// 4. 推导 keep-alive：`close` 优先；HTTP/1.1 默认保持；HTTP/1.0 需显式 `keep-alive`。
    pub fn parse(buffer: &[u8], id: u128) -> Self {
        let request_string = match std::str::from_utf8(buffer) {
            Ok(string) => string,
            Err(_) => {
                warn!("[ID{}]请求头不是合法的UTF-8", id);
                return Self::decode_failed();
            }
        };

        let mut lines = request_string
            .split(CRLF)
            .flat_map(|line| line.split('\n'))
            .skip_while(|line| line.is_empty());

        let request_line = match lines.next() {
            Some(line) => line,
            None => {
                warn!("[ID{}]请求头为空", id);
                return Self::decode_failed();
            }
        };

        let parts: Vec<&str> = request_line.split(' ').collect();
        if parts.len() != 3 || parts[1].is_empty() {
            warn!("[ID{}]HTTP请求行格式不正确：{}", id, request_line);
            return Self::decode_failed();
        }

        let method = match HttpRequestMethod::from_token(parts[0]) {
            Some(m) => m,
            None => {
                warn!("[ID{}]无法识别的HTTP请求方法：{}", id, parts[0]);
                return Self::decode_failed();
            }
        };

        let version = match parts[2] {
            "HTTP/1.1" => HttpVersion::V1_1,
            "HTTP/1.0" => HttpVersion::V1_0,
            other => {
                warn!("[ID{}]不支持的HTTP协议版本：{}", id, other);
                return Self::decode_failed();
            }
        };

        let mut user_agent = String::new();
        let mut connection_close = false;
        let mut connection_keep_alive = false;
        let mut content_length = 0;
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = match line.split_once(':') {
                Some((n, v)) if !n.is_empty() && !n.ends_with(' ') => (n, v.trim()),
                _ => {
                    warn!("[ID{}]非法的请求标头：{}", id, line);
                    return Self::decode_failed();
                }
            };
            if name.eq_ignore_ascii_case("user-agent") {
                user_agent = value.to_string();
            } else if name.eq_ignore_ascii_case("connection") {
                for token in value.split(',').map(str::trim) {
                    if token.eq_ignore_ascii_case("close") {
                        connection_close = true;
                    } else if token.eq_ignore_ascii_case("keep-alive") {
                        connection_keep_alive = true;
                    }
                }
            } else if name.eq_ignore_ascii_case("content-length") {
                content_length = match value.parse::<u64>() {
                    Ok(len) => len,
                    Err(_) => {
                        warn!("[ID{}]非法的Content-Length：{}", id, value);
                        return Self::decode_failed();
                    }
                };
            }
        }

        let keep_alive = if connection_close {
            false
        } else {
            match version {
                HttpVersion::V1_1 => true,
                HttpVersion::V1_0 => connection_keep_alive,
            }
        };
        debug!(
            "[ID{}]请求行解析完毕：{} {} keep-alive={}",
            id, method, parts[1], keep_alive
        );

        Self {
            method,
            uri: parts[1].to_string(),
            version,
            decode_success: true,
            keep_alive,
            user_agent,
            content_length,
        }
    }
}

// --- Getter 访问器实现 ---

impl Request {
    pub fn version(&self) -> &HttpVersion {
        &self.version
    }

    /// 获取原始请求 URI（含查询参数）
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// 获取 URI 的路径部分，去掉查询字符串与片段
    pub fn path(&self) -> &str {
        match self.uri.find(|c: char| c == '?' || c == '#') {
            Some(index) => &self.uri[..index],
            None => &self.uri,
        }
    }

    /// 获取查询字符串（含前导 `?`），没有时为空串
    pub fn query(&self) -> &str {
        let rest = &self.uri[self.path().len()..];
        match rest.find('#') {
            Some(index) => &rest[..index],
            None => rest,
        }
    }

    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    pub fn decode_success(&self) -> bool {
        self.decode_success
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }
}
