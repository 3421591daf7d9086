//! # 响应描述
//!
//! 分发器为每个请求生成恰好一个 `Response`，传输层把它写出后即丢弃。
//! 响应体是一个封闭的枚举：空、内存中的字节、或一个待分块传输的文件区间。

use bytes::{BufMut, Bytes, BytesMut};
use log::warn;

use crate::{
    exception::ErrorKind,
    param::{CRLF, HTML_MIME, STATUS_CODES},
    streamer::FileRegion,
    util::HtmlBuilder,
};

#[derive(Debug)]
pub enum ResponseBody {
    Empty,
    InMemory(Bytes),
    FileRegion(FileRegion),
}

#[derive(Debug)]
pub struct Response {
    status_code: u16,
    information: String,
    /// 有序，键大小写不敏感地唯一
    headers: Vec<(String, String)>,
    body: ResponseBody,
    close_connection: bool,
}

impl Response {
    pub fn new(status_code: u16) -> Self {
        let information = match STATUS_CODES.get(&status_code) {
            Some(info) => info.to_string(),
            None => {
                warn!("未登记的状态码：{}", status_code);
                "Unknown".to_string()
            }
        };
        Self {
            status_code,
            information,
            headers: Vec::new(),
            body: ResponseBody::Empty,
            close_connection: true,
        }
    }

    /// 错误响应：简短的 HTML 页面，总是关闭连接。
    pub fn error(kind: ErrorKind) -> Self {
        let code = kind.status_code();
        let html = HtmlBuilder::from_status_code(code).build();
        let mut response = Self::new(code);
        response.set_header("Content-Type", HTML_MIME);
        response.set_header("Connection", "close");
        response.body = ResponseBody::InMemory(Bytes::from(html));
        response
    }

    /// 302 重定向，总是关闭连接。
    pub fn redirect(location: &str) -> Self {
        let mut response = Self::new(302);
        response.set_header("Location", location);
        response.set_header("Connection", "close");
        response
    }

    /// 目录列表，无论客户端是否要求 keep-alive 都关闭连接。
    pub fn listing(html: String) -> Self {
        let mut response = Self::new(200);
        response.set_header("Content-Type", HTML_MIME);
        response.set_header("Connection", "close");
        response.body = ResponseBody::InMemory(Bytes::from(html));
        response
    }

    /// 文件响应。只有客户端要求 keep-alive 时才保持连接。
    pub fn file(region: FileRegion, mime: &str, keep_alive: bool) -> Self {
        let mut response = Self::new(200);
        response.set_header("Content-Length", &region.length().to_string());
        response.set_header("Content-Type", mime);
        response.set_header("Connection", if keep_alive { "keep-alive" } else { "close" });
        response.body = ResponseBody::FileRegion(region);
        response.close_connection = !keep_alive;
        response
    }

    /// 设置标头。同名（大小写不敏感）标头已存在时原位替换，保持插入顺序。
    pub fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// 响应体长度。文件区间的长度在打开文件时已经确定。
    pub fn content_length(&self) -> u64 {
        match &self.body {
            ResponseBody::Empty => 0,
            ResponseBody::InMemory(bytes) => bytes.len() as u64,
            ResponseBody::FileRegion(region) => region.length(),
        }
    }

    /// 序列化状态行与标头（含结尾空行）。缺少 `Content-Length` 时按响应体补上。
    pub fn head_bytes(&self) -> Bytes {
        let mut head = BytesMut::with_capacity(256);
        head.put_slice(format!("HTTP/1.1 {} {}{}", self.status_code, self.information, CRLF).as_bytes());
        if self.header("Content-Length").is_none() {
            head.put_slice(format!("Content-Length: {}{}", self.content_length(), CRLF).as_bytes());
        }
        for (name, value) in &self.headers {
            head.put_slice(format!("{}: {}{}", name, value, CRLF).as_bytes());
        }
        head.put_slice(CRLF.as_bytes());
        head.freeze()
    }

    /// 交出响应体，供传输层写出。
    pub fn into_body(self) -> ResponseBody {
        self.body
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// 响应写出之后是否关闭连接。
    pub fn close_connection(&self) -> bool {
        self.close_connection
    }
}
