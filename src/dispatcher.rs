// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求分发器
//!
//! 文件服务器里唯一带分支逻辑的部分。对每个解码后的请求，按顺序检查：
//!
//! 1. 请求解码失败 → 400
//! 2. 方法不是 GET → 405
//! 3. 路径清洗失败 → 403（百分号编码本身不合法时为 400）
//! 4. 资源不存在或是隐藏文件 → 404
//! 5. 资源是目录：路径不以 `/` 结尾时 302 重定向到加上 `/` 的地址，否则返回目录列表
//! 6. 资源既不是目录也不是普通文件 → 403
//! 7. 否则返回文件内容
//!
//! 每条路径都恰好产生一个 `Response`，失败在这里被转换为错误响应，不会继续向上传播。

use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use log::{debug, warn};

use crate::{
    exception::Exception,
    listing::render_listing,
    param::HttpRequestMethod,
    request::Request,
    resolver::Resource,
    response::Response,
    sanitizer::sanitize_uri,
    streamer::{mime_type, open_region},
};

/// 持有文档根目录与分块大小，在所有连接之间只读共享。
#[derive(Debug, Clone)]
pub struct Dispatcher {
    root: PathBuf,
    chunk_size: usize,
}

impl Dispatcher {
    pub fn new(root: PathBuf, chunk_size: usize) -> Self {
        Self { root, chunk_size }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 处理一个请求，总是返回一个响应。
    pub async fn dispatch(&self, request: &Request, id: u128) -> Response {
        match self.route(request, id).await {
            Ok(response) => response,
            Err(e) => {
                warn!("[ID{}]请求{}被拒绝：{}", id, request.uri(), e);
                Response::error(e.error_kind())
            }
        }
    }

    async fn route(&self, request: &Request, id: u128) -> Result<Response, Exception> {
        if !request.decode_success() {
            return Err(Exception::RequestDecodeFailed);
        }
        if request.method() != HttpRequestMethod::Get {
            return Err(Exception::UnsupportedMethod);
        }

        let path = request.path();
        let sanitized = sanitize_uri(path)?;
        let resource = Resource::resolve(&self.root, &sanitized).await;
        debug!("[ID{}]映射物理路径：{}", id, resource.path().display());

        if resource.is_hidden() || !resource.exists() {
            return Err(Exception::ResourceAbsent);
        }

        if resource.is_dir() {
            if !path.ends_with('/') {
                let location = format!("{}/{}", path, request.query());
                debug!("[ID{}]目录缺少末尾的/，重定向到{}", id, location);
                return Ok(Response::redirect(&location));
            }
            let title = sanitized.as_str().replace(MAIN_SEPARATOR, "/");
            let html = render_listing(resource.path(), &title, path).await?;
            return Ok(Response::listing(html));
        }

        if !resource.is_file() {
            return Err(Exception::ResourceKindUnsupported);
        }

        let region = open_region(&resource, self.chunk_size).await?;
        Ok(Response::file(
            region,
            mime_type(resource.path()),
            request.keep_alive(),
        ))
    }
}
