// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 传输层
//!
//! 接受 TCP 连接，并在每个连接上顺序处理请求：
//! 读取请求头 → 解析为 `Request` → 交给分发器 → 写出响应 → 决定是否继续保持连接。
//!
//! 每个连接运行在独立的 tokio 任务上，连接之间除只读配置外不共享任何可变状态。

use std::future::Future;
use std::io;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Instant;

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpListener,
    time::timeout,
};

use crate::{
    config::Config,
    dispatcher::Dispatcher,
    exception::Exception,
    request::Request,
    response::{Response, ResponseBody},
    streamer::{send_region, LoggingListener},
};

/// 读取请求头的结果
#[derive(Debug, PartialEq)]
enum RequestHead {
    /// 到空行为止的完整请求头
    Complete(Vec<u8>),
    /// 请求头超过了允许的大小
    TooLarge,
    /// 对端在发送完整请求头之前关闭了连接
    Closed,
}

/// # 主事件循环 (Accept Loop)
///
/// 持续接收新连接并为每个连接派生一个任务，直到 `shutdown` 完成。
/// 停机时不再接受新连接，已经建立的连接在各自的任务中自然结束。
pub async fn run<F>(listener: TcpListener, dispatcher: Arc<Dispatcher>, config: Arc<Config>, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let active_connection = Arc::new(AtomicUsize::new(0));
    let mut id: u128 = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("主循环接收到停机指令，正在退出...");
                break;
            }
            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!("接受连接时遇到错误：{}", e);
                        continue;
                    }
                };
                debug!("[ID{}]新的连接：{}", id, addr);

                let dispatcher = Arc::clone(&dispatcher);
                let config = Arc::clone(&config);
                let active_connection = Arc::clone(&active_connection);
                tokio::spawn(async move {
                    let active = active_connection.fetch_add(1, Ordering::SeqCst) + 1;
                    debug!("[ID{}]当前活跃连接数：{}", id, active);

                    handle_connection(stream, id, dispatcher, config).await;

                    active_connection.fetch_sub(1, Ordering::SeqCst);
                    debug!("[ID{}]连接已关闭", id);
                });
                id += 1;
            }
        }
    }
}

/// # 连接处理器
///
/// 在一个连接上顺序处理请求。以下情况结束连接：
/// - 响应要求关闭连接（错误、重定向、目录列表，或客户端未要求 keep-alive 的文件）；
/// - 对端关闭连接，或写出过程中出错（此时正在传输的文件直接放弃）；
/// - 在 `keep_alive_timeout` 内没有收到下一个请求。
pub async fn handle_connection<S>(stream: S, id: u128, dispatcher: Arc<Dispatcher>, config: Arc<Config>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);

    loop {
        let head = match timeout(
            config.keep_alive_timeout(),
            read_request_head(&mut reader, config.max_header_size()),
        )
        .await
        {
            Ok(Ok(head)) => head,
            Ok(Err(e)) => {
                debug!("[ID{}]读取请求头时遇到错误：{}", id, e);
                break;
            }
            Err(_) => {
                debug!("[ID{}]连接空闲超时", id);
                break;
            }
        };

        let start_time = Instant::now();
        let request = match head {
            RequestHead::Closed => break,
            RequestHead::TooLarge => {
                warn!("[ID{}]请求头超过{}字节", id, config.max_header_size());
                Request::decode_failed()
            }
            RequestHead::Complete(bytes) => {
                let request = Request::parse(&bytes, id);
                if request.content_length() > config.max_content_length() {
                    warn!("[ID{}]请求体过大：{}字节", id, request.content_length());
                    Request::decode_failed()
                } else {
                    if request.content_length() > 0 {
                        let mut body = (&mut reader).take(request.content_length());
                        let mut sink = tokio::io::sink();
                        let discard = tokio::io::copy(&mut body, &mut sink);
                        match timeout(config.keep_alive_timeout(), discard).await {
                            Ok(Ok(n)) if n == request.content_length() => {}
                            Ok(Ok(_)) => {
                                debug!("[ID{}]请求体未发送完整，连接已关闭", id);
                                break;
                            }
                            Ok(Err(e)) => {
                                debug!("[ID{}]丢弃请求体时遇到错误：{}", id, e);
                                break;
                            }
                            Err(_) => {
                                debug!("[ID{}]等待请求体超时", id);
                                break;
                            }
                        }
                    }
                    request
                }
            }
        };

        let response = dispatch_isolated(&dispatcher, &request, id).await;
        debug!(
            "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
            id,
            start_time.elapsed().as_millis()
        );

        info!(
            "[ID{}] {}, {}, {}, {}, {}, {}",
            id,
            request.version(),
            request.path(),
            request.method(),
            response.status_code(),
            response.information(),
            request.user_agent(),
        );

        let close = response.close_connection();
        if let Err(e) = write_response(&mut writer, response, id).await {
            warn!("[ID{}]写出响应时连接中断：{}", id, e);
            break;
        }
        if close {
            break;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("[ID{}]关闭连接时遇到错误：{}", id, e);
    }
}

/// 在独立任务中运行分发器。分发过程中的 panic 不会波及连接，而是回应 500。
async fn dispatch_isolated(dispatcher: &Arc<Dispatcher>, request: &Request, id: u128) -> Response {
    let dispatcher = Arc::clone(dispatcher);
    let request = request.clone();
    isolate(async move { dispatcher.dispatch(&request, id).await }, id).await
}

async fn isolate<F>(task: F, id: u128) -> Response
where
    F: Future<Output = Response> + Send + 'static,
{
    match tokio::spawn(task).await {
        Ok(response) => response,
        Err(e) => {
            error!("[ID{}]处理请求时发生未知异常：{}", id, e);
            Response::error(Exception::Internal.error_kind())
        }
    }
}

/// 读取一个请求头，直到空行为止。请求行之前的空行会被忽略。
async fn read_request_head<R>(reader: &mut R, max_header_size: usize) -> io::Result<RequestHead>
where
    R: AsyncBufRead + Unpin,
{
    let mut head = Vec::new();
    loop {
        let start = head.len();
        let limit = (max_header_size + 1 - start.min(max_header_size)) as u64;
        let n = (&mut *reader).take(limit).read_until(b'\n', &mut head).await?;
        if n == 0 {
            return Ok(RequestHead::Closed);
        }

        let line = &head[start..];
        let is_blank = line == b"\r\n" || line == b"\n";
        if is_blank && start == 0 {
            head.clear();
            continue;
        }
        if is_blank {
            return Ok(RequestHead::Complete(head));
        }
        if head.len() > max_header_size {
            return Ok(RequestHead::TooLarge);
        }
    }
}

/// 写出一个响应：先写状态行与标头，再按响应体类型写出内容。
///
/// 文件响应按块写出，每块都等待传输层接受之后才读取下一块。
pub async fn write_response<W>(writer: &mut W, response: Response, id: u128) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&response.head_bytes()).await?;
    match response.into_body() {
        ResponseBody::Empty => {}
        ResponseBody::InMemory(bytes) => writer.write_all(&bytes).await?,
        ResponseBody::FileRegion(region) => {
            debug!("[ID{}]开始分块传输，文件大小: {} bytes", id, region.length());
            let mut listener = LoggingListener::new(id);
            send_region(writer, region, &mut listener).await?;
        }
    }
    writer.flush().await
}
