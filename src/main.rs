// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 静态文件服务器
//!
//! 把一个本地目录通过 HTTP/1.1 只读地发布出去：
//! - 普通文件按块流式传输，支持 keep-alive
//! - 目录生成 HTML 列表
//! - 路径清洗，拒绝目录穿越与隐藏文件
//!
//! 用法：`fileserver [配置文件路径]`，默认读取 `config/development.toml`。

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    path::PathBuf,
    sync::Arc,
};

use fileserver::{server, Config, Dispatcher};
use log::{error, info, LevelFilter};
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
};
use tokio::{net::TcpListener, runtime::Builder};

const CONFIG_PATH: &str = "config/development.toml";
const LOG_CONFIG_PATH: &str = "config/log4rs.yaml";

/// # 程序入口点
///
/// 初始化日志、加载配置、构建运行时并启动主事件循环。
fn main() {
    init_logger();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_PATH.to_string());
    let config = Config::from_toml(&config_path);
    info!("配置文件已载入");

    // 文档根目录必须在启动时存在，规范化之后才交给分发器
    let root: PathBuf = match std::fs::canonicalize(config.www_root()) {
        Ok(root) if root.is_dir() => root,
        Ok(root) => {
            error!("www root {} 不是目录", root.display());
            std::process::exit(1);
        }
        Err(e) => {
            error!("无法访问www root {}：{}", config.www_root(), e);
            std::process::exit(1);
        }
    };
    info!("www root: {}", root.display());
    let config = config.with_www_root(&root.to_string_lossy());

    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .max_blocking_threads(config.blocking_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法构建异步运行时：{}", e);
            std::process::exit(1);
        }
    };

    let dispatcher = Arc::new(Dispatcher::new(root, config.chunk_size()));
    let config = Arc::new(config);

    runtime.block_on(async move {
        let port = config.port();
        let address = match config.local() {
            true => Ipv4Addr::new(127, 0, 0, 1),
            false => Ipv4Addr::new(0, 0, 0, 0),
        };
        let socket = SocketAddrV4::new(address, port);

        let listener = match TcpListener::bind(socket).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("无法绑定端口：{}，错误：{}", port, e);
                std::process::exit(1);
            }
        };
        info!("服务端将在{}上监听Socket连接", socket);

        server::run(listener, dispatcher, config, shutdown_signal()).await;
    });
    info!("服务器已关闭");
}

/// 优先使用 YAML 日志配置；文件缺失时退回到控制台输出。
fn init_logger() {
    if log4rs::init_file(LOG_CONFIG_PATH, Default::default()).is_ok() {
        return;
    }

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {m}{n}",
        )))
        .build();
    let fallback = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info));
    match fallback {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!("无法初始化日志系统：{}", e);
            }
        }
        Err(e) => eprintln!("无法构建日志配置：{}", e),
    }
}

/// Ctrl-C 触发停机。无法注册信号处理器时永不触发。
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("收到Ctrl-C，停止接受新连接"),
        Err(e) => {
            error!("无法监听Ctrl-C信号：{}", e);
            std::future::pending::<()>().await
        }
    }
}
