use num_cpus;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::fs;
use std::time::Duration;

use crate::param::DEFAULT_CHUNK_SIZE;

/// 服务器的启动配置。启动后只读，由所有连接共享。
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_www_root")]
    www_root: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_local")]
    local: bool,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_blocking_threads")]
    blocking_threads: usize,
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,
    #[serde(default = "default_max_header_size")]
    max_header_size: usize,
    #[serde(default = "default_max_content_length")]
    max_content_length: u64,
    #[serde(default = "default_keep_alive_timeout")]
    keep_alive_timeout: u64,
}

fn default_www_root() -> String {
    ".".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_local() -> bool {
    true
}

fn default_blocking_threads() -> usize {
    64
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_max_header_size() -> usize {
    8192
}

fn default_max_content_length() -> u64 {
    65536
}

fn default_keep_alive_timeout() -> u64 {
    60
}

impl Config {
    pub fn new() -> Self {
        Self {
            www_root: default_www_root(),
            port: default_port(),
            local: default_local(),
            worker_threads: num_cpus::get(),
            blocking_threads: default_blocking_threads(),
            chunk_size: default_chunk_size(),
            max_header_size: default_max_header_size(),
            max_content_length: default_max_content_length(),
            keep_alive_timeout: default_keep_alive_timeout(),
        }
    }

    /// 从 TOML 文件读取配置。文件缺失或格式错误时记录日志并使用默认配置。
    pub fn from_toml(filename: &str) -> Self {
        let str_val = match fs::read_to_string(filename) {
            Ok(s) => s,
            Err(e) => {
                error!("无法读取配置文件{}：{}，使用默认配置", filename, e);
                return Config::new();
            }
        };
        Self::from_toml_str(&str_val)
    }

    pub fn from_toml_str(str_val: &str) -> Self {
        let mut raw_config: Config = match toml::from_str(str_val) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象：{}，使用默认配置", e);
                Config::new()
            }
        };
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.blocking_threads == 0 {
            warn!("blocking_threads被设置为0，文件读取需要至少一个阻塞线程，因此该值将被改为1。");
            raw_config.blocking_threads = 1;
        }
        if raw_config.chunk_size == 0 {
            warn!("chunk_size被设置为0，该值将被改为{}。", DEFAULT_CHUNK_SIZE);
            raw_config.chunk_size = DEFAULT_CHUNK_SIZE;
        }
        raw_config
    }

    /// 替换文档根目录，启动时用规范化后的绝对路径覆盖配置中的原始值。
    pub fn with_www_root(mut self, www_root: &str) -> Self {
        self.www_root = www_root.to_string();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn www_root(&self) -> &str {
        &self.www_root
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn blocking_threads(&self) -> usize {
        self.blocking_threads
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn max_header_size(&self) -> usize {
        self.max_header_size
    }

    pub fn max_content_length(&self) -> u64 {
        self.max_content_length
    }

    pub fn keep_alive_timeout(&self) -> Duration {
        Duration::from_secs(self.keep_alive_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.port(), 8080);
        assert_eq!(config.chunk_size(), 8192);
        assert_eq!(config.www_root(), ".");
        assert!(config.local());
        assert!(config.worker_threads() > 0);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml_str("www_root = \"/srv/files\"\nport = 9000\n");
        assert_eq!(config.www_root(), "/srv/files");
        assert_eq!(config.port(), 9000);
        assert_eq!(config.chunk_size(), 8192);
        assert_eq!(config.keep_alive_timeout(), Duration::from_secs(60));
        assert!(config.worker_threads() > 0);
    }

    #[test]
    fn test_invalid_toml_falls_back() {
        let config = Config::from_toml_str("port = \"not a number\"");
        assert_eq!(config.port(), 8080);
    }

    #[test]
    fn test_zero_values_are_corrected() {
        let config = Config::from_toml_str("chunk_size = 0\nblocking_threads = 0\n");
        assert_eq!(config.chunk_size(), DEFAULT_CHUNK_SIZE);
        assert_eq!(config.blocking_threads(), 1);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = Config::from_toml("config/does-not-exist.toml");
        assert_eq!(config.port(), 8080);
    }
}
