//! 把清洗过的路径映射为文件系统元数据。
//!
//! 每个请求都重新查询一次，不做缓存；“不存在”是一个正常的结果而不是错误。

use std::path::{Path, PathBuf};

use log::debug;
use tokio::fs;

use crate::sanitizer::SanitizedPath;

#[derive(Debug, Clone)]
pub struct Resource {
    path: PathBuf,
    exists: bool,
    hidden: bool,
    is_dir: bool,
    is_file: bool,
    len: u64,
}

impl Resource {
    /// 在文档根目录 `root` 下解析 `sanitized`。
    ///
    /// 元数据查询经由 `tokio::fs` 在阻塞线程池中完成，不占用处理网络事件的工作线程。
    /// 查询失败（不存在、无权限）一律视为不存在。
    pub async fn resolve(root: &Path, sanitized: &SanitizedPath) -> Self {
        let relative = sanitized.relative();
        let path = root.join(relative);
        let hidden = is_hidden_name(relative);

        match fs::metadata(&path).await {
            Ok(metadata) => Self {
                path,
                exists: true,
                hidden,
                is_dir: metadata.is_dir(),
                is_file: metadata.is_file(),
                len: metadata.len(),
            },
            Err(e) => {
                debug!("无法获取{}的元数据：{}", path.display(), e);
                Self {
                    path,
                    exists: false,
                    hidden,
                    is_dir: false,
                    is_file: false,
                    len: 0,
                }
            }
        }
    }
}

/// 最后一个路径片段以 `.` 开头即为隐藏文件。文档根目录本身永远不是隐藏的。
///
/// 在 Unix 上，`sanitize_uri` 已经拒绝了所有 `/.` 开头的片段，经过清洗的路径在这里总是得到 `false`；
/// 分发器仍然检查这个标志，隐藏文件对应 404。
pub fn is_hidden_name(relative: &str) -> bool {
    Path::new(relative)
        .file_name()
        .map_or(false, |name| name.to_string_lossy().starts_with('.'))
}

impl Resource {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn is_file(&self) -> bool {
        self.is_file
    }

    pub fn length(&self) -> u64 {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitizer::sanitize_uri;
    use std::fs as std_fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_resolve_file() {
        let dir = tempdir().unwrap();
        std_fs::write(dir.path().join("a.txt"), b"hello").unwrap();

        let resource = Resource::resolve(dir.path(), &sanitize_uri("/a.txt").unwrap()).await;
        assert!(resource.exists());
        assert!(resource.is_file());
        assert!(!resource.is_dir());
        assert!(!resource.is_hidden());
        assert_eq!(resource.length(), 5);
        assert_eq!(resource.path(), dir.path().join("a.txt"));
    }

    #[tokio::test]
    async fn test_resolve_root_directory() {
        // tempdir 的名字本身以 `.tmp` 开头，根目录不应因此被当作隐藏文件
        let dir = tempdir().unwrap();
        let resource = Resource::resolve(dir.path(), &sanitize_uri("/").unwrap()).await;
        assert!(resource.exists());
        assert!(resource.is_dir());
        assert!(!resource.is_hidden());
    }

    #[tokio::test]
    async fn test_resolve_missing() {
        let dir = tempdir().unwrap();
        let resource = Resource::resolve(dir.path(), &sanitize_uri("/nope.txt").unwrap()).await;
        assert!(!resource.exists());
        assert!(!resource.is_file());
        assert_eq!(resource.length(), 0);
    }

    #[test]
    fn test_hidden_names() {
        assert!(is_hidden_name(".env"));
        assert!(is_hidden_name("a/.git"));
        assert!(!is_hidden_name("a/b.txt"));
        assert!(!is_hidden_name(""));
    }
}
