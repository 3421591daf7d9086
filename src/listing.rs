//! 目录列表：读取目录内容，过滤掉不应展示的条目，交给 `HtmlBuilder` 生成页面。

use std::path::Path;
use std::time::SystemTime;

use log::debug;
use tokio::fs;

use crate::{exception::Exception, param::ALLOWED_FILE_NAME, util::HtmlBuilder};

/// 目录中的一个可展示条目。
#[derive(Debug, Clone)]
pub struct ListingEntry {
    name: String,
    is_dir: bool,
    size: u64,
    modified: Option<SystemTime>,
}

impl ListingEntry {
    pub fn new(name: &str, is_dir: bool, size: u64, modified: Option<SystemTime>) -> Self {
        Self {
            name: name.to_string(),
            is_dir,
            size,
            modified,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

/// 生成目录 `dir` 的 HTML 列表。
///
/// 只列出同时满足以下条件的条目，其余静默跳过：
/// - 不是隐藏文件；
/// - 是普通文件或目录；
/// - 当前进程可读；
/// - 文件名匹配 `[A-Za-z0-9][-_A-Za-z0-9.]*`。
///
/// 目录本身在读取时失败（例如在解析之后被删除）返回 `TransferFailure`。
pub async fn render_listing(dir: &Path, title: &str, request_path: &str) -> Result<String, Exception> {
    let mut entries = collect_entries(dir).await.map_err(|e| {
        debug!("读取目录{}失败：{}", dir.display(), e);
        Exception::TransferFailure
    })?;
    sort_entries(&mut entries);
    Ok(HtmlBuilder::from_listing(title, request_path, &entries).build())
}

async fn collect_entries(dir: &Path) -> std::io::Result<Vec<ListingEntry>> {
    let mut read_dir = fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = read_dir.next_entry().await? {
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        if name.starts_with('.') || !ALLOWED_FILE_NAME.is_match(&name) {
            continue;
        }
        let path = entry.path();
        let metadata = match fs::metadata(&path).await {
            Ok(m) => m,
            Err(_) => continue,
        };
        // 管道、套接字、设备文件不列出，打开 FIFO 会一直阻塞到出现写端
        if !metadata.is_file() && !metadata.is_dir() {
            continue;
        }
        if !is_readable(&path, metadata.is_dir()).await {
            continue;
        }
        entries.push(ListingEntry::new(
            &name,
            metadata.is_dir(),
            metadata.len(),
            metadata.modified().ok(),
        ));
    }
    Ok(entries)
}

/// 以实际尝试打开的方式判断可读性，与权限位、ACL 等具体机制无关。
async fn is_readable(path: &Path, is_dir: bool) -> bool {
    if is_dir {
        fs::read_dir(path).await.is_ok()
    } else {
        fs::File::open(path).await.is_ok()
    }
}

/// 目录在前，其余按名称排序。
fn sort_entries(entries: &mut [ListingEntry]) {
    entries.sort_by(|a, b| match (a.is_dir, b.is_dir) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_listing_filters_entries() {
        let dir = tempdir().unwrap();
        std_fs::write(dir.path().join("visible.txt"), b"1").unwrap();
        std_fs::write(dir.path().join(".hidden"), b"1").unwrap();
        std_fs::write(dir.path().join("has space.txt"), b"1").unwrap();
        std_fs::write(dir.path().join("-leading-dash"), b"1").unwrap();
        std_fs::create_dir(dir.path().join("sub")).unwrap();

        let html = render_listing(dir.path(), "/", "/").await.unwrap();

        assert!(html.contains(r#"href="/visible.txt""#));
        assert!(html.contains(r#"href="/sub/""#));
        assert!(!html.contains(".hidden"));
        assert!(!html.contains("has space"));
        assert!(!html.contains("leading-dash"));
    }

    #[tokio::test]
    async fn test_listing_missing_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone");
        let result = render_listing(&missing, "/gone", "/gone/").await;
        assert_eq!(result.unwrap_err(), Exception::TransferFailure);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_listing_skips_unreadable_files() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked.txt");
        std_fs::write(&locked, b"secret").unwrap();
        std_fs::set_permissions(&locked, std_fs::Permissions::from_mode(0o000)).unwrap();
        std_fs::write(dir.path().join("open.txt"), b"1").unwrap();

        let html = render_listing(dir.path(), "/", "/").await.unwrap();
        assert!(html.contains("open.txt"));
        // root 用户无视权限位，此时无法验证过滤效果
        if std_fs::File::open(&locked).is_err() {
            assert!(!html.contains("locked.txt"));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_listing_skips_fifo() {
        let dir = tempdir().unwrap();
        std_fs::write(dir.path().join("plain.txt"), b"1").unwrap();
        let status = std::process::Command::new("mkfifo")
            .arg(dir.path().join("pipe"))
            .status()
            .unwrap();
        assert!(status.success());

        let html = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            render_listing(dir.path(), "/", "/"),
        )
        .await
        .expect("listing blocked on a named pipe")
        .unwrap();
        assert!(html.contains("plain.txt"));
        assert!(!html.contains("pipe"));
    }

    #[test]
    fn test_sort_entries() {
        let mut entries = vec![
            ListingEntry::new("b.txt", false, 0, None),
            ListingEntry::new("zdir", true, 0, None),
            ListingEntry::new("a.txt", false, 0, None),
        ];
        sort_entries(&mut entries);

        let names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["zdir", "a.txt", "b.txt"]);
    }
}
