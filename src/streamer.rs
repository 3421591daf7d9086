//! # 文件分块传输
//!
//! 普通文件的响应体不会一次性读入内存，而是描述为一个 [`FileRegion`]，
//! 由传输层按 `chunk_size` 大小逐块读取并写出。每一块写出完成（即传输层接受了这一块）
//! 之后才读取下一块，因此每个传输占用的内存与文件大小无关。

use std::io::{self, SeekFrom};
use std::path::Path;

use log::debug;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt},
};

use crate::{
    exception::Exception,
    param::{FALLBACK_MIME, MIME_TYPES},
    resolver::Resource,
};

/// 待传输的文件区间。
#[derive(Debug)]
pub struct FileRegion {
    file: File,
    offset: u64,
    length: u64,
    chunk_size: usize,
}

impl FileRegion {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

/// 传输进度的观察者。只用于日志或统计，不影响传输本身。
#[cfg_attr(test, mockall::automock)]
pub trait TransferListener: Send {
    /// 每写出一块之后调用。`total < 0` 表示总长度未知。
    fn on_progress(&mut self, progress: u64, total: i64);
    /// 最后一块写出并刷新之后调用。
    fn on_complete(&mut self, total: u64);
}

/// 以 debug 级别记录进度的默认观察者。
pub struct LoggingListener {
    id: u128,
}

impl LoggingListener {
    pub fn new(id: u128) -> Self {
        Self { id }
    }
}

impl TransferListener for LoggingListener {
    fn on_progress(&mut self, progress: u64, total: i64) {
        if total < 0 {
            debug!("[ID{}]Transfer progress: {}", self.id, progress);
        } else {
            debug!("[ID{}]Transfer progress: {}/{}", self.id, progress, total);
        }
    }

    fn on_complete(&mut self, total: u64) {
        debug!("[ID{}]Transfer complete, {} bytes", self.id, total);
    }
}

/// 打开资源对应的文件，得到覆盖整个文件的区间。
///
/// 长度取自打开后的文件句柄，而不是解析时的元数据。文件在解析之后消失时返回 `TransferFailure`。
pub async fn open_region(resource: &Resource, chunk_size: usize) -> Result<FileRegion, Exception> {
    let file = File::open(resource.path()).await.map_err(|e| {
        debug!("打开文件{}失败：{}", resource.path().display(), e);
        Exception::TransferFailure
    })?;
    let length = file
        .metadata()
        .await
        .map_err(|_| Exception::TransferFailure)?
        .len();
    Ok(FileRegion {
        file,
        offset: 0,
        length,
        chunk_size,
    })
}

/// 根据后缀名推断 `Content-Type`，后缀大小写不敏感。
pub fn mime_type(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| MIME_TYPES.get(ext.to_ascii_lowercase().as_str()).copied())
        .unwrap_or(FALLBACK_MIME)
}

/// 把区间内容逐块写入 `writer`，返回写出的字节数。
///
/// 每一块不超过 `chunk_size`，按文件顺序写出。写出出错（例如对端关闭连接）时立即返回错误，
/// 文件句柄随 `region` 一起释放。文件被截断导致提前读到末尾时返回 `UnexpectedEof`：
/// 响应头已经声明了长度，此时连接只能关闭。
pub async fn send_region<W>(
    writer: &mut W,
    region: FileRegion,
    listener: &mut dyn TransferListener,
) -> io::Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let FileRegion {
        mut file,
        offset,
        length,
        chunk_size,
    } = region;
    if offset > 0 {
        file.seek(SeekFrom::Start(offset)).await?;
    }

    let mut buffer = vec![0u8; chunk_size.min(length as usize).max(1)];
    let mut sent = 0u64;
    while sent < length {
        let to_read = (length - sent).min(buffer.len() as u64) as usize;
        let n = file.read(&mut buffer[..to_read]).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("file ended after {} of {} bytes", sent, length),
            ));
        }
        writer.write_all(&buffer[..n]).await?;
        sent += n as u64;
        listener.on_progress(sent, length as i64);
    }
    writer.flush().await?;
    listener.on_complete(sent);
    Ok(sent)
}
