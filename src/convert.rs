//! RAW 格式（CR2）到 JPG 的转换缓存
//!
//! 转换调用外部 ImageMagick 进程，结果保存在进程生命周期内的临时目录中

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;

use crate::metrics;

const TEMP_DIR_PREFIX: &str = "dupe_review_cr2_";
/// 按顺序查找的 ImageMagick 命令
const TOOLS: [&str; 2] = ["magick", "convert"];

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("ImageMagick not found: neither 'magick' nor 'convert' command available")]
    ToolMissing,

    #[error("failed to convert CR2 to JPG: {0}")]
    Failed(String),

    #[error("conversion timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// 是否是需要转换才能在浏览器中显示的 RAW 格式
pub fn is_raw_format(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("cr2"))
}

type Slot = Arc<tokio::sync::Mutex<Option<PathBuf>>>;

/// 源文件路径到转换结果的缓存
///
/// 外层锁只在取得单个源文件的槽位时持有，槽位锁在外部进程运行期间持有，
/// 因此同一文件的转换互斥，不同文件的转换可以并行
pub struct ConversionCache {
    dir: TempDir,
    timeout: Duration,
    /// 查找 ImageMagick 的目录列表，为空时使用 PATH
    search_path: Option<OsString>,
    slots: Mutex<HashMap<PathBuf, Slot>>,
}

impl ConversionCache {
    /// 创建缓存及其临时目录
    pub fn new(timeout: Duration) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(TEMP_DIR_PREFIX).tempdir()?;
        info!("CR2 转换临时目录: {}", dir.path().display());
        Ok(Self { dir, timeout, search_path: None, slots: Mutex::new(HashMap::new()) })
    }

    /// 只在给定的目录列表（与 PATH 格式相同）中查找 ImageMagick
    pub fn with_search_path(mut self, paths: impl Into<OsString>) -> Self {
        self.search_path = Some(paths.into());
        self
    }

    /// 临时目录路径
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// 源文件对应的转换结果路径
    pub fn derived_path(&self, source: &Path) -> PathBuf {
        let hash = blake3::hash(source.as_os_str().as_encoded_bytes());
        self.dir.path().join(format!("{}.jpg", hash.to_hex()))
    }

    fn slot(&self, source: &Path) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(source.to_path_buf()).or_default().clone()
    }

    /// 转换失败后移除空槽位，其他请求仍持有该槽位时保留
    fn release(&self, source: &Path, slot: Slot) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let unused = match slots.get(source) {
            // 一份在表中，一份在这里
            Some(current) => Arc::ptr_eq(current, &slot) && Arc::strong_count(&slot) == 2,
            None => false,
        };
        if unused {
            slots.remove(source);
        }
    }

    /// 返回可显示的转换结果，必要时调用外部进程转换
    pub async fn convert(&self, source: &Path) -> Result<PathBuf, ConvertError> {
        let slot = self.slot(source);
        let mut entry = slot.lock().await;

        if let Some(derived) = entry.as_ref() {
            if tokio::fs::try_exists(derived).await.unwrap_or(false) {
                return Ok(derived.clone());
            }
            debug!("缓存的转换结果已不存在: {}", derived.display());
            *entry = None;
        }

        match self.run_tool(source).await {
            Ok(derived) => {
                *entry = Some(derived.clone());
                Ok(derived)
            }
            Err(e) => {
                drop(entry);
                self.release(source, slot);
                Err(e)
            }
        }
    }

    async fn run_tool(&self, source: &Path) -> Result<PathBuf, ConvertError> {
        let tool = find_tool(self.search_path.as_deref()).ok_or(ConvertError::ToolMissing)?;
        let derived = self.derived_path(source);

        let start = Instant::now();
        let mut child = Command::new(&tool)
            .arg(source)
            .args(["-quality", "85", "-resize", "2048x2048>"])
            .arg(&derived)
            .kill_on_drop(true)
            .spawn()?;
        let waited = tokio::time::timeout(self.timeout, child.wait()).await;
        let status = match waited {
            Ok(status) => status?,
            Err(_) => {
                let _ = child.kill().await;
                return Err(ConvertError::Timeout(self.timeout));
            }
        };
        if !status.success() {
            return Err(ConvertError::Failed(status.to_string()));
        }
        metrics::observe_convert_duration(start.elapsed());

        info!("已转换 CR2: {} -> {}", file_name(source), file_name(&derived));
        Ok(derived)
    }

    /// 记录一个已存在的转换结果
    pub async fn record(&self, source: &Path, derived: PathBuf) {
        let slot = self.slot(source);
        *slot.lock().await = Some(derived);
    }

    /// 查询缓存，不触发转换
    pub async fn lookup(&self, source: &Path) -> Option<PathBuf> {
        let slot = self.slots.lock().unwrap_or_else(|e| e.into_inner()).get(source).cloned()?;
        let entry = slot.lock().await;
        entry.clone()
    }

    /// 移除缓存并删除转换结果，返回是否存在缓存
    ///
    /// 如果该文件正在转换，会等待转换结束后再删除
    pub async fn evict(&self, source: &Path) -> bool {
        let slot = self.slots.lock().unwrap_or_else(|e| e.into_inner()).remove(source);
        let Some(slot) = slot else {
            return false;
        };
        let Some(derived) = slot.lock().await.take() else {
            return false;
        };
        if let Err(e) = tokio::fs::remove_file(&derived).await {
            warn!("删除转换结果 {} 失败: {}", derived.display(), e);
        }
        info!("已清理被删除 CR2 的转换结果: {}", file_name(&derived));
        true
    }

    /// 删除临时目录
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        info!("已删除临时目录: {}", path.display());
        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

/// 在 `search_path` 或 PATH 中查找 ImageMagick
fn find_tool(search_path: Option<&OsStr>) -> Option<PathBuf> {
    let paths = match search_path {
        Some(paths) => paths.to_owned(),
        None => std::env::var_os("PATH")?,
    };
    TOOLS.iter().find_map(|tool| {
        std::env::split_paths(&paths).map(|dir| dir.join(tool)).find(|p| p.is_file())
    })
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    /// 把源文件复制为结果，并在脚本所在目录记录调用次数
    const COPY_SCRIPT: &str = r#"echo run >> "$(dirname "$0")/runs"
cp "$1" "$6""#;

    /// 在临时目录中写入一个假的 magick 命令
    fn fake_tool(body: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("magick");
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        dir
    }

    fn runs(tool: &TempDir) -> usize {
        std::fs::read_to_string(tool.path().join("runs")).map(|s| s.lines().count()).unwrap_or(0)
    }

    fn raw_source(dir: &TempDir) -> PathBuf {
        let source = dir.path().join("IMG_0001.CR2");
        std::fs::write(&source, b"raw-bytes").unwrap();
        source
    }

    fn slot_count(cache: &ConversionCache) -> usize {
        cache.slots.lock().unwrap().len()
    }

    #[tokio::test]
    async fn test_convert_reuses_cached_result() {
        let tool = fake_tool(COPY_SCRIPT);
        let input = TempDir::new().unwrap();
        let source = raw_source(&input);
        let cache =
            ConversionCache::new(Duration::from_secs(10)).unwrap().with_search_path(tool.path());

        let derived = cache.convert(&source).await.unwrap();
        assert_eq!(derived, cache.derived_path(&source));
        assert_eq!(std::fs::read(&derived).unwrap(), b"raw-bytes");
        assert_eq!(cache.lookup(&source).await, Some(derived.clone()));

        assert_eq!(cache.convert(&source).await.unwrap(), derived);
        assert_eq!(runs(&tool), 1);
    }

    #[tokio::test]
    async fn test_convert_again_when_derived_file_is_gone() {
        let tool = fake_tool(COPY_SCRIPT);
        let input = TempDir::new().unwrap();
        let source = raw_source(&input);
        let cache =
            ConversionCache::new(Duration::from_secs(10)).unwrap().with_search_path(tool.path());

        let derived = cache.convert(&source).await.unwrap();
        std::fs::remove_file(&derived).unwrap();

        assert_eq!(cache.convert(&source).await.unwrap(), derived);
        assert!(derived.exists());
        assert_eq!(runs(&tool), 2);
    }

    #[tokio::test]
    async fn test_convert_without_tool() {
        let empty = TempDir::new().unwrap();
        let cache =
            ConversionCache::new(Duration::from_secs(10)).unwrap().with_search_path(empty.path());

        let result = cache.convert(Path::new("/p/a.cr2")).await;
        assert!(matches!(result, Err(ConvertError::ToolMissing)));
        assert_eq!(slot_count(&cache), 0);
    }

    #[tokio::test]
    async fn test_convert_tool_failure() {
        let tool = fake_tool("exit 3");
        let input = TempDir::new().unwrap();
        let source = raw_source(&input);
        let cache =
            ConversionCache::new(Duration::from_secs(10)).unwrap().with_search_path(tool.path());

        let result = cache.convert(&source).await;
        assert!(matches!(result, Err(ConvertError::Failed(_))));
        assert_eq!(cache.lookup(&source).await, None);
        assert_eq!(slot_count(&cache), 0);
    }

    #[tokio::test]
    async fn test_convert_timeout() {
        let tool = fake_tool("exec sleep 30");
        let input = TempDir::new().unwrap();
        let source = raw_source(&input);
        let timeout = Duration::from_millis(300);
        let cache = ConversionCache::new(timeout).unwrap().with_search_path(tool.path());

        let start = Instant::now();
        let result = cache.convert(&source).await;
        assert!(matches!(result, Err(ConvertError::Timeout(t)) if t == timeout));
        assert!(start.elapsed() < Duration::from_secs(10));
        assert_eq!(slot_count(&cache), 0);
    }

    #[tokio::test]
    async fn test_failed_slot_kept_while_shared() {
        let cache = ConversionCache::new(Duration::from_secs(1)).unwrap();
        let source = Path::new("/p/a.cr2");
        let slot = cache.slot(source);
        let other = cache.slot(source);

        cache.release(source, slot);
        assert_eq!(slot_count(&cache), 1);
        cache.release(source, other);
        assert_eq!(slot_count(&cache), 0);
    }

    #[test]
    fn test_is_raw_format() {
        assert!(is_raw_format(Path::new("/p/IMG_0001.CR2")));
        assert!(is_raw_format(Path::new("/p/IMG_0001.cr2")));
        assert!(!is_raw_format(Path::new("/p/IMG_0001.jpg")));
        assert!(!is_raw_format(Path::new("/p/cr2")));
    }

    #[test]
    fn test_derived_path_is_stable() {
        let cache = ConversionCache::new(Duration::from_secs(1)).unwrap();
        let a = cache.derived_path(Path::new("/p/a.cr2"));
        assert_eq!(a, cache.derived_path(Path::new("/p/a.cr2")));
        assert_ne!(a, cache.derived_path(Path::new("/p/b.cr2")));
        assert!(a.starts_with(cache.dir()));
        assert_eq!(a.extension().unwrap(), "jpg");
    }

    #[tokio::test]
    async fn test_evict_removes_derived_file() {
        let cache = ConversionCache::new(Duration::from_secs(1)).unwrap();
        let source = Path::new("/p/a.cr2");
        let derived = cache.derived_path(source);
        std::fs::write(&derived, b"jpg").unwrap();

        cache.record(source, derived.clone()).await;
        assert_eq!(cache.lookup(source).await, Some(derived.clone()));

        assert!(cache.evict(source).await);
        assert!(!derived.exists());
        assert_eq!(cache.lookup(source).await, None);
        assert!(!cache.evict(source).await);
    }

    #[tokio::test]
    async fn test_evict_missing_derived_file_is_not_an_error() {
        let cache = ConversionCache::new(Duration::from_secs(1)).unwrap();
        let source = Path::new("/p/gone.cr2");
        cache.record(source, cache.derived_path(source)).await;
        assert!(cache.evict(source).await);
    }

    #[tokio::test]
    async fn test_close_removes_temp_dir() {
        let cache = ConversionCache::new(Duration::from_secs(1)).unwrap();
        let dir = cache.dir().to_path_buf();
        std::fs::write(dir.join("x.jpg"), b"jpg").unwrap();
        cache.close().unwrap();
        assert!(!dir.exists());
    }
}
