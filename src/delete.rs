use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};
use thiserror::Error;

use crate::convert::{ConversionCache, is_raw_format};
use crate::fs::{FileSystem, is_within_root};
use crate::metrics;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeleteError {
    #[error("Path is required")]
    EmptyPath,

    #[error("File is outside allowed directory")]
    Forbidden,

    #[error("File does not exist")]
    NotExist,

    /// 系统返回的原始错误信息
    #[error("{0}")]
    Io(String),
}

impl DeleteError {
    fn label(&self) -> &'static str {
        match self {
            Self::EmptyPath => "empty_path",
            Self::Forbidden => "forbidden",
            Self::NotExist => "not_exist",
            Self::Io(_) => "io_error",
        }
    }
}

/// 删除服务，只允许删除图片根目录下的单个文件
///
/// 不会修改分组数据，被删除的文件在下次查询时自然被过滤
#[derive(Clone)]
pub struct DeletionService {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    cache: Option<Arc<ConversionCache>>,
}

impl DeletionService {
    pub fn new(root: PathBuf, fs: Arc<dyn FileSystem>, cache: Option<Arc<ConversionCache>>) -> Self {
        Self { root, fs, cache }
    }

    /// 删除一个文件
    ///
    /// 校验顺序：空路径、是否在根目录下、是否存在。根目录检查只比较路径字面，
    /// 在访问文件系统之前完成
    pub async fn delete_image(&self, path: &str) -> Result<(), DeleteError> {
        let result = self.try_delete(path).await;
        match &result {
            Ok(()) => metrics::inc_delete("ok"),
            Err(e) => metrics::inc_delete(e.label()),
        }
        result
    }

    async fn try_delete(&self, path: &str) -> Result<(), DeleteError> {
        if path.is_empty() {
            return Err(DeleteError::EmptyPath);
        }

        let path = Path::new(path);
        if !is_within_root(&self.root, path) {
            warn!("拒绝删除图片根目录之外的文件: {}", path.display());
            return Err(DeleteError::Forbidden);
        }

        if !self.fs.exists(path) {
            return Err(DeleteError::NotExist);
        }

        if let Err(e) = self.fs.remove_file(path) {
            error!("删除文件 {} 失败: {}", path.display(), e);
            return Err(DeleteError::Io(e.to_string()));
        }

        if is_raw_format(path) {
            if let Some(cache) = &self.cache {
                cache.evict(path).await;
            }
        }

        info!("已删除文件: {}", path.display());
        Ok(())
    }
}
