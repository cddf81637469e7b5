use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::convert::ConversionCache;
use crate::delete::DeletionService;
use crate::fs::FileSystem;
use crate::query::GroupQueryService;
use crate::store::GroupStore;

/// 服务器配置选项
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// 单次分组查询（包括读取文件）的超时时间
    pub read_timeout: Duration,
    /// 删除接口的请求体大小上限
    pub body_limit: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self { read_timeout: Duration::from_secs(30), body_limit: 64 * 1024 }
    }
}

/// 应用状态
pub struct AppState {
    /// 图片根目录
    pub image_root: PathBuf,
    /// 文件系统
    pub fs: Arc<dyn FileSystem>,
    /// 分组查询
    pub query: GroupQueryService,
    /// 文件删除
    pub deletion: DeletionService,
    /// CR2 转换缓存
    pub cache: Arc<ConversionCache>,
    /// 服务器配置选项
    pub options: ServerOptions,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(
        store: Arc<GroupStore>,
        image_root: PathBuf,
        fs: Arc<dyn FileSystem>,
        cache: Arc<ConversionCache>,
        options: ServerOptions,
    ) -> Arc<Self> {
        let query = GroupQueryService::new(store, fs.clone(), image_root.clone());
        let deletion = DeletionService::new(image_root.clone(), fs.clone(), Some(cache.clone()));
        Arc::new(AppState { image_root, fs, query, deletion, cache, options })
    }
}
