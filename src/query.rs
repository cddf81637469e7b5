use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::fs::{FileSystem, display_path};
use crate::metadata::{self, MetadataDescriptor};
use crate::metrics;
use crate::scoring::{self, Candidate, ScoredImage};
use crate::store::GroupStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Group not found")]
    GroupNotFound,

    #[error("No images found in group")]
    NoImages,
}

/// 返回给前端的单张图片
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ImageView {
    /// 相对于图片根目录的路径，用于展示和加载图片
    pub path: String,
    /// 绝对路径，用于删除
    #[schema(value_type = String)]
    pub original_path: PathBuf,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub modified_date: i64,
    pub hash: Vec<i64>,
    pub similarity: i64,
    #[serde(flatten)]
    pub metadata: MetadataDescriptor,
    /// 保留分
    pub score: i32,
}

impl ImageView {
    fn new(root: &Path, scored: ScoredImage) -> Self {
        let ScoredImage { record, metadata, score } = scored;
        Self {
            path: display_path(root, &record.path),
            original_path: record.path,
            size: record.size,
            width: record.width,
            height: record.height,
            modified_date: record.modified_date,
            hash: record.hash,
            similarity: record.similarity,
            metadata,
            score,
        }
    }
}

/// 一个分组的查询结果，图片按保留分从高到低排列
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GroupView {
    pub group_similarity_score: f64,
    pub images: Vec<ImageView>,
}

/// 分组查询服务，只读，可并发调用
#[derive(Clone)]
pub struct GroupQueryService {
    store: Arc<GroupStore>,
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl GroupQueryService {
    pub fn new(store: Arc<GroupStore>, fs: Arc<dyn FileSystem>, root: PathBuf) -> Self {
        Self { store, fs, root }
    }

    pub fn store(&self) -> &GroupStore {
        &self.store
    }

    /// 查询第 `index` 个分组
    ///
    /// 已不存在的文件会被跳过，全部不存在时返回 [`QueryError::NoImages`]
    pub fn query_group(&self, index: usize) -> Result<GroupView, QueryError> {
        let group = self.store.get(index).ok_or(QueryError::GroupNotFound)?;

        let survivors = group
            .iter()
            .filter(|record| {
                let exists = self.fs.exists(&record.path);
                if !exists {
                    info!("跳过不存在的文件: {}", record.path.display());
                    metrics::inc_skipped_file();
                }
                exists
            })
            .collect::<Vec<_>>();

        if survivors.is_empty() {
            return Err(QueryError::NoImages);
        }

        // collect 保持输入顺序
        let candidates = survivors
            .into_par_iter()
            .map(|record| Candidate {
                record: record.clone(),
                metadata: metadata::extract(self.fs.as_ref(), &record.path),
            })
            .collect::<Vec<_>>();

        let result = scoring::score_group(candidates);
        let mut images =
            result.images.into_iter().map(|s| ImageView::new(&self.root, s)).collect::<Vec<_>>();
        scoring::rank(&mut images, |image| image.score);

        Ok(GroupView { group_similarity_score: result.similarity, images })
    }
}
