use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("failed to decode {path}: {source}")]
    Json { path: PathBuf, source: serde_json::Error },
}

/// 外部工具给出的图片记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// 图片绝对路径，作为唯一标识
    pub path: PathBuf,
    /// 文件大小
    pub size: u64,
    /// 像素宽度
    pub width: u32,
    /// 像素高度
    pub height: u32,
    /// 最后修改时间（unix 时间戳）
    pub modified_date: i64,
    /// 相似度哈希，由上游工具计算，这里不解析也不重新计算
    #[serde(default)]
    pub hash: Vec<i64>,
    /// 上游工具给出的相似度，可能不存在
    #[serde(default)]
    pub similarity: i64,
}

impl ImageRecord {
    /// 像素面积
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// 一组疑似重复的图片，组号即在分组文件中的下标
pub type Group = Vec<ImageRecord>;

/// 启动时加载的全部分组，加载后只读
#[derive(Debug, Default)]
pub struct GroupStore {
    groups: Vec<Group>,
}

impl GroupStore {
    /// 从分组文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let file =
            File::open(path).map_err(|source| StoreError::Io { path: path.to_owned(), source })?;
        let groups: Vec<Group> = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| StoreError::Json { path: path.to_owned(), source })?;
        info!("从 {} 加载了 {} 个分组", path.display(), groups.len());
        Ok(Self { groups })
    }

    pub fn from_groups(groups: Vec<Group>) -> Self {
        Self { groups }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Group> {
        self.groups.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }
}
