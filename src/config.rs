use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::cli::*;

#[derive(Parser, Debug, Clone)]
#[command(name = "dupe-review", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 图片根目录，只允许删除该目录下的文件
    #[arg(short = 'r', long = "imagepath", value_name = "DIR", env = "DUPE_REVIEW_IMAGE_ROOT")]
    pub image_root: PathBuf,
    /// 相似图片分组文件
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "groups.json",
        env = "DUPE_REVIEW_DUPLICATES"
    )]
    pub duplicates: PathBuf,
}

impl Opts {
    /// 转换为绝对路径后的图片根目录
    pub fn image_root(&self) -> anyhow::Result<PathBuf> {
        let root = std::path::absolute(&self.image_root)
            .with_context(|| format!("无效的图片根目录: {}", self.image_root.display()))?;
        // 重新收集组件以去掉结尾的分隔符
        Ok(root.components().collect())
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 启动 HTTP 服务
    Server(ServerCommand),
    /// 输出一个分组的评分结果
    Show(ShowCommand),
    /// 输出分组文件的统计信息
    Stats(StatsCommand),
}
