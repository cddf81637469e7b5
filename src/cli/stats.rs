use anyhow::Result;
use clap::Parser;
use rayon::prelude::*;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::fs::{FileSystem, LocalFs};
use crate::store::GroupStore;

#[derive(Parser, Debug, Clone)]
pub struct StatsCommand {}

impl SubCommandExtend for StatsCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let store = GroupStore::load(&opts.duplicates)?;
        let stats = block_in_place(|| GroupStats::collect(&store, &LocalFs));

        println!("groups\t{}", stats.groups);
        println!("records\t{}", stats.records);
        println!("existing\t{}", stats.existing);
        Ok(())
    }
}

/// 分组文件的统计信息
#[derive(Debug, PartialEq, Eq)]
pub struct GroupStats {
    pub groups: usize,
    pub records: usize,
    /// 仍然存在于磁盘上的记录数
    pub existing: usize,
}

impl GroupStats {
    pub fn collect(store: &GroupStore, fs: &dyn FileSystem) -> Self {
        Self {
            groups: store.len(),
            records: store.iter().map(Vec::len).sum(),
            existing: store.iter().flatten().par_bridge().filter(|r| fs.exists(&r.path)).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::query::tests::MemoryFs;
    use crate::store::ImageRecord;

    fn record(path: &str) -> ImageRecord {
        ImageRecord {
            path: PathBuf::from(path),
            size: 1,
            width: 1,
            height: 1,
            modified_date: 0,
            hash: vec![],
            similarity: 0,
        }
    }

    #[test]
    fn test_collect_uses_filesystem() {
        let store = GroupStore::from_groups(vec![
            vec![record("/p/a.jpg"), record("/p/b.jpg")],
            vec![record("/p/c.jpg")],
            vec![],
        ]);
        let fs = MemoryFs::with_files(["/p/a.jpg", "/p/c.jpg"]);

        let stats = GroupStats::collect(&store, &fs);
        assert_eq!(stats, GroupStats { groups: 3, records: 3, existing: 2 });
    }
}
