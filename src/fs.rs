use std::io;
use std::path::{Component, Path, PathBuf};

/// 引擎访问文件系统的接口，测试中可以替换为内存实现
pub trait FileSystem: Send + Sync {
    /// 文件是否存在
    fn exists(&self, path: &Path) -> bool;

    /// 读取整个文件
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// 删除单个文件
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// 本地文件系统
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// 判断 `path` 是否在 `root` 目录之下
///
/// 只做字面比较，不访问文件系统：`path` 必须是绝对路径、以 `root` 为前缀、
/// 不能等于 `root` 本身，并且不能包含 `..`
pub fn is_within_root(root: &Path, path: &Path) -> bool {
    path.is_absolute()
        && path != root
        && path.starts_with(root)
        && !path.components().any(|c| c == Component::ParentDir)
}

/// 返回相对于 `root` 的展示路径，不在 `root` 下的路径原样返回
pub fn display_path(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

/// 将 URL 中的相对路径拼接到 `root` 下
///
/// 相对路径中出现 `..`、根目录或盘符时返回 `None`
pub fn resolve_relative(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let mut full = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => full.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if full == root {
        return None;
    }
    Some(full)
}
