//! 候选文件发现
//!
//! 把文件或目录输入展开成一张平铺的候选文件清单。

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 展开导入输入
///
/// 目录输入递归枚举其下全部常规文件（不跟随符号链接），单文件
/// 输入即是唯一候选。结果按字典序排序，保证同一体的切片相邻、
/// 分组与编号在多次运行间可复现。既不是文件也不是目录时静默
/// 返回空表，调用方把空表当作"无事可做"。
pub fn collect_candidates(input: &Path) -> Vec<PathBuf> {
    if input.is_dir() {
        let mut files: Vec<PathBuf> = WalkDir::new(input)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        files
    } else if input.is_file() {
        vec![input.to_path_buf()]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_directory_walk_is_recursive_and_sorted() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/nested")).unwrap();
        fs::write(dir.path().join("b/nested/z.dcm"), b"z").unwrap();
        fs::write(dir.path().join("b/a.dcm"), b"a").unwrap();
        fs::write(dir.path().join("0.dcm"), b"0").unwrap();

        let files = collect_candidates(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["0.dcm", "b/a.dcm", "b/nested/z.dcm"]);
    }

    #[test]
    fn test_single_file_is_sole_candidate() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("one.dcm");
        fs::write(&file, b"x").unwrap();

        assert_eq!(collect_candidates(&file), vec![file]);
    }

    #[test]
    fn test_missing_path_yields_empty_list() {
        assert!(collect_candidates(Path::new("/no/such/path")).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_excluded() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("real.dcm"), b"x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.dcm"), dir.path().join("link.dcm"))
            .unwrap();

        let files = collect_candidates(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("real.dcm"));
    }
}
