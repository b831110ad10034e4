//! 诊断图片存储目录管理模块
//!
//! # 设计思路
//!
//! 统一管理诊断图片的落盘路径，支持用户自定义目录，
//! 并在目录不存在时自动创建。
//!
//! # 实现思路
//!
//! - 优先使用用户在设置中配置的自定义目录。
//! - 未设置时回退到系统图片目录下的 `MyImages` 子目录；
//!   系统没有图片目录时再回退到应用数据目录。
//! - 目录不存在时自动 `create_dir_all`，避免上层判断。
//! - 所有可能失败的操作均返回 `Result`，不使用 `expect()` / `unwrap()`。

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;

const DIAGNOSTICS_DIR_NAME: &str = "MyImages";

/// 存储目录信息
#[derive(Debug, Clone, Serialize)]
pub struct StorageInfo {
    pub path: String,
    pub total_size: u64,
    pub file_count: u64,
}

/// 默认诊断目录（不创建）。
pub fn default_diagnostics_dir() -> Result<PathBuf, AppError> {
    if let Some(pictures) = dirs::picture_dir() {
        return Ok(pictures.join(DIAGNOSTICS_DIR_NAME));
    }

    dirs::data_dir()
        .map(|dir| dir.join(crate::APP_DIR_NAME).join(DIAGNOSTICS_DIR_NAME))
        .ok_or_else(|| AppError::Storage("无法确定图片目录或应用数据目录".to_string()))
}

/// 获取诊断图片存储目录
///
/// # 参数
/// * `custom_dir` - 用户自定义目录（可选）
///
/// # 返回
/// - `Ok(PathBuf)` — 可用的诊断图片目录
/// - `Err(AppError::Storage)` — 无法获取或创建目录
pub fn get_diagnostics_dir(custom_dir: Option<&Path>) -> Result<PathBuf, AppError> {
    let dir = match custom_dir {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => default_diagnostics_dir()?,
    };

    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| {
            AppError::Storage(format!("创建诊断目录 '{}' 失败: {}", dir.display(), e))
        })?;
    }
    Ok(dir)
}

/// 获取诊断目录信息（路径 + 占用大小 + 文件数）
pub fn get_diagnostics_dir_info(custom_dir: Option<&Path>) -> Result<StorageInfo, AppError> {
    let dir = get_diagnostics_dir(custom_dir)?;
    let mut total_size: u64 = 0;
    let mut file_count: u64 = 0;

    if let Ok(entries) = fs::read_dir(&dir) {
        for entry in entries.flatten() {
            if let Ok(metadata) = entry.metadata() {
                if metadata.is_file() {
                    total_size += metadata.len();
                    file_count += 1;
                }
            }
        }
    }

    Ok(StorageInfo {
        path: dir.to_string_lossy().to_string(),
        total_size,
        file_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn custom_dir_is_created_on_demand() {
        let root = tempdir().expect("tempdir");
        let custom = root.path().join("nested").join("diag");

        let dir = get_diagnostics_dir(Some(&custom)).expect("dir should be created");

        assert_eq!(dir, custom);
        assert!(custom.is_dir());
    }

    #[test]
    fn dir_info_counts_files_only() {
        let root = tempdir().expect("tempdir");
        fs::write(root.path().join("a.jpg"), [0u8; 10]).expect("write");
        fs::write(root.path().join("b.jpg"), [0u8; 5]).expect("write");
        fs::create_dir(root.path().join("sub")).expect("mkdir");

        let info = get_diagnostics_dir_info(Some(root.path())).expect("info");

        assert_eq!(info.file_count, 2);
        assert_eq!(info.total_size, 15);
    }
}
