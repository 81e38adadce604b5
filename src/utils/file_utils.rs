use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::validation_utils;

// 只取客户端文件名的最后一段，去掉任何目录部分（含 Windows 风格的 '\'）
pub fn client_basename(client_name: &str) -> &str {
    client_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or("")
}

/// 为第 `index` 个上传文件选择磁盘文件名。
///
/// 安全的客户端文件名原样使用；否则退回 `upload_<index>[.<ext>]`。
/// 与 `taken` 中已有名字冲突时加上 `<index>_` 前缀；加前缀后超过
/// 文件名长度上限时改用 `upload_<n>[.<ext>]`。
pub fn disk_name_for(index: usize, client_name: &str, taken: &HashSet<String>) -> String {
    let base = client_basename(client_name);
    let ext = Path::new(base)
        .extension()
        .and_then(|s| s.to_str())
        .filter(|ext| validation_utils::is_safe_extension(ext))
        .map(|ext| ext.to_lowercase());
    let token = |n: usize| match &ext {
        Some(ext) => format!("upload_{}.{}", n, ext),
        None => format!("upload_{}", n),
    };

    let candidate = if validation_utils::is_safe_filename(base) {
        base.to_string()
    } else {
        token(index)
    };

    if !taken.contains(&candidate) {
        return candidate;
    }

    let mut counter = index;
    loop {
        let mut prefixed = format!("{}_{}", counter, candidate);
        if prefixed.len() > validation_utils::MAX_FILENAME_LEN {
            prefixed = token(counter);
        }
        if !taken.contains(&prefixed) {
            return prefixed;
        }
        counter += 1;
    }
}

// 列出目录下的直接条目（不递归），按文件名排序
pub async fn list_dir_entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

// 递归统计文件数量和大小
pub fn count_files_recursive(
    path: &Path,
    file_count: &mut usize,
    total_size: &mut u64,
) -> std::io::Result<()> {
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let file_type = entry.file_type()?;

        if file_type.is_file() {
            *file_count += 1;
            if let Ok(metadata) = entry.metadata() {
                *total_size += metadata.len();
            }
        } else if file_type.is_dir() {
            count_files_recursive(&entry.path(), file_count, total_size)?;
        }
    }
    Ok(())
}
