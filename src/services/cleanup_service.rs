use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ServerConfig;
use crate::utils::file_utils;

/// 仅在保留请求目录时启动：定期删除过期的请求目录
pub async fn start_background_cleanup(config: ServerConfig) {
    let mut cleanup_interval = tokio::time::interval(config.cleanup_interval);
    // 第一次 tick 立即返回，跳过
    cleanup_interval.tick().await;

    loop {
        cleanup_interval.tick().await;

        log::info!("执行后台清理任务...");
        match cleanup_request_dirs(config.input_root.clone(), config.request_dir_max_age).await {
            Ok((dirs_cleaned, size_freed)) => {
                log::info!("清理完成 - 请求目录: {} (释放 {} bytes)", dirs_cleaned, size_freed);
            }
            Err(e) => log::error!("后台清理失败: {}", e),
        }
    }
}

pub async fn cleanup_request_dirs(
    input_root: PathBuf,
    max_age: Duration,
) -> Result<(usize, u64), String> {
    tokio::task::spawn_blocking(move || cleanup_request_dirs_blocking(&input_root, max_age))
        .await
        .map_err(|e| format!("清理任务失败: {}", e))?
}

fn cleanup_request_dirs_blocking(input_root: &Path, max_age: Duration) -> Result<(usize, u64), String> {
    let entries = fs::read_dir(input_root)
        .map_err(|e| format!("读取输入目录失败 {}: {}", input_root.display(), e))?;

    let mut cleaned_count = 0usize;
    let mut total_size = 0u64;

    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else { continue };
        if !file_type.is_dir() {
            continue;
        }
        let Ok(metadata) = entry.metadata() else { continue };
        let age = metadata
            .modified()
            .ok()
            .and_then(|m| m.elapsed().ok())
            .unwrap_or_default();
        if age < max_age {
            continue;
        }

        let path = entry.path();
        let (mut file_count, mut dir_size) = (0usize, 0u64);
        if let Err(e) = file_utils::count_files_recursive(&path, &mut file_count, &mut dir_size) {
            log::debug!("统计请求目录大小失败 {}: {}", path.display(), e);
        }

        match fs::remove_dir_all(&path) {
            Ok(()) => {
                cleaned_count += 1;
                total_size += dir_size;
                log::debug!("清理请求目录: {} ({} 个文件)", path.display(), file_count);
            }
            Err(e) => log::warn!("清理请求目录失败 {}: {}", path.display(), e),
        }
    }

    Ok((cleaned_count, total_size))
}

pub async fn graceful_shutdown(config: &ServerConfig) {
    log::info!("接收到关闭信号，开始优雅关闭...");

    if config.keep_request_dirs {
        log::info!("清理过期请求目录...");
        match cleanup_request_dirs(config.input_root.clone(), config.request_dir_max_age).await {
            Ok((dirs_cleaned, size_freed)) => {
                log::info!("已清理 {} 个请求目录 (释放 {} bytes)", dirs_cleaned, size_freed);
            }
            Err(e) => log::warn!("关闭时清理请求目录失败: {}", e),
        }
    }

    log::info!("优雅关闭完成");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn removes_only_expired_directories() {
        let root = tempfile::tempdir().unwrap();
        let old = root.path().join("old-request");
        fs::create_dir(&old).unwrap();
        fs::write(old.join("a.nc"), b"12345").unwrap();
        fs::write(root.path().join("stray-file"), b"x").unwrap();

        // max_age 为 0 时所有目录都算过期
        let (cleaned, freed) = cleanup_request_dirs(root.path().to_path_buf(), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!((cleaned, freed), (1, 5));
        assert!(!old.exists());
        assert!(root.path().join("stray-file").exists());
    }

    #[tokio::test]
    async fn keeps_recent_directories() {
        let root = tempfile::tempdir().unwrap();
        let fresh = root.path().join("fresh-request");
        fs::create_dir(&fresh).unwrap();

        let (cleaned, _) = cleanup_request_dirs(root.path().to_path_buf(), Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(cleaned, 0);
        assert!(fresh.exists());
    }

    #[tokio::test]
    async fn missing_root_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let result = cleanup_request_dirs(root.path().join("absent"), Duration::ZERO).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn shutdown_sweeps_kept_directories() {
        let root = tempfile::tempdir().unwrap();
        let old = root.path().join("kept-request");
        fs::create_dir(&old).unwrap();
        let config = ServerConfig {
            input_root: root.path().to_path_buf(),
            keep_request_dirs: true,
            request_dir_max_age: Duration::ZERO,
            ..ServerConfig::default()
        };

        graceful_shutdown(&config).await;
        assert!(!old.exists());
    }

    #[tokio::test]
    async fn shutdown_survives_missing_input_root() {
        let root = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            input_root: root.path().join("absent"),
            keep_request_dirs: true,
            ..ServerConfig::default()
        };

        graceful_shutdown(&config).await;
    }
}
