use actix_multipart::Multipart;
use actix_web::web::Bytes;
use futures_util::{Stream, TryStreamExt};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs as tokio_fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::CheckError;
use crate::models::{CheckResponse, StagedFile};
use crate::state::AppState;
use crate::utils::file_utils;

/// 单个请求独占的输入目录 `<input-root>/<request-id>`
#[derive(Debug, Clone)]
pub struct RequestDir {
    pub id: Uuid,
    pub path: PathBuf,
}

// 目录已存在时报错（不使用 create_dir_all）
pub async fn create_request_dir(input_root: &Path) -> std::io::Result<RequestDir> {
    let id = Uuid::new_v4();
    let path = input_root.join(id.to_string());
    tokio_fs::create_dir(&path).await?;
    log::debug!("创建请求目录: {}", path.display());
    Ok(RequestDir { id, path })
}

pub async fn remove_request_dir(path: &Path) {
    match tokio_fs::remove_dir_all(path).await {
        Ok(()) => log::debug!("已删除请求目录: {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("删除请求目录失败 {}: {}", path.display(), e),
    }
}

// 请求 future 被中途丢弃时由作用域守卫调用，删除放到阻塞线程池
pub fn remove_request_dir_in_background(path: PathBuf) -> Option<tokio::task::JoinHandle<()>> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Some(handle.spawn(async move { remove_request_dir(&path).await })),
        Err(_) => {
            if let Err(e) = std::fs::remove_dir_all(&path) {
                log::warn!("删除请求目录失败 {}: {}", path.display(), e);
            }
            None
        }
    }
}

/// check-files 的完整流程：建目录 → 写文件 → 枚举 → 调用检查器。
///
/// 请求目录在返回前删除（无论成功与否），除非配置了保留。
pub async fn handle_check_request(
    state: &AppState,
    payload: Multipart,
) -> Result<CheckResponse, CheckError> {
    let config = &state.config;
    let request_dir = create_request_dir(&config.input_root).await?;
    log::info!("=== 请求 {} 开始 ===", request_dir.id);

    let keep = config.keep_request_dirs;
    let cleanup = scopeguard::guard(request_dir.path.clone(), move |path| {
        if !keep {
            remove_request_dir_in_background(path);
        }
    });

    let result = check_in_request_dir(state, &request_dir, payload).await;

    let path = scopeguard::ScopeGuard::into_inner(cleanup);
    if !keep {
        remove_request_dir(&path).await;
    }
    result
}

async fn check_in_request_dir(
    state: &AppState,
    request_dir: &RequestDir,
    payload: Multipart,
) -> Result<CheckResponse, CheckError> {
    let staged = stage_uploads(&request_dir.path, payload).await?;
    if staged.is_empty() {
        return Err(CheckError::NoFiles);
    }

    let files = collect_staged(&request_dir.path, &staged).await?;
    log::info!("请求 {}: 已保存 {} 个文件", request_dir.id, files.len());

    // 信号量只在关闭流程中被关闭
    let _permit = state
        .check_semaphore
        .acquire()
        .await
        .map_err(|_| CheckError::Busy)?;
    let results = state.checker.check(&files, &state.config.spec_name).await?;

    log::info!(
        "=== 请求 {} 完成: {} 条检查结果 ===",
        request_dir.id,
        results.len()
    );
    Ok(CheckResponse { results })
}

/// 按客户端顺序把 multipart 中的文件写入请求目录。
///
/// 没有文件名的字段会被跳过。任何一个文件写入失败都会中止整个请求，
/// 已写入的文件不回滚。
pub async fn stage_uploads(
    request_dir: &Path,
    mut payload: Multipart,
) -> Result<Vec<StagedFile>, CheckError> {
    let mut staged = Vec::new();
    let mut taken = HashSet::new();
    let mut field_count = 0usize;

    while let Some(mut field) = payload.try_next().await? {
        field_count += 1;

        let client_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(|f| f.to_string())
            .filter(|f| !f.is_empty());

        let Some(client_name) = client_name else {
            log::warn!(
                "跳过第 {} 个字段 '{}': 没有文件名",
                field_count,
                field.name().unwrap_or("")
            );
            continue;
        };

        let disk_name = file_utils::disk_name_for(staged.len(), &client_name, &taken);
        let path = request_dir.join(&disk_name);
        if disk_name != client_name {
            log::info!("文件名 '{}' 保存为 '{}'", client_name, disk_name);
        }

        // 无论写入是否成功，field 都在本次迭代结束时释放
        let size = write_stream(&path, &mut field).await?;
        log::info!("已写入 {} ({} bytes)", path.display(), size);

        taken.insert(disk_name);
        staged.push(StagedFile {
            path,
            original_name: client_name,
        });
    }

    Ok(staged)
}

/// 以独占创建方式打开目标文件，然后逐块写入。
pub async fn write_stream<S, E>(path: &Path, stream: &mut S) -> Result<u64, CheckError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    CheckError: From<E>,
{
    let start_time = Instant::now();
    let mut total_size: u64 = 0;
    let mut chunk_count: usize = 0;

    let mut file = tokio_fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| {
            log::error!("创建文件失败 {}: {}", path.display(), e);
            e
        })?;

    while let Some(chunk) = stream.try_next().await? {
        chunk_count += 1;
        total_size += chunk.len() as u64;
        file.write_all(&chunk).await.map_err(|e| {
            log::error!("写入文件失败 {} (第{}块): {}", path.display(), chunk_count, e);
            e
        })?;
    }
    file.flush().await?;

    log::debug!(
        "文件写入完成 {}: {} bytes, {} 块, 耗时 {:?}",
        path.display(),
        total_size,
        chunk_count,
        start_time.elapsed()
    );
    Ok(total_size)
}

/// 枚举请求目录下的直接条目，并映射回客户端文件名。
pub async fn collect_staged(
    request_dir: &Path,
    staged: &[StagedFile],
) -> std::io::Result<Vec<StagedFile>> {
    let names: HashMap<String, &str> = staged
        .iter()
        .map(|f| (f.disk_name(), f.original_name.as_str()))
        .collect();

    let entries = file_utils::list_dir_entries(request_dir).await?;
    Ok(entries
        .into_iter()
        .map(|path| {
            let disk_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let original_name = names
                .get(&disk_name)
                .map(|s| s.to_string())
                .unwrap_or(disk_name);
            StagedFile { path, original_name }
        })
        .collect())
}
