use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;

/// 外部文件检查器的失败
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("没有需要检查的文件")]
    EmptyInput,

    #[error("所有输入文件都不存在: {0:?}")]
    FilesNotFound(Vec<String>),

    #[error("规范目录不存在: {0}")]
    SpecsNotFound(String),

    #[error("规范名称不合法: {0}")]
    InvalidSpecName(String),

    #[error("无法启动检查器: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("检查器退出码 {code:?}: {stderr}")]
    Process { code: Option<i32>, stderr: String },

    #[error("检查器超时 ({0}s)")]
    Timeout(u64),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// check-files 请求的错误分类
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("上传数据格式错误: {0}")]
    Multipart(String),

    #[error("没有有效的文件上传")]
    NoFiles,

    /// 检查信号量已关闭（服务正在关闭），排队中的请求不再执行检查
    #[error("服务正在关闭，请稍后重试")]
    Busy,

    #[error(transparent)]
    Checker(#[from] CheckerError),
}

impl From<actix_multipart::MultipartError> for CheckError {
    fn from(e: actix_multipart::MultipartError) -> Self {
        CheckError::Multipart(e.to_string())
    }
}

impl ResponseError for CheckError {
    fn status_code(&self) -> StatusCode {
        match self {
            CheckError::Multipart(_) | CheckError::NoFiles => StatusCode::BAD_REQUEST,
            CheckError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            CheckError::Io(_) | CheckError::Checker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // 服务端错误不向客户端暴露内部细节
        let detail = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(ErrorResponse { detail })
    }
}
