use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 已落盘的上传文件：磁盘路径 + 客户端提供的原始文件名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub original_name: String,
}

impl StagedFile {
    pub fn disk_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultType {
    Success,
    Failure,
    Error,
}

impl ResultType {
    pub fn from_status(status: &str) -> Self {
        match status.trim() {
            "FILE-ACCEPTED" => ResultType::Success,
            "FILE-REJECTED" => ResultType::Failure,
            _ => ResultType::Error,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ValidationResult {
    pub file: String,
    pub result: ResultType,
    pub status: Option<String>,
    pub phase: Option<String>,
    pub errors_messages: Vec<String>,
    pub warnings_messages: Vec<String>,
}

impl ValidationResult {
    pub fn error(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            result: ResultType::Error,
            status: None,
            phase: None,
            errors_messages: vec![message.into()],
            warnings_messages: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    pub results: Vec<ValidationResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
