use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;

use crate::config::ServerConfig;
use crate::error::CheckerError;
use crate::models::{ResultType, StagedFile, ValidationResult};

const REPORT_SUFFIX: &str = ".filecheck";
const STDERR_TAIL: usize = 2000;

/// 按命名规范检查一组文件的能力
#[async_trait]
pub trait FileChecker: Send + Sync {
    async fn check(
        &self,
        files: &[StagedFile],
        spec: &str,
    ) -> Result<Vec<ValidationResult>, CheckerError>;
}

/// 通过 `java -jar` 调用 Argo 文件检查器
#[derive(Debug, Clone)]
pub struct JarFileChecker {
    pub java_bin: String,
    pub jar_path: PathBuf,
    pub specs_path: PathBuf,
    pub timeout: Duration,
}

impl JarFileChecker {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            java_bin: config.java_bin.clone(),
            jar_path: config.jar_path.clone(),
            specs_path: config.specs_path.clone(),
            timeout: config.check_timeout,
        }
    }

    // 调用前的输入检查，不启动子进程
    fn preflight<'a>(
        &self,
        files: &'a [StagedFile],
        spec: &str,
    ) -> Result<(Vec<&'a StagedFile>, Vec<&'a StagedFile>), CheckerError> {
        if files.is_empty() {
            return Err(CheckerError::EmptyInput);
        }

        let (present, missing): (Vec<_>, Vec<_>) = files.iter().partition(|f| f.path.is_file());
        if present.is_empty() {
            return Err(CheckerError::FilesNotFound(
                files.iter().map(|f| f.original_name.clone()).collect(),
            ));
        }

        if !self.specs_path.is_dir() {
            return Err(CheckerError::SpecsNotFound(self.specs_path.display().to_string()));
        }
        // 规范名称是否存在由检查器自己判断（非零退出码 → Process）
        if spec.is_empty() || spec.contains('/') || spec.contains("..") {
            return Err(CheckerError::InvalidSpecName(spec.to_string()));
        }

        Ok((present, missing))
    }
}

#[async_trait]
impl FileChecker for JarFileChecker {
    async fn check(
        &self,
        files: &[StagedFile],
        spec: &str,
    ) -> Result<Vec<ValidationResult>, CheckerError> {
        let (present, missing) = self.preflight(files, spec)?;

        // 检查器一次只接受一个输入目录
        let input_dir = present[0]
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let output_dir = tempfile::tempdir()?;

        let mut command = Command::new(&self.java_bin);
        command
            .arg("-jar")
            .arg(&self.jar_path)
            .arg(spec)
            .arg(&self.specs_path)
            .arg(output_dir.path())
            .arg(&input_dir)
            .args(present.iter().map(|f| f.disk_name()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        log::info!(
            "调用检查器: {} 个文件, 规范 '{}', 输入目录 {}",
            present.len(),
            spec,
            input_dir.display()
        );

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(CheckerError::Spawn)?,
            Err(_) => return Err(CheckerError::Timeout(self.timeout.as_secs())),
        };

        let mut results = Vec::with_capacity(files.len());
        let mut reports_found = 0usize;
        for file in &present {
            let report_path = output_dir
                .path()
                .join(format!("{}{}", file.disk_name(), REPORT_SUFFIX));
            match tokio::fs::read_to_string(&report_path).await {
                Ok(report) => {
                    reports_found += 1;
                    results.push(parse_report(&file.original_name, &report));
                }
                Err(e) => {
                    log::warn!("缺少检查报告 {}: {}", report_path.display(), e);
                    results.push(ValidationResult::error(
                        file.original_name.clone(),
                        "file checker produced no report for this file",
                    ));
                }
            }
        }

        if reports_found == 0 && !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            let tail_start = stderr.len().saturating_sub(STDERR_TAIL);
            let tail = stderr
                .get(tail_start..)
                .unwrap_or(stderr.as_str())
                .trim()
                .to_string();
            return Err(CheckerError::Process {
                code: output.status.code(),
                stderr: tail,
            });
        }

        for file in missing {
            results.push(ValidationResult::error(
                file.original_name.clone(),
                format!("file not found: {}", file.path.display()),
            ));
        }

        Ok(results)
    }
}

fn element_regex(tag: &str) -> Regex {
    Regex::new(&format!(r"(?s)<{tag}(?:\s[^>]*)?>(.*?)</{tag}>")).expect("static regex")
}

fn status_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| element_regex("status"))
}

fn phase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| element_regex("phase"))
}

fn error_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| element_regex("error"))
}

fn warning_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| element_regex("warning"))
}

fn unescape(text: &str) -> String {
    text.trim()
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn first(re: &Regex, report: &str) -> Option<String> {
    re.captures(report)
        .and_then(|c| c.get(1))
        .map(|m| unescape(m.as_str()))
        .filter(|s| !s.is_empty())
}

fn all(re: &Regex, report: &str) -> Vec<String> {
    re.captures_iter(report)
        .filter_map(|c| c.get(1))
        .map(|m| unescape(m.as_str()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// 解析单个文件的检查报告
pub fn parse_report(file: &str, report: &str) -> ValidationResult {
    let status = first(status_re(), report);
    let result = status
        .as_deref()
        .map(ResultType::from_status)
        .unwrap_or(ResultType::Error);

    ValidationResult {
        file: file.to_string(),
        result,
        status,
        phase: first(phase_re(), report),
        errors_messages: all(error_re(), report),
        warnings_messages: all(warning_re(), report),
    }
}
