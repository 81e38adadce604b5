use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub port: String,
    pub root_path: String,
    pub input_root: PathBuf,
    pub specs_path: PathBuf,
    pub jar_path: PathBuf,
    pub java_bin: String,
    pub spec_name: String,
    pub max_concurrent_checks: usize,
    pub check_timeout: Duration,
    pub keep_request_dirs: bool,
    pub request_dir_max_age: Duration,
    pub cleanup_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: "8000".to_string(),
            root_path: String::new(),
            input_root: PathBuf::from("/home/app/input"),
            specs_path: PathBuf::from("/home/app/file_checker_spec"),
            jar_path: PathBuf::from("/home/app/file_checker_exec.jar"),
            java_bin: "java".to_string(),
            spec_name: "bodc".to_string(),
            max_concurrent_checks: 4,
            check_timeout: Duration::from_secs(300),
            keep_request_dirs: false,
            request_dir_max_age: Duration::from_secs(24 * 3600),
            cleanup_interval: Duration::from_secs(1800),
        }
    }
}

impl ServerConfig {
    /// 从命令行参数 (address, port) 和环境变量构建配置，只在启动时调用一次。
    pub fn new() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    pub fn from_sources<F>(args: &[String], env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        // args[0] is executable path; optional args: address, port
        let address = args.get(1).cloned().unwrap_or(defaults.address);
        let port = args.get(2).cloned().unwrap_or(defaults.port);

        let keep_request_dirs = match env("KEEP_REQUEST_DIRS") {
            Some(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
            None => defaults.keep_request_dirs,
        };

        Self {
            address,
            port,
            root_path: normalize_root_path(&env("API_ROOT_PATH").unwrap_or_default()),
            input_root: env("INPUT_ROOT").map(PathBuf::from).unwrap_or(defaults.input_root),
            specs_path: env("FILE_CHECKER_SPECS").map(PathBuf::from).unwrap_or(defaults.specs_path),
            jar_path: env("FILE_CHECKER_JAR").map(PathBuf::from).unwrap_or(defaults.jar_path),
            java_bin: env("JAVA_BIN").unwrap_or(defaults.java_bin),
            spec_name: env("SPEC_NAME")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.spec_name),
            max_concurrent_checks: parse_or(&env, "MAX_CONCURRENT_CHECKS", defaults.max_concurrent_checks)
                .max(1),
            check_timeout: Duration::from_secs(parse_or(
                &env,
                "CHECK_TIMEOUT_SECS",
                defaults.check_timeout.as_secs(),
            )),
            keep_request_dirs,
            request_dir_max_age: Duration::from_secs(parse_or(
                &env,
                "REQUEST_DIR_MAX_AGE_SECS",
                defaults.request_dir_max_age.as_secs(),
            )),
            cleanup_interval: defaults.cleanup_interval,
        }
    }

    pub async fn init_directories(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.input_root).await?;
        Ok(())
    }

    pub fn log_config(&self) {
        log::info!("配置信息:");
        log::info!("  - 路由前缀: '{}'", self.root_path);
        log::info!("  - 输入目录: {}", self.input_root.display());
        log::info!("  - 规范目录: {}", self.specs_path.display());
        log::info!("  - 检查器: {} -jar {}", self.java_bin, self.jar_path.display());
        log::info!("  - 规范名称: {}", self.spec_name);
        log::info!("  - 最大并发检查数: {}", self.max_concurrent_checks);
        log::info!("  - 检查超时: {}s", self.check_timeout.as_secs());
        log::info!("  - 保留请求目录: {}", self.keep_request_dirs);
    }
}

fn parse_or<F, T>(env: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    match env(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("无法解析环境变量 {}='{}'，使用默认值 {}", key, raw, default);
            default
        }),
        None => default,
    }
}

/// "" 和 "/" 都表示无前缀；其他值保证以 '/' 开头且不以 '/' 结尾。
pub fn normalize_root_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
