/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 藏书阁登录页 URL
    pub portal_url: String,
    /// 登录邮箱
    pub login_email: String,
    /// 登录密码
    pub login_password: String,
    /// PDF 下载目录
    pub downloads_dir: String,
    /// 解密挑战 API 基础 URL
    pub challenge_api_base_url: String,
    /// 挑战请求的兜底种子码（前置 PDF 不可用时使用）
    pub default_seed_code: String,
    /// 手稿清单 TOML 文件（为空时使用内置清单）
    pub catalog_file: Option<String>,
    /// 解锁确认的等待上限（秒）
    pub confirm_timeout_secs: u64,
    /// 页面操作之间的稳定等待（毫秒）
    pub settle_delay_ms: u64,
    /// PDF 下载的等待上限（秒）
    pub download_timeout_secs: u64,
    /// 是否无头模式
    pub headless: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal_url: "https://pruebatecnica-sherpa-production.up.railway.app/login"
                .to_string(),
            login_email: "monje@sherpa.local".to_string(),
            login_password: "cript@123".to_string(),
            downloads_dir: "downloads".to_string(),
            challenge_api_base_url: "https://backend-production-9d875.up.railway.app"
                .to_string(),
            default_seed_code: "SERAPH1520".to_string(),
            catalog_file: None,
            confirm_timeout_secs: 5,
            settle_delay_ms: 2000,
            download_timeout_secs: 30,
            headless: false,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            portal_url: std::env::var("PORTAL_URL").unwrap_or(default.portal_url),
            login_email: std::env::var("LOGIN_EMAIL").unwrap_or(default.login_email),
            login_password: std::env::var("LOGIN_PASSWORD").unwrap_or(default.login_password),
            downloads_dir: std::env::var("DOWNLOADS_DIR").unwrap_or(default.downloads_dir),
            challenge_api_base_url: std::env::var("CHALLENGE_API_BASE_URL")
                .unwrap_or(default.challenge_api_base_url),
            default_seed_code: std::env::var("DEFAULT_SEED_CODE")
                .unwrap_or(default.default_seed_code),
            catalog_file: std::env::var("CATALOG_FILE").ok(),
            confirm_timeout_secs: std::env::var("CONFIRM_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.confirm_timeout_secs),
            settle_delay_ms: std::env::var("SETTLE_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.settle_delay_ms),
            download_timeout_secs: std::env::var("DOWNLOAD_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.download_timeout_secs),
            headless: std::env::var("HEADLESS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.headless),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
        }
    }
}
