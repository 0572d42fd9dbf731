use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 浏览器相关错误
    Browser(BrowserError),
    /// 解密挑战接口错误
    Challenge(ChallengeError),
    /// 手稿文件错误
    Artifact(ArtifactError),
    /// 登录错误
    Login(LoginError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Browser(e) => write!(f, "浏览器错误: {}", e),
            AppError::Challenge(e) => write!(f, "挑战接口错误: {}", e),
            AppError::Artifact(e) => write!(f, "文件错误: {}", e),
            AppError::Login(e) => write!(f, "登录错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Browser(e) => Some(e),
            AppError::Challenge(e) => Some(e),
            AppError::Artifact(e) => Some(e),
            AppError::Login(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 浏览器相关错误
#[derive(Debug)]
pub enum BrowserError {
    /// 启动浏览器失败
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 翻页失败（结构性错误，整个流水线停止）
    NavigationFailed {
        page: u32,
        detail: String,
    },
    /// 卡片或控件缺失（需要人工检查）
    ElementNotFound {
        card: String,
        control: String,
    },
    /// 执行脚本失败
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// PDF 下载失败（该条目的后继无法解码）
    DownloadFailed {
        card: String,
        detail: String,
    },
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserError::LaunchFailed { source } => {
                write!(f, "启动浏览器失败: {}", source)
            }
            BrowserError::NavigationFailed { page, detail } => {
                write!(f, "导航到第 {} 页失败: {}", page, detail)
            }
            BrowserError::ElementNotFound { card, control } => {
                write!(f, "未找到元素 (卡片: {}, 控件: {})", card, control)
            }
            BrowserError::ScriptExecutionFailed { source } => {
                write!(f, "执行脚本失败: {}", source)
            }
            BrowserError::DownloadFailed { card, detail } => {
                write!(f, "下载 {} 的 PDF 失败: {}", card, detail)
            }
        }
    }
}

impl std::error::Error for BrowserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrowserError::LaunchFailed { source }
            | BrowserError::ScriptExecutionFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 解密挑战接口错误
///
/// 任一变体都意味着该条目的解锁尝试终止：单次请求，不做重试。
#[derive(Debug)]
pub enum ChallengeError {
    /// 网络请求失败
    RequestFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 远端返回失败或响应结构不符
    BadResponse {
        endpoint: String,
        message: String,
    },
    /// JSON 解析失败
    JsonParseFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ChallengeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChallengeError::RequestFailed { endpoint, source } => {
                write!(f, "挑战请求失败 ({}): {}", endpoint, source)
            }
            ChallengeError::BadResponse { endpoint, message } => {
                write!(f, "挑战接口返回失败 ({}): {}", endpoint, message)
            }
            ChallengeError::JsonParseFailed { source } => {
                write!(f, "JSON解析失败: {}", source)
            }
        }
    }
}

impl std::error::Error for ChallengeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChallengeError::RequestFailed { source, .. }
            | ChallengeError::JsonParseFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 手稿文件错误
#[derive(Debug)]
pub enum ArtifactError {
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
            ArtifactError::WriteFailed { path, source } => {
                write!(f, "写入文件失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for ArtifactError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArtifactError::ReadFailed { source, .. }
            | ArtifactError::WriteFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 登录错误
#[derive(Debug)]
pub enum LoginError {
    /// 登录后未出现藏书阁标志元素，整个运行终止
    LandmarkMissing {
        landmark: String,
    },
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginError::LandmarkMissing { landmark } => {
                write!(f, "登录后未检测到标志元素: {}", landmark)
            }
        }
    }
}

impl std::error::Error for LoginError {}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Challenge(ChallengeError::JsonParseFailed {
            source: Box::new(err),
        })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err.url().map(|u| u.to_string()).unwrap_or_default();
        AppError::Challenge(ChallengeError::RequestFailed {
            endpoint,
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Artifact(ArtifactError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建元素缺失错误
    pub fn element_not_found(card: impl Into<String>, control: impl Into<String>) -> Self {
        AppError::Browser(BrowserError::ElementNotFound {
            card: card.into(),
            control: control.into(),
        })
    }

    /// 创建翻页失败错误
    pub fn navigation_failed(page: u32, detail: impl Into<String>) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            page,
            detail: detail.into(),
        })
    }

    /// 创建下载失败错误
    pub fn download_failed(card: impl Into<String>, detail: impl Into<String>) -> Self {
        AppError::Browser(BrowserError::DownloadFailed {
            card: card.into(),
            detail: detail.into(),
        })
    }

    /// 创建挑战接口返回失败错误
    pub fn challenge_bad_response(
        endpoint: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        AppError::Challenge(ChallengeError::BadResponse {
            endpoint: endpoint.into(),
            message: message.into(),
        })
    }

    /// 是否属于需要人工检查的错误（卡片或控件缺失）
    pub fn needs_inspection(&self) -> bool {
        matches!(self, AppError::Browser(BrowserError::ElementNotFound { .. }))
    }

    /// 是否属于结构性导航错误（整个运行停止）
    pub fn is_navigation_failure(&self) -> bool {
        matches!(self, AppError::Browser(BrowserError::NavigationFailed { .. }))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
