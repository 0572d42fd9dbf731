use serde::{Deserialize, Serialize};

/// 发往挑战接口的请求：哪本书、用哪个码
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeRequest {
    pub book_title: String,
    pub unlock_code: String,
}

impl ChallengeRequest {
    pub fn new(book_title: impl Into<String>, unlock_code: impl Into<String>) -> Self {
        Self {
            book_title: book_title.into(),
            unlock_code: unlock_code.into(),
        }
    }
}

/// 挑战载荷：有序符号表（vault）加目标下标序列（targets）
///
/// 约定：经过校验的目标下标必须落在 vault 范围内；越界下标按
/// 单字符可恢复失败处理，跳过而不是中断。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChallengePayload {
    pub vault: Vec<char>,
    pub targets: Vec<i64>,
}

impl ChallengePayload {
    pub fn new(vault: Vec<char>, targets: Vec<i64>) -> Self {
        Self { vault, targets }
    }
}
