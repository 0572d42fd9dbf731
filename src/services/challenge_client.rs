//! 解密挑战客户端 - 业务能力层
//!
//! 封装与远端挑战接口的单次交换：携带 (书名, 种子码) 发起 GET 请求，
//! 期望拿到 vault/targets 载荷。远端报失败或传输出错一律视为
//! 挑战不可用 —— 每个条目只请求一次，失败直接上抛给编排层跳过，
//! 绝不无限重试。

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{ChallengePayload, ChallengeRequest};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// 挑战获取能力
///
/// 流程层只依赖这个能力，不关心网络细节，测试时可以用脚本实现替换。
#[allow(async_fn_in_trait)]
pub trait ChallengeFetch {
    async fn fetch_challenge(&self, request: &ChallengeRequest) -> AppResult<ChallengePayload>;
}

/// 接口返回的顶层结构
#[derive(Debug, Deserialize)]
struct WireResponse {
    success: bool,
    #[serde(default)]
    challenge: Option<WireChallenge>,
}

/// 接口返回的挑战字段：vault 的符号以单字符字符串传输
#[derive(Debug, Deserialize)]
struct WireChallenge {
    vault: Vec<String>,
    targets: Vec<i64>,
}

/// 挑战 API 客户端
pub struct ChallengeClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChallengeClient {
    /// 创建新的挑战客户端
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.challenge_api_base_url.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/cipher/challenge", self.base_url)
    }
}

impl ChallengeFetch for ChallengeClient {
    async fn fetch_challenge(&self, request: &ChallengeRequest) -> AppResult<ChallengePayload> {
        let endpoint = self.endpoint();
        info!(
            "📡 正在为《{}》请求挑战载荷 (种子码: {})...",
            request.book_title, request.unlock_code
        );

        let response = self
            .http
            .get(&endpoint)
            .query(&[
                ("bookTitle", request.book_title.as_str()),
                ("unlockCode", request.unlock_code.as_str()),
            ])
            .send()
            .await?;

        let body: WireResponse = response.json().await?;
        let payload = into_payload(&endpoint, body)?;

        debug!(
            "挑战载荷: vault {} 个符号, targets {} 个下标",
            payload.vault.len(),
            payload.targets.len()
        );

        Ok(payload)
    }
}

/// 校验响应并转换为领域载荷
fn into_payload(endpoint: &str, body: WireResponse) -> AppResult<ChallengePayload> {
    if !body.success {
        return Err(AppError::challenge_bad_response(endpoint, "success = false"));
    }

    let challenge = body
        .challenge
        .ok_or_else(|| AppError::challenge_bad_response(endpoint, "缺少 challenge 字段"))?;

    let mut vault = Vec::with_capacity(challenge.vault.len());
    for symbol in &challenge.vault {
        match symbol.chars().next() {
            Some(c) => {
                if symbol.chars().count() > 1 {
                    warn!("⚠️ vault 符号 '{}' 多于一个字符，取首字符", symbol);
                }
                vault.push(c);
            }
            None => warn!("⚠️ vault 中出现空符号，跳过"),
        }
    }

    Ok(ChallengePayload::new(vault, challenge.targets))
}
