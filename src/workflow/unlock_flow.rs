//! 单份手稿的解锁流程 - 流程层
//!
//! 核心职责：定义"一份手稿"从待处理到解码完毕的完整状态机
//!
//! 流程顺序：
//! 1. 解析解锁码（前驱传码 / 清单预置 / 远端挑战）
//! 2. 填码 → 解锁 → 有界等待确认
//! 3. 下载 PDF → 修复 → 提取后继条目的解锁码
//!
//! 流程层不持有页面资源，也不认识任何 DOM 选择器，
//! 只依赖 `PortalSession` 与 `ChallengeFetch` 两组能力。

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::PortalSession;
use crate::models::{ChallengeRequest, CodeSource, ItemStatus, Manuscript};
use crate::services::{cipher_solver, pdf_decoder, ArtifactStore, ChallengeFetch};
use crate::utils::logging::truncate_text;
use crate::workflow::item_ctx::ItemCtx;

/// 单份手稿的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// 解锁并下载完成，还从 PDF 解码出了要交给后继的码
    UnlockedWithCode(String),
    /// 解锁并下载完成，没有（或不需要）向后传的码
    Unlocked,
    /// 本次跳过该条目（挑战不可用、无码可用等）
    Skipped,
    /// 确认超时等需要人工检查的情况，整个流水线应当停下
    Paused,
}

/// 手稿解锁流程
///
/// - 编排单份手稿的完整状态机
/// - 决定解锁码从哪里来、何时下载、何时解码
/// - 不持有任何页面资源
/// - 只依赖业务能力（services）
pub struct UnlockFlow<C: ChallengeFetch> {
    challenge_client: C,
    artifact_store: ArtifactStore,
    default_seed_code: String,
    confirm_timeout: Duration,
    verbose_logging: bool,
}

impl<C: ChallengeFetch> UnlockFlow<C> {
    /// 创建新的解锁流程
    pub fn new(challenge_client: C, artifact_store: ArtifactStore, config: &Config) -> Self {
        Self {
            challenge_client,
            artifact_store,
            default_seed_code: config.default_seed_code.clone(),
            confirm_timeout: Duration::from_secs(config.confirm_timeout_secs),
            verbose_logging: config.verbose_logging,
        }
    }

    pub async fn run<S: PortalSession>(
        &self,
        session: &S,
        item: &mut Manuscript,
        ctx: &ItemCtx,
    ) -> AppResult<FlowOutcome> {
        info!("{} 📜 开始处理 ({})", ctx, item.century);

        if !session.card_visible(&item.name).await? {
            return Err(AppError::element_not_found(&item.name, "card"));
        }

        // 第二页的卡片带文档弹窗，解锁前先读一眼
        if item.page >= 2 {
            if let Some(text) = session.read_documentation(&item.name).await? {
                info!("{} 📋 文档内容: {}", ctx, truncate_text(text.trim(), 200));
            }
        }

        if item.source == CodeSource::PreUnlocked {
            info!("{} 🔓 初始即已解锁，直接下载", ctx);
            item.status = ItemStatus::Unlocked;
        } else {
            // ========== 解析阶段：确定解锁码来源 ==========
            item.status = ItemStatus::CodeResolving;
            let code = match self.resolve_code(item, ctx).await? {
                Some(code) => code,
                None => {
                    item.status = ItemStatus::Skipped;
                    return Ok(FlowOutcome::Skipped);
                }
            };

            // ========== 应用阶段：填码并点击解锁 ==========
            info!("{} 📝 应用解锁码 {}", ctx, code);
            session.apply_code(&item.name, &code).await?;
            item.code = Some(code);
            item.status = ItemStatus::CodeApplied;

            // ========== 验证阶段：有界等待确认文案 ==========
            item.status = ItemStatus::Verifying;
            if !session.wait_unlock_confirmed(self.confirm_timeout).await? {
                item.status = ItemStatus::VerifyTimedOut;
                warn!(
                    "{} ⚠️ 未在 {} 秒内确认解锁，等待人工检查",
                    ctx,
                    self.confirm_timeout.as_secs()
                );
                return Ok(FlowOutcome::Paused);
            }
            info!("{} ✅ 解锁已确认", ctx);
            item.status = ItemStatus::Unlocked;
            session.dismiss_confirmation().await?;
        }

        // ========== 下载阶段 ==========
        item.status = ItemStatus::Downloading;
        let dest = self.artifact_store.path_for(&item.pdf_index);
        if let Err(e) = session.download_pdf(&item.name, &dest).await {
            // 下载失败意味着后继条目无法解码，上抛给编排层记录
            item.status = ItemStatus::DownloadFailed;
            return Err(e);
        }
        item.status = ItemStatus::ArtifactReady;

        // ========== 解码阶段：为后继条目提取解锁码 ==========
        let Some(dependent) = item.dependent.clone() else {
            return Ok(FlowOutcome::Unlocked);
        };

        item.status = ItemStatus::Decoding;
        let raw = match self.artifact_store.read(&item.pdf_index).await {
            Ok(raw) => raw,
            Err(e) => {
                item.status = ItemStatus::ExtractionFailed;
                warn!("{} ⚠️ 读取刚下载的 PDF 失败: {}", ctx, e);
                return Ok(FlowOutcome::Unlocked);
            }
        };

        match pdf_decoder::decode_unlock_code(&raw) {
            Ok(code) => {
                item.status = ItemStatus::CodeExtracted;
                info!("{} 🔑 从 PDF 提取到解锁码 {} (交给 {})", ctx, code, dependent);
                Ok(FlowOutcome::UnlockedWithCode(code))
            }
            Err(e) => {
                // 修复失败与没匹配到码走同一条路：后继条目改用自己的兜底
                item.status = ItemStatus::ExtractionFailed;
                warn!("{} ⚠️ PDF 解码失败: {}，后继条目改走兜底路径", ctx, e);
                Ok(FlowOutcome::Unlocked)
            }
        }
    }

    /// 确定该条目的解锁码
    ///
    /// 优先级：已持有的码（前驱传码或清单预置）> 远端挑战。
    /// 返回 `None` 表示本次没有可用的码，条目跳过。
    async fn resolve_code(&self, item: &Manuscript, ctx: &ItemCtx) -> AppResult<Option<String>> {
        if let Some(code) = &item.code {
            match item.source {
                CodeSource::Preset => info!("{} 🔑 使用清单预置的解锁码", ctx),
                CodeSource::Propagated => info!("{} 🔑 使用前驱传来的解锁码", ctx),
                _ => info!("{} 🔑 使用已持有的解锁码", ctx),
            }
            return Ok(Some(code.clone()));
        }

        match item.source {
            CodeSource::Challenge => self.resolve_via_challenge(item, ctx).await,
            _ => {
                warn!("{} ⚠️ 没有可用的解锁码", ctx);
                Ok(None)
            }
        }
    }

    /// 通过远端挑战求解解锁码
    async fn resolve_via_challenge(
        &self,
        item: &Manuscript,
        ctx: &ItemCtx,
    ) -> AppResult<Option<String>> {
        let seed = self.challenge_seed(item, ctx).await;
        let request = ChallengeRequest::new(&item.name, seed);

        // 单次请求，不重试：挑战不可用只终止该条目的解锁尝试
        let payload = match self.challenge_client.fetch_challenge(&request).await {
            Ok(payload) => payload,
            Err(e) => {
                error!("{} ❌ 挑战接口不可用: {}", ctx, e);
                return Ok(None);
            }
        };

        if self.verbose_logging {
            debug!(
                "{} vault: {:?}, targets: {:?}",
                ctx, payload.vault, payload.targets
            );
        }

        let code = cipher_solver::solve(&payload.vault, &payload.targets);
        if code.is_empty() {
            warn!("{} ⚠️ 挑战求解结果为空", ctx);
            return Ok(None);
        }

        info!("{} ✅ 挑战求解得到解锁码: {}", ctx, code);
        Ok(Some(code))
    }

    /// 挑战请求的种子码
    ///
    /// 先尝试从前置手稿的 PDF 里解出来；前置不可用或解不出时
    /// 退回配置的默认种子码。
    async fn challenge_seed(&self, item: &Manuscript, ctx: &ItemCtx) -> String {
        if let Some(seed_from) = &item.seed_from {
            match self.artifact_store.read(seed_from).await {
                Ok(raw) => match pdf_decoder::decode_unlock_code(&raw) {
                    Ok(code) => {
                        info!("{} 🔑 从前置手稿 {} 提取到种子码: {}", ctx, seed_from, code);
                        return code;
                    }
                    Err(e) => {
                        warn!("{} ⚠️ 前置手稿 {} 的 PDF 解码失败: {}", ctx, seed_from, e)
                    }
                },
                Err(_) => warn!("{} ⚠️ 前置手稿 {} 的 PDF 不可用", ctx, seed_from),
            }
        }

        info!("{} 🔑 使用默认种子码: {}", ctx, self.default_seed_code);
        self.default_seed_code.clone()
    }
}
