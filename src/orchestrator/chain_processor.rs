//! 解锁链处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责工作清单的遍历与解锁码的传递。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：初始化日志文件、启动浏览器、创建门户会话
//! 2. **登录前置条件**：提交凭据，标志元素缺失则终止整个运行
//! 3. **清单遍历**：队列驱动、严格串行，前一条目定局后才开始下一条
//! 4. **翻页耦合**：目标页与当前页不同时才请求翻页
//! 5. **码的传递**：沿显式依赖边把解码出的码交给后继条目
//! 6. **暂停语义**：确认超时或控件缺失时停止遍历，等待人工检查
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个条目的细节，委托 `UnlockFlow`
//! - **资源所有者**：唯一持有 Browser 的模块
//! - **原地修改**：清单作为可变序列传入，状态在挂起点之间原地更新
//! - **无并行**：下载文件名按条目标识复用，串行是正确性前提

use crate::browser;
use crate::config::Config;
use crate::error::{AppError, LoginError};
use crate::infrastructure::crypt_session::LANDMARK_HEADING;
use crate::infrastructure::{CryptSession, PortalSession};
use crate::models::{self, ItemStatus, Manuscript};
use crate::services::{ArtifactStore, ChallengeClient, ChallengeFetch};
use crate::utils::logging;
use crate::workflow::{FlowOutcome, ItemCtx, UnlockFlow};
use anyhow::Result;
use chromiumoxide::Browser;
use std::collections::{HashSet, VecDeque};
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    _browser: Browser,
    session: CryptSession,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        logging::init_log_file(&config.output_log_file)?;

        log_startup(&config);

        // 启动浏览器并打开登录页
        let (browser, page) =
            browser::launch_browser_and_page(&config.portal_url, config.headless).await?;

        // 创建门户会话（持有 page）
        let session = CryptSession::new(page, &config);

        Ok(Self {
            config,
            _browser: browser,
            session,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunStats> {
        // 登录是整个运行的前置条件，标志元素缺失直接终止
        let logged_in = self
            .session
            .login(&self.config.login_email, &self.config.login_password)
            .await?;
        if !logged_in {
            return Err(AppError::Login(LoginError::LandmarkMissing {
                landmark: LANDMARK_HEADING.to_string(),
            })
            .into());
        }

        // 取得工作清单
        let mut worklist = models::resolve_worklist(self.config.catalog_file.as_deref()).await?;
        if worklist.is_empty() {
            warn!("⚠️ 工作清单为空，程序结束");
            return Ok(RunStats::default());
        }
        log_worklist_loaded(&worklist);

        // 准备下载目录与流程对象
        let store = ArtifactStore::new(&self.config.downloads_dir);
        store.ensure_dir().await?;
        let flow = UnlockFlow::new(ChallengeClient::new(&self.config), store, &self.config);

        // 遍历清单
        let stats = process_worklist(&self.session, &flow, &mut worklist).await?;

        print_final_stats(&stats, &self.config.output_log_file);

        Ok(stats)
    }
}

/// 按清单顺序处理全部条目
///
/// 队列驱动的串行遍历：
/// - 还在等前驱传码的条目暂缓到队尾，等过一轮还没有码就跳过
/// - 解码出码的条目沿显式依赖边把码交给后继
/// - 已经走过队列但又收到传码的后继会被重新排到队首
/// - 确认超时或控件缺失时停止遍历并把 `paused` 标记进统计
pub async fn process_worklist<S, C>(
    session: &S,
    flow: &UnlockFlow<C>,
    worklist: &mut Vec<Manuscript>,
) -> Result<RunStats>
where
    S: PortalSession,
    C: ChallengeFetch,
{
    let mut stats = RunStats {
        total: worklist.len(),
        ..Default::default()
    };

    let mut queue: VecDeque<usize> = (0..worklist.len()).collect();
    let mut deferred: HashSet<usize> = HashSet::new();
    // 登录后门户落在第一页
    let mut current_page: u32 = 1;
    let mut seq = 0usize;

    while let Some(idx) = queue.pop_front() {
        if worklist[idx].status.is_terminal() {
            continue;
        }

        // 等待前驱传码的条目暂缓一轮；码还不来就跳过
        if worklist[idx].awaiting_propagation() {
            let others_pending = queue.iter().any(|&j| !worklist[j].status.is_terminal());
            if others_pending && deferred.insert(idx) {
                info!("⏳ {} 仍在等待前驱传码，暂缓到队尾", worklist[idx].name);
                queue.push_back(idx);
            } else {
                warn!("⚠️ {} 没有等到前驱传来的解锁码，跳过", worklist[idx].name);
                worklist[idx].status = ItemStatus::Skipped;
                stats.skipped += 1;
            }
            continue;
        }

        // 翻页耦合：只在目标页不同时请求翻页；翻页失败是结构性错误
        if worklist[idx].page != current_page {
            session.goto_page(worklist[idx].page).await?;
            current_page = worklist[idx].page;
        }

        seq += 1;
        let ctx = {
            let item = &worklist[idx];
            ItemCtx::new(seq, item.name.clone(), item.pdf_index.clone(), item.page)
        };
        log_item_start(&ctx, stats.total);

        // 单条目失败在这里截获，不让它冲出清单循环
        match flow.run(session, &mut worklist[idx], &ctx).await {
            Ok(FlowOutcome::UnlockedWithCode(code)) => {
                stats.unlocked += 1;
                stats.decoded += 1;
                propagate_code(worklist, &mut queue, idx, &code);
            }
            Ok(FlowOutcome::Unlocked) => {
                stats.unlocked += 1;
            }
            Ok(FlowOutcome::Skipped) => {
                stats.skipped += 1;
            }
            Ok(FlowOutcome::Paused) => {
                error!("{} 🛑 流水线暂停，等待人工检查", ctx);
                stats.paused = true;
                break;
            }
            Err(e) if e.is_navigation_failure() => return Err(e.into()),
            Err(e) if e.needs_inspection() => {
                error!("{} 🛑 {}，流水线暂停等待人工检查", ctx, e);
                stats.paused = true;
                break;
            }
            Err(e) => {
                error!("{} ❌ 处理失败: {}", ctx, e);
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}

/// 沿显式依赖边传递解码出的解锁码
///
/// 依赖边可以指向非相邻条目；后继若已不在队列里（先于前驱走过了
/// 队列），重新排到队首优先处理。
fn propagate_code(
    worklist: &mut [Manuscript],
    queue: &mut VecDeque<usize>,
    from_idx: usize,
    code: &str,
) {
    let Some(dep_id) = worklist[from_idx].dependent.clone() else {
        return;
    };
    let Some(dep_idx) = worklist.iter().position(|m| m.pdf_index == dep_id) else {
        warn!("⚠️ 依赖边指向不存在的条目: {}", dep_id);
        return;
    };

    let from_name = worklist[from_idx].name.clone();
    let dep = &mut worklist[dep_idx];

    if dep.code.is_none() {
        dep.code = Some(code.to_string());
        info!("📋 {} 的解锁码已传递给 {}: {}", from_name, dep.name, code);
    } else {
        warn!("⚠️ {} 已持有解锁码，忽略来自 {} 的传递", dep.name, from_name);
    }

    if !queue.contains(&dep_idx) {
        match dep.status {
            ItemStatus::Skipped => {
                dep.status = ItemStatus::Pending;
                info!("🔁 {} 重新排到队首等待处理", dep.name);
                queue.push_front(dep_idx);
            }
            s if !s.is_terminal() => {
                info!("🔁 {} 重新排到队首等待处理", dep.name);
                queue.push_front(dep_idx);
            }
            _ => warn!("⚠️ {} 已处于终态，不再重新排队", dep.name),
        }
    }
}

/// 运行统计
#[derive(Debug, Default)]
pub struct RunStats {
    pub total: usize,
    pub unlocked: usize,
    pub decoded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// 遍历是否因需要人工检查而提前停止
    pub paused: bool,
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 解锁链处理模式");
    info!("📂 下载目录: {}", config.downloads_dir);
    info!("{}", "=".repeat(60));
}

fn log_worklist_loaded(worklist: &[Manuscript]) {
    info!("✓ 工作清单共 {} 份手稿", worklist.len());
    info!("💡 严格串行处理，前一份定局后再开始下一份\n");
}

fn log_item_start(ctx: &ItemCtx, total: usize) {
    info!("\n{}", "─".repeat(50));
    info!("{} 处理第 {}/{} 份手稿", ctx, ctx.index, total);
}

fn print_final_stats(stats: &RunStats, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 解锁: {}/{}", stats.unlocked, stats.total);
    info!("🔑 解码出后继码: {}", stats.decoded);
    info!("⏭️ 跳过: {}", stats.skipped);
    info!("❌ 失败: {}", stats.failed);
    if stats.paused {
        info!("🛑 流水线已暂停，浏览器保持打开以便人工检查");
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}
