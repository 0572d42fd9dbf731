//! # Unlock Manuscript Download
//!
//! 一个自动化解锁并下载藏书阁手稿 PDF 的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `PortalSession` - 门户会话能力（按手稿名操作控件组）
//! - `CryptSession` - 唯一的 page owner，chromiumoxide 实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单份手稿
//! - `ChallengeClient` - 远端解密挑战获取能力
//! - `cipher_solver` - 挑战求解（按下标取符号拼接）
//! - `pdf_decoder` - PDF 修复与解锁码提取能力
//! - `ArtifactStore` - 下载文件的确定性命名与读写能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一份手稿"的完整处理流程
//! - `ItemCtx` - 上下文封装（序号 + 名称 + 页码）
//! - `UnlockFlow` - 状态机编排（解码来源 → 解锁 → 下载 → 提取）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/chain_processor` - 清单遍历、翻页耦合与码的传递
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::launch_browser_and_page;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{CryptSession, PortalSession};
pub use models::{ChallengePayload, ChallengeRequest, CodeSource, ItemStatus, Manuscript};
pub use orchestrator::{process_worklist, App, RunStats};
pub use services::{ArtifactStore, ChallengeClient, ChallengeFetch};
pub use workflow::{FlowOutcome, ItemCtx, UnlockFlow};
