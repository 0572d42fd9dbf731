//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责工作清单的遍历与码的传递，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `chain_processor` - 解锁链处理器
//! - 管理应用生命周期（初始化、登录、运行、统计）
//! - 严格串行地遍历工作清单（队列驱动）
//! - 翻页耦合：目标页与当前页不同时才请求翻页
//! - 沿显式依赖边传递解码出的解锁码
//! - 确认超时或控件缺失时暂停流水线等待人工检查
//!
//! ## 层次关系
//!
//! ```text
//! chain_processor (处理 Vec<Manuscript>)
//!     ↓
//! workflow::UnlockFlow (处理单个 Manuscript)
//!     ↓
//! services (能力层：challenge / solver / pdf / store)
//!     ↓
//! infrastructure (基础设施：PortalSession)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：chain_processor 管清单与传码，UnlockFlow 管单个条目
//! 2. **资源隔离**：只有编排层持有 Browser
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **无并行**：下载文件名按条目标识复用，串行是正确性前提

pub mod chain_processor;

// 重新导出主要类型
pub use chain_processor::{process_worklist, App, RunStats};
