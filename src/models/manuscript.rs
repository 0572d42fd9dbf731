use serde::{Deserialize, Serialize};

/// 条目在解锁状态机中的位置
///
/// `Pending → CodeResolving → CodeApplied → Verifying → {Unlocked, VerifyTimedOut}`
/// `Unlocked → Downloading → {ArtifactReady, DownloadFailed}`
/// `ArtifactReady → Decoding → {CodeExtracted, ExtractionFailed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Pending,
    CodeResolving,
    CodeApplied,
    Verifying,
    Unlocked,
    /// 提交了解锁码但在时限内未观察到确认，等待人工处理
    VerifyTimedOut,
    Downloading,
    ArtifactReady,
    DownloadFailed,
    Decoding,
    CodeExtracted,
    ExtractionFailed,
    /// 本次运行中放弃处理（例如挑战接口不可用）
    Skipped,
}

impl ItemStatus {
    /// 是否已经走到终点（成功或失败），不再需要处理
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemStatus::VerifyTimedOut
                | ItemStatus::DownloadFailed
                | ItemStatus::CodeExtracted
                | ItemStatus::ExtractionFailed
                | ItemStatus::Skipped
        )
    }
}

/// 解锁码的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeSource {
    /// 初始即已解锁，无需码
    PreUnlocked,
    /// 清单中预置了解锁码
    Preset,
    /// 等待前驱条目解码后传递
    Propagated,
    /// 通过远端解密挑战求得
    Challenge,
}

/// 工作清单中的一份手稿
///
/// 由清单构建时创建，编排层在运行中原地修改状态与解锁码，绝不删除。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manuscript {
    /// 稳定标识，同时决定下载文件名（`<pdf_index>.pdf`）
    pub pdf_index: String,
    /// 门户卡片上的显示名称（精确匹配用）
    pub name: String,
    /// 世纪描述，仅用于展示
    pub century: String,
    /// 所在门户页码
    pub page: u32,
    /// 在该页中的位置
    pub page_index: usize,
    /// 状态机位置
    #[serde(default)]
    pub status: ItemStatus,
    /// 解锁码（解析出来后写入，只赋值一次）
    #[serde(default)]
    pub code: Option<String>,
    /// 解锁码来源
    pub source: CodeSource,
    /// 显式后继：本条目解码出的码要交给哪个条目
    ///
    /// 链式依赖不靠位置 `i+1` 推断，终端解码者可以指向同页的非相邻条目。
    #[serde(default)]
    pub dependent: Option<String>,
    /// 挑战种子的前置条目：先尝试从它的 PDF 解出种子码
    #[serde(default)]
    pub seed_from: Option<String>,
}

impl Manuscript {
    /// 是否还在等待前驱传码
    pub fn awaiting_propagation(&self) -> bool {
        self.code.is_none() && self.source == CodeSource::Propagated
    }
}
