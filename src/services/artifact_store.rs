//! 下载文件仓库 - 业务能力层
//!
//! 只负责"手稿 PDF 存在哪里、叫什么名字"：文件名由条目标识决定，
//! 跨次运行保持稳定，重跑直接覆盖。不做并发写 —— 整个流水线是
//! 串行的，文件名复用在并行下会互相踩踏。

use crate::error::{AppError, AppResult, ArtifactError};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// 手稿 PDF 仓库
pub struct ArtifactStore {
    downloads_dir: PathBuf,
}

impl ArtifactStore {
    /// 创建仓库（不触碰文件系统）
    pub fn new(downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            downloads_dir: downloads_dir.into(),
        }
    }

    /// 确保下载目录存在
    pub async fn ensure_dir(&self) -> AppResult<()> {
        fs::create_dir_all(&self.downloads_dir).await.map_err(|e| {
            AppError::Artifact(ArtifactError::WriteFailed {
                path: self.downloads_dir.display().to_string(),
                source: Box::new(e),
            })
        })
    }

    /// 下载目录
    pub fn dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// 条目对应的确定性文件路径：`<downloads_dir>/<pdf_index>.pdf`
    pub fn path_for(&self, pdf_index: &str) -> PathBuf {
        self.downloads_dir.join(format!("{}.pdf", pdf_index))
    }

    /// 该条目的 PDF 是否已经落盘
    pub fn exists(&self, pdf_index: &str) -> bool {
        self.path_for(pdf_index).exists()
    }

    /// 读取条目的 PDF 原始字节
    pub async fn read(&self, pdf_index: &str) -> AppResult<Vec<u8>> {
        let path = self.path_for(pdf_index);
        debug!("读取手稿文件: {}", path.display());

        fs::read(&path).await.map_err(|e| {
            AppError::Artifact(ArtifactError::ReadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_path() {
        let store = ArtifactStore::new("downloads");
        let path = store.path_for("manuscrito-103");
        assert_eq!(path, PathBuf::from("downloads/manuscrito-103.pdf"));

        // 同一标识永远得到同一路径
        assert_eq!(path, store.path_for("manuscrito-103"));
    }

    #[tokio::test]
    async fn test_read_missing_artifact() {
        let store = ArtifactStore::new(std::env::temp_dir().join("unlock_store_test"));
        let err = store.read("manuscrito-999").await.unwrap_err();
        assert!(matches!(err, AppError::Artifact(_)));
    }
}
