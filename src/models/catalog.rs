//! 手稿清单
//!
//! 内置清单对应藏书阁当前的五份手稿；也可以通过 TOML 文件覆盖，
//! 以便门户内容变化时不改代码。

use crate::models::manuscript::{CodeSource, Manuscript};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// TOML 清单文件的顶层结构
#[derive(Debug, Deserialize)]
struct CatalogFile {
    manuscript: Vec<Manuscript>,
}

/// 内置的默认工作清单
///
/// 依赖边全部显式给出：第一页是线性链（101 → 102 → 103），
/// 第二页的 Necronomicon 走挑战路径，解码后把码交给同页的
/// Malleus Maleficarum（非相邻后继）。
pub fn default_worklist() -> Vec<Manuscript> {
    vec![
        Manuscript {
            pdf_index: "manuscrito-101".to_string(),
            name: "Codex Aureus de Echternach".to_string(),
            century: "Siglo XIV".to_string(),
            page: 1,
            page_index: 0,
            status: Default::default(),
            code: None,
            source: CodeSource::PreUnlocked,
            dependent: Some("manuscrito-102".to_string()),
            seed_from: None,
        },
        Manuscript {
            pdf_index: "manuscrito-102".to_string(),
            name: "Libro de Kells".to_string(),
            century: "Siglo XV".to_string(),
            page: 1,
            page_index: 1,
            status: Default::default(),
            code: Some("AUREUS1350".to_string()),
            source: CodeSource::Preset,
            dependent: Some("manuscrito-103".to_string()),
            seed_from: None,
        },
        Manuscript {
            pdf_index: "manuscrito-103".to_string(),
            name: "Codex Seraphinianus".to_string(),
            century: "Siglo XVI".to_string(),
            page: 1,
            page_index: 2,
            status: Default::default(),
            code: None,
            source: CodeSource::Propagated,
            dependent: None,
            seed_from: None,
        },
        Manuscript {
            pdf_index: "manuscrito-104".to_string(),
            name: "Malleus Maleficarum".to_string(),
            century: "Siglo XVIII".to_string(),
            page: 2,
            page_index: 0,
            status: Default::default(),
            code: None,
            source: CodeSource::Propagated,
            dependent: None,
            seed_from: None,
        },
        Manuscript {
            pdf_index: "manuscrito-105".to_string(),
            name: "Necronomicon".to_string(),
            century: "Siglo XVII".to_string(),
            page: 2,
            page_index: 1,
            status: Default::default(),
            code: None,
            source: CodeSource::Challenge,
            dependent: Some("manuscrito-104".to_string()),
            seed_from: Some("manuscrito-103".to_string()),
        },
    ]
}

/// 从 TOML 文件加载工作清单
pub async fn load_worklist_from_toml(path: &Path) -> Result<Vec<Manuscript>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取清单文件: {}", path.display()))?;

    let catalog: CatalogFile = toml::from_str(&content)
        .with_context(|| format!("无法解析清单文件: {}", path.display()))?;

    Ok(catalog.manuscript)
}

/// 按配置取得工作清单：指定了清单文件就加载它，否则用内置清单
pub async fn resolve_worklist(catalog_file: Option<&str>) -> Result<Vec<Manuscript>> {
    match catalog_file {
        Some(path) => {
            tracing::info!("📁 正在加载清单文件: {}", path);
            let worklist = load_worklist_from_toml(Path::new(path)).await?;
            tracing::info!("✓ 清单加载完成，共 {} 份手稿", worklist.len());
            Ok(worklist)
        }
        None => Ok(default_worklist()),
    }
}
