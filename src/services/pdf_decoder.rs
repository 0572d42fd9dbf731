//! PDF 修复与解码 - 业务能力层
//!
//! 藏书阁下载的 PDF 结构经常是坏的：先把字节流按分页文档解析一遍、
//! 重建对象表再序列化成新的字节流，然后从提取出的正文里找解锁码。
//! 修复失败不是致命错误 —— 返回 `None`，调用方跳过该文件，后继条目
//! 改走自己的兜底路径。

use lopdf::Document;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

/// 解码失败的两种情况，下游对两者的处理完全一致：
/// 该条目不向后继传码。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("PDF 无法修复")]
    Unrepairable,
    #[error("正文中没有匹配到解锁码")]
    CodeNotFound,
}

/// 修复可能损坏的 PDF 字节流
///
/// 解析为分页文档后重建对象表（剔除不可达对象、重新编号），再整体
/// 序列化，页面顺序保持原样。任何解析或序列化失败都返回 `None`，
/// 不向外抛错。
pub fn repair_pdf(raw: &[u8]) -> Option<Vec<u8>> {
    let mut doc = Document::load_mem(raw).ok()?;

    let page_count = doc.get_pages().len();
    if page_count == 0 {
        warn!("⚠️ PDF 解析成功但没有任何页面");
        return None;
    }

    doc.prune_objects();
    doc.renumber_objects();

    let mut repaired = Vec::new();
    doc.save_to(&mut repaired).ok()?;

    debug!("PDF 修复完成: {} 页, {} 字节", page_count, repaired.len());
    Some(repaired)
}

/// 在正文中搜索解锁码
///
/// 先找第一段 5 位以上的大写字母/数字串；找不到再退回
/// "Código de acceso:" 标签后面的大写/数字串（`.` 容忍重音字母
/// 在提取时被损坏的情况）。先命中者胜，都没有则返回 `None`。
pub fn extract_code(text: &str) -> Option<String> {
    let primary = Regex::new(r"[A-Z0-9]{5,}").ok()?;
    if let Some(m) = primary.find(text) {
        return Some(m.as_str().to_string());
    }

    let labeled = Regex::new(r"C.digo de acceso: ([A-Z0-9]+)").ok()?;
    labeled
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// 修复 → 提取正文 → 匹配解锁码 的完整解码流程
pub fn decode_unlock_code(raw: &[u8]) -> Result<String, DecodeError> {
    let repaired = repair_pdf(raw).ok_or(DecodeError::Unrepairable)?;

    let text = pdf_extract::extract_text_from_mem(&repaired)
        .map_err(|_| DecodeError::Unrepairable)?;

    extract_code(&text).ok_or(DecodeError::CodeNotFound)
}
