//! 解锁链场景测试
//!
//! 用脚本化的 `PortalSession` / `ChallengeFetch` 替身驱动
//! `process_worklist`，不需要浏览器和网络。替身的约定：
//! - 每张卡片登记一个"正确解锁码"，填对了确认文案才会出现
//! - 每张卡片登记一份下载时落盘的 PDF 字节
//! - 挑战替身记录收到的每个请求，便于断言种子码

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use unlock_manuscript_download::config::Config;
use unlock_manuscript_download::error::{AppError, AppResult};
use unlock_manuscript_download::infrastructure::PortalSession;
use unlock_manuscript_download::models::{
    ChallengePayload, ChallengeRequest, CodeSource, ItemStatus, Manuscript,
};
use unlock_manuscript_download::orchestrator::process_worklist;
use unlock_manuscript_download::services::{ArtifactStore, ChallengeFetch};
use unlock_manuscript_download::workflow::UnlockFlow;

// ========== 测试夹具 ==========

/// 生成一份每页一行文字的最小 PDF
fn minimal_pdf(page_texts: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in page_texts {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// 每个测试独立的下载目录
fn temp_downloads(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("unlock_chain_{}_{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn test_config(downloads: &Path) -> Config {
    Config {
        downloads_dir: downloads.display().to_string(),
        ..Config::default()
    }
}

fn manuscript(
    pdf_index: &str,
    name: &str,
    page: u32,
    page_index: usize,
    source: CodeSource,
) -> Manuscript {
    Manuscript {
        pdf_index: pdf_index.to_string(),
        name: name.to_string(),
        century: "Siglo XV".to_string(),
        page,
        page_index,
        status: ItemStatus::Pending,
        code: None,
        source,
        dependent: None,
        seed_from: None,
    }
}

// ========== 门户会话替身 ==========

#[derive(Default)]
struct ScriptedSession {
    /// 卡片 -> 正确解锁码；填对了确认文案才会出现
    expected_codes: HashMap<String, String>,
    /// 卡片 -> 下载时落盘的 PDF 字节
    artifacts: HashMap<String, Vec<u8>>,
    /// 页面上找不到的卡片
    missing_cards: HashSet<String>,
    applied: RefCell<Vec<(String, String)>>,
    downloads: RefCell<Vec<String>>,
    pages_visited: RefCell<Vec<u32>>,
    last_apply_ok: RefCell<bool>,
}

impl PortalSession for ScriptedSession {
    async fn login(&self, _email: &str, _password: &str) -> AppResult<bool> {
        Ok(true)
    }

    async fn goto_page(&self, page_number: u32) -> AppResult<()> {
        self.pages_visited.borrow_mut().push(page_number);
        Ok(())
    }

    async fn card_visible(&self, card_name: &str) -> AppResult<bool> {
        Ok(!self.missing_cards.contains(card_name))
    }

    async fn apply_code(&self, card_name: &str, code: &str) -> AppResult<()> {
        *self.last_apply_ok.borrow_mut() =
            self.expected_codes.get(card_name).map(String::as_str) == Some(code);
        self.applied
            .borrow_mut()
            .push((card_name.to_string(), code.to_string()));
        Ok(())
    }

    async fn wait_unlock_confirmed(&self, _timeout: Duration) -> AppResult<bool> {
        Ok(*self.last_apply_ok.borrow())
    }

    async fn dismiss_confirmation(&self) -> AppResult<()> {
        Ok(())
    }

    async fn read_documentation(&self, _card_name: &str) -> AppResult<Option<String>> {
        Ok(None)
    }

    async fn download_pdf(&self, card_name: &str, dest: &Path) -> AppResult<()> {
        let Some(bytes) = self.artifacts.get(card_name) else {
            return Err(AppError::download_failed(card_name, "sin artefacto programado"));
        };
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::download_failed(card_name, e.to_string()))?;
        }
        std::fs::write(dest, bytes)
            .map_err(|e| AppError::download_failed(card_name, e.to_string()))?;
        self.downloads.borrow_mut().push(card_name.to_string());
        Ok(())
    }
}

// ========== 挑战接口替身 ==========

struct ScriptedChallenge {
    payload: Option<ChallengePayload>,
    requests: RefCell<Vec<ChallengeRequest>>,
}

impl ScriptedChallenge {
    fn with_payload(vault: &str, targets: Vec<i64>) -> Self {
        Self {
            payload: Some(ChallengePayload::new(vault.chars().collect(), targets)),
            requests: RefCell::new(Vec::new()),
        }
    }

    fn unavailable() -> Self {
        Self {
            payload: None,
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl ChallengeFetch for &ScriptedChallenge {
    async fn fetch_challenge(&self, request: &ChallengeRequest) -> AppResult<ChallengePayload> {
        self.requests.borrow_mut().push(request.clone());
        match &self.payload {
            Some(payload) => Ok(payload.clone()),
            None => Err(AppError::challenge_bad_response(
                "scripted",
                "success = false",
            )),
        }
    }
}

async fn flow_for<'a>(
    challenge: &'a ScriptedChallenge,
    config: &Config,
) -> UnlockFlow<&'a ScriptedChallenge> {
    let store = ArtifactStore::new(&config.downloads_dir);
    store.ensure_dir().await.unwrap();
    UnlockFlow::new(challenge, store, config)
}

// ========== 场景测试 ==========

/// 场景 B：前驱解码出的码直接传给线性后继，不碰挑战接口
#[tokio::test]
async fn test_linear_propagation_without_challenge() {
    let dir = temp_downloads("linear");
    let config = test_config(&dir);

    let mut aureus = manuscript(
        "manuscrito-101",
        "Codex Aureus de Echternach",
        1,
        0,
        CodeSource::PreUnlocked,
    );
    aureus.dependent = Some("manuscrito-102".to_string());
    let kells = manuscript("manuscrito-102", "Libro de Kells", 1, 1, CodeSource::Propagated);
    let mut worklist = vec![aureus, kells];

    let mut session = ScriptedSession::default();
    session
        .expected_codes
        .insert("Libro de Kells".to_string(), "ALPHA99".to_string());
    session.artifacts.insert(
        "Codex Aureus de Echternach".to_string(),
        minimal_pdf(&["la clave del siguiente tomo es ALPHA99"]),
    );
    session.artifacts.insert(
        "Libro de Kells".to_string(),
        minimal_pdf(&["texto sin clave alguna"]),
    );

    let challenge = ScriptedChallenge::unavailable();
    let flow = flow_for(&challenge, &config).await;

    let stats = process_worklist(&session, &flow, &mut worklist)
        .await
        .unwrap();

    assert_eq!(stats.unlocked, 2);
    assert_eq!(stats.decoded, 1);
    assert!(!stats.paused);

    // 后继条目拿到了前驱解码出的码，挑战接口一次都没被调用
    assert_eq!(worklist[1].code.as_deref(), Some("ALPHA99"));
    assert!(challenge.requests.borrow().is_empty());
    assert_eq!(
        *session.applied.borrow(),
        vec![("Libro de Kells".to_string(), "ALPHA99".to_string())]
    );

    assert_eq!(worklist[0].status, ItemStatus::CodeExtracted);
    assert_eq!(worklist[1].status, ItemStatus::ArtifactReady);

    // 两份都在第一页，从未请求翻页
    assert!(session.pages_visited.borrow().is_empty());
}

/// 场景 C：前置手稿的 PDF 不可用时，挑战请求用默认种子码
#[tokio::test]
async fn test_challenge_uses_default_seed() {
    let dir = temp_downloads("default_seed");
    let config = test_config(&dir);

    let mut necro = manuscript("manuscrito-105", "Necronomicon", 2, 1, CodeSource::Challenge);
    necro.seed_from = Some("manuscrito-103".to_string()); // 下载目录里没有这份 PDF
    let mut worklist = vec![necro];

    let mut session = ScriptedSession::default();
    session
        .expected_codes
        .insert("Necronomicon".to_string(), "PCOR".to_string());
    session.artifacts.insert(
        "Necronomicon".to_string(),
        minimal_pdf(&["texto sin clave"]),
    );

    // 场景 A 的载荷：vault "CRYPTOKEY"，targets [3,0,5,1] ⇒ "PCOR"
    let challenge = ScriptedChallenge::with_payload("CRYPTOKEY", vec![3, 0, 5, 1]);
    let flow = flow_for(&challenge, &config).await;

    let stats = process_worklist(&session, &flow, &mut worklist)
        .await
        .unwrap();

    assert_eq!(stats.unlocked, 1);
    assert!(!stats.paused);

    let requests = challenge.requests.borrow();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].book_title, "Necronomicon");
    assert_eq!(requests[0].unlock_code, config.default_seed_code);

    assert_eq!(worklist[0].code.as_deref(), Some("PCOR"));
    assert_eq!(worklist[0].status, ItemStatus::ArtifactReady);

    // 第二页的条目触发了一次翻页
    assert_eq!(*session.pages_visited.borrow(), vec![2]);
}

/// 场景 D：确认超时 ⇒ VerifyTimedOut，不下载，流水线暂停
#[tokio::test]
async fn test_verify_timeout_halts_without_download() {
    let dir = temp_downloads("timeout");
    let config = test_config(&dir);

    let mut kells = manuscript("manuscrito-102", "Libro de Kells", 1, 0, CodeSource::Preset);
    kells.code = Some("AUREUS1350".to_string());
    // expected_codes 为空 ⇒ 确认文案永远不出现
    let mut worklist = vec![kells];

    let session = ScriptedSession::default();
    let challenge = ScriptedChallenge::unavailable();
    let flow = flow_for(&challenge, &config).await;

    let stats = process_worklist(&session, &flow, &mut worklist)
        .await
        .unwrap();

    assert_eq!(worklist[0].status, ItemStatus::VerifyTimedOut);
    assert!(stats.paused);
    assert_eq!(stats.unlocked, 0);
    assert!(session.downloads.borrow().is_empty());
}

/// 挑战不可用只终止该条目的尝试，清单继续往下走
#[tokio::test]
async fn test_challenge_unavailable_skips_item_only() {
    let dir = temp_downloads("unavailable");
    let config = test_config(&dir);

    let necro = manuscript("manuscrito-105", "Necronomicon", 1, 0, CodeSource::Challenge);
    let aureus = manuscript(
        "manuscrito-101",
        "Codex Aureus de Echternach",
        1,
        1,
        CodeSource::PreUnlocked,
    );
    let mut worklist = vec![necro, aureus];

    let mut session = ScriptedSession::default();
    session.artifacts.insert(
        "Codex Aureus de Echternach".to_string(),
        minimal_pdf(&["texto sin clave"]),
    );

    let challenge = ScriptedChallenge::unavailable();
    let flow = flow_for(&challenge, &config).await;

    let stats = process_worklist(&session, &flow, &mut worklist)
        .await
        .unwrap();

    // 单次请求、不重试、不暂停
    assert_eq!(challenge.requests.borrow().len(), 1);
    assert_eq!(worklist[0].status, ItemStatus::Skipped);
    assert!(session.applied.borrow().is_empty());

    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.unlocked, 1);
    assert!(!stats.paused);
    assert_eq!(worklist[1].status, ItemStatus::ArtifactReady);
}

/// 终端解码者：挑战解锁 + 种子取自前置 PDF + 码传给同页非相邻条目
#[tokio::test]
async fn test_non_adjacent_dependent_chain() {
    let dir = temp_downloads("non_adjacent");
    let config = test_config(&dir);

    // 上一环留下的种子 PDF 已经在下载目录里
    std::fs::write(
        dir.join("manuscrito-103.pdf"),
        minimal_pdf(&["sello del scriptorium: SERPENS999"]),
    )
    .unwrap();

    // 清单顺序：Malleus 在前、Necronomicon 在后，依赖边却是 105 → 104
    let malleus = manuscript(
        "manuscrito-104",
        "Malleus Maleficarum",
        2,
        0,
        CodeSource::Propagated,
    );
    let mut necro = manuscript("manuscrito-105", "Necronomicon", 2, 1, CodeSource::Challenge);
    necro.dependent = Some("manuscrito-104".to_string());
    necro.seed_from = Some("manuscrito-103".to_string());
    let mut worklist = vec![malleus, necro];

    let mut session = ScriptedSession::default();
    session
        .expected_codes
        .insert("Necronomicon".to_string(), "PCOR".to_string());
    session
        .expected_codes
        .insert("Malleus Maleficarum".to_string(), "MALLEUS1486".to_string());
    session.artifacts.insert(
        "Necronomicon".to_string(),
        minimal_pdf(&["la clave final es MALLEUS1486"]),
    );
    session.artifacts.insert(
        "Malleus Maleficarum".to_string(),
        minimal_pdf(&["fin de la cadena"]),
    );

    let challenge = ScriptedChallenge::with_payload("CRYPTOKEY", vec![3, 0, 5, 1]);
    let flow = flow_for(&challenge, &config).await;

    let stats = process_worklist(&session, &flow, &mut worklist)
        .await
        .unwrap();

    // Malleus 先被暂缓，Necronomicon 解码后才轮到它
    assert_eq!(
        *session.applied.borrow(),
        vec![
            ("Necronomicon".to_string(), "PCOR".to_string()),
            ("Malleus Maleficarum".to_string(), "MALLEUS1486".to_string()),
        ]
    );

    // 挑战的种子码来自前置手稿的 PDF，不是默认值
    assert_eq!(challenge.requests.borrow()[0].unlock_code, "SERPENS999");

    assert_eq!(worklist[0].status, ItemStatus::ArtifactReady);
    assert_eq!(worklist[1].status, ItemStatus::CodeExtracted);
    assert_eq!(stats.unlocked, 2);
    assert_eq!(stats.decoded, 1);
    assert!(!stats.paused);
}

/// 等不到前驱传码的条目在暂缓一轮后跳过，不算失败也不暂停
#[tokio::test]
async fn test_deferred_item_without_code_is_skipped() {
    let dir = temp_downloads("deferred");
    let config = test_config(&dir);

    // 前驱没有依赖边指向它，码永远不会来
    let orphan = manuscript("manuscrito-104", "Malleus Maleficarum", 1, 0, CodeSource::Propagated);
    let aureus = manuscript(
        "manuscrito-101",
        "Codex Aureus de Echternach",
        1,
        1,
        CodeSource::PreUnlocked,
    );
    let mut worklist = vec![orphan, aureus];

    let mut session = ScriptedSession::default();
    session.artifacts.insert(
        "Codex Aureus de Echternach".to_string(),
        minimal_pdf(&["texto sin clave"]),
    );

    let challenge = ScriptedChallenge::unavailable();
    let flow = flow_for(&challenge, &config).await;

    let stats = process_worklist(&session, &flow, &mut worklist)
        .await
        .unwrap();

    assert_eq!(worklist[0].status, ItemStatus::Skipped);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.unlocked, 1);
    assert_eq!(stats.failed, 0);
    assert!(!stats.paused);
}

/// 卡片缺失属于需要人工检查的错误，流水线暂停
#[tokio::test]
async fn test_missing_card_pauses_pipeline() {
    let dir = temp_downloads("missing_card");
    let config = test_config(&dir);

    let mut kells = manuscript("manuscrito-102", "Libro de Kells", 1, 0, CodeSource::Preset);
    kells.code = Some("AUREUS1350".to_string());
    let mut worklist = vec![kells];

    let mut session = ScriptedSession::default();
    session.missing_cards.insert("Libro de Kells".to_string());

    let challenge = ScriptedChallenge::unavailable();
    let flow = flow_for(&challenge, &config).await;

    let stats = process_worklist(&session, &flow, &mut worklist)
        .await
        .unwrap();

    assert!(stats.paused);
    assert!(session.applied.borrow().is_empty());
    assert!(session.downloads.borrow().is_empty());
}

/// 下载失败在条目边界截获：记为失败，清单继续
#[tokio::test]
async fn test_download_failure_is_contained() {
    let dir = temp_downloads("download_fail");
    let config = test_config(&dir);

    // 第一份没有登记下载产物 ⇒ 下载失败；第二份正常
    let aureus = manuscript(
        "manuscrito-101",
        "Codex Aureus de Echternach",
        1,
        0,
        CodeSource::PreUnlocked,
    );
    let kells = manuscript("manuscrito-102", "Libro de Kells", 1, 1, CodeSource::PreUnlocked);
    let mut worklist = vec![aureus, kells];

    let mut session = ScriptedSession::default();
    session.artifacts.insert(
        "Libro de Kells".to_string(),
        minimal_pdf(&["texto sin clave"]),
    );

    let challenge = ScriptedChallenge::unavailable();
    let flow = flow_for(&challenge, &config).await;

    let stats = process_worklist(&session, &flow, &mut worklist)
        .await
        .unwrap();

    assert_eq!(worklist[0].status, ItemStatus::DownloadFailed);
    assert_eq!(worklist[1].status, ItemStatus::ArtifactReady);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.unlocked, 1);
    assert!(!stats.paused);
}
