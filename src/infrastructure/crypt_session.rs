//! 藏书阁会话 - 基础设施层
//!
//! `PortalSession` 的 chromiumoxide 实现。持有唯一的 Page 资源，
//! 所有 DOM 操作都走 JS 求值：按精确文本找到卡片标签、向上两层
//! 取容器、再在容器里找占位符输入框和按钮。下载通过 CDP 的
//! 下载行为命令加目录轮询完成。

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::session::PortalSession;
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::fs;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// 码输入框的占位符文本
const CODE_PLACEHOLDER: &str = "Ingresá el código";
/// 解锁按钮文本
const UNLOCK_LABEL: &str = "Desbloquear";
/// 下载按钮文本
const DOWNLOAD_LABEL: &str = "Descargar PDF";
/// 文档弹窗按钮文本
const DOCUMENTATION_LABEL: &str = "Ver Documentación";
/// 弹窗关闭按钮文本
const CLOSE_LABEL: &str = "Cerrar";
/// 登录成功后的标志标题
pub const LANDMARK_HEADING: &str = "Manuscritos Sagrados";
/// 分页按钮容器选择器
const PAGINATION_SELECTOR: &str = r"div.flex.justify-center.gap-1\\.5.pt-6";

/// 两种解锁确认文案：第一页用短句，第二页用完整句。
/// 门户在不同页面用词不一致，这里照单全收，不做统一。
const CONFIRM_TEXTS: [&str; 2] = ["¡Manuscrito Desbloqueado!", "Desbloqueado"];

/// 控件探测结果（JS 端返回）
#[derive(Debug, Deserialize)]
struct ControlProbe {
    ok: bool,
    #[serde(default)]
    missing: Option<String>,
}

/// 藏书阁门户会话
pub struct CryptSession {
    page: Page,
    settle_delay: Duration,
    confirm_poll: Duration,
    download_timeout: Duration,
}

impl CryptSession {
    /// 创建新的会话
    pub fn new(page: Page, config: &Config) -> Self {
        Self {
            page,
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            confirm_poll: Duration::from_millis(250),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
        }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    async fn eval(&self, js_code: String) -> AppResult<JsonValue> {
        let result = self.page.evaluate(js_code).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    async fn eval_as<T: DeserializeOwned>(&self, js_code: String) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 生成"按精确文本找卡片容器"的 JS 前缀
    ///
    /// 与门户 DOM 的约定：卡片标题是精确匹配的叶子节点，
    /// 控件组在它上面两层的容器里。
    fn card_prelude(card_name: &str) -> AppResult<String> {
        let name_json = serde_json::to_string(card_name)?;
        Ok(format!(
            r#"
            const label = Array.from(document.querySelectorAll('*'))
                .find(n => n.children.length === 0 && n.textContent.trim() === {name});
            const card = label && label.parentElement
                ? label.parentElement.parentElement
                : null;
            "#,
            name = name_json
        ))
    }

    /// 在卡片容器里点击指定文本的按钮
    async fn click_card_button(&self, card_name: &str, button_label: &str) -> AppResult<()> {
        let prelude = Self::card_prelude(card_name)?;
        let label_json = serde_json::to_string(button_label)?;
        let js = format!(
            r#"
            (() => {{
                {prelude}
                if (!card) return {{ ok: false, missing: 'card' }};
                const button = Array.from(card.querySelectorAll('button'))
                    .find(b => b.textContent.trim() === {label});
                if (!button) return {{ ok: false, missing: 'button' }};
                button.click();
                return {{ ok: true }};
            }})()
            "#,
            prelude = prelude,
            label = label_json
        );

        let probe: ControlProbe = self.eval_as(js).await?;
        if probe.ok {
            Ok(())
        } else {
            Err(AppError::element_not_found(
                card_name,
                format!("{} ({})", button_label, probe.missing.unwrap_or_default()),
            ))
        }
    }

    /// 页面正文是否包含任一给定文案
    async fn body_contains_any(&self, needles: &[&str]) -> AppResult<bool> {
        let needles_json = serde_json::to_string(needles)?;
        let js = format!(
            r#"
            (() => {{
                const text = document.body ? document.body.innerText : '';
                return {needles}.some(n => text.includes(n));
            }})()
            "#,
            needles = needles_json
        );
        self.eval_as(js).await
    }

    /// 列出目录中现有的文件名
    async fn list_dir(dir: &Path) -> std::io::Result<HashSet<String>> {
        let mut names = HashSet::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.insert(entry.file_name().to_string_lossy().to_string());
        }
        Ok(names)
    }

    /// 等待下载目录里出现一个新的、写入完毕的文件，返回其文件名
    async fn wait_for_new_file(
        &self,
        dir: &Path,
        before: &HashSet<String>,
        card_name: &str,
    ) -> AppResult<String> {
        let started = Instant::now();
        let mut last_size: Option<(String, u64)> = None;

        while started.elapsed() < self.download_timeout {
            sleep(Duration::from_millis(300)).await;

            let now = Self::list_dir(dir)
                .await
                .map_err(|e| AppError::download_failed(card_name, e.to_string()))?;

            let fresh = now.iter().find(|name| {
                !before.contains(*name)
                    && !name.ends_with(".crdownload")
                    && !name.ends_with(".tmp")
            });

            if let Some(name) = fresh {
                let size = fs::metadata(dir.join(name))
                    .await
                    .map(|m| m.len())
                    .unwrap_or(0);

                // 连续两次轮询大小不变才算写完
                match &last_size {
                    Some((prev_name, prev_size)) if prev_name == name && *prev_size == size => {
                        return Ok(name.clone());
                    }
                    _ => last_size = Some((name.clone(), size)),
                }
            }
        }

        Err(AppError::download_failed(card_name, "下载等待超时"))
    }
}

impl PortalSession for CryptSession {
    async fn login(&self, email: &str, password: &str) -> AppResult<bool> {
        info!("🌐 正在提交登录表单...");

        let email_json = serde_json::to_string(email)?;
        let password_json = serde_json::to_string(password)?;
        let js = format!(
            r#"
            (() => {{
                const email = document.querySelector('#email');
                const password = document.querySelector('#password');
                const submit = document.querySelector('button[type="submit"]');
                if (!email || !password) return {{ ok: false, missing: 'input' }};
                if (!submit) return {{ ok: false, missing: 'submit' }};
                const setter = Object.getOwnPropertyDescriptor(
                    window.HTMLInputElement.prototype, 'value').set;
                setter.call(email, {email});
                email.dispatchEvent(new Event('input', {{ bubbles: true }}));
                setter.call(password, {password});
                password.dispatchEvent(new Event('input', {{ bubbles: true }}));
                submit.click();
                return {{ ok: true }};
            }})()
            "#,
            email = email_json,
            password = password_json
        );

        let probe: ControlProbe = self.eval_as(js).await?;
        if !probe.ok {
            return Err(AppError::element_not_found(
                "login",
                probe.missing.unwrap_or_default(),
            ));
        }

        // 等页面稳定，再轮询登录标志
        sleep(self.settle_delay).await;

        let started = Instant::now();
        while started.elapsed() < Duration::from_secs(10) {
            if self.body_contains_any(&[LANDMARK_HEADING]).await? {
                info!("🚪 藏书阁已打开");
                return Ok(true);
            }
            sleep(self.confirm_poll).await;
        }

        Ok(false)
    }

    async fn goto_page(&self, page_number: u32) -> AppResult<()> {
        info!("🔄 正在切换到第 {} 页...", page_number);

        let js = format!(
            r#"
            (() => {{
                const container = document.querySelector('{selector}');
                if (!container) return {{ ok: false, missing: 'pagination' }};
                const button = Array.from(container.querySelectorAll('button'))
                    .find(b => b.textContent.trim() === '{page}');
                if (!button) return {{ ok: false, missing: 'button' }};
                button.click();
                return {{ ok: true }};
            }})()
            "#,
            selector = PAGINATION_SELECTOR,
            page = page_number
        );

        let probe: ControlProbe = self.eval_as(js).await?;
        if !probe.ok {
            return Err(AppError::navigation_failed(
                page_number,
                format!("缺少控件: {}", probe.missing.unwrap_or_default()),
            ));
        }

        sleep(self.settle_delay).await;
        info!("✅ 已切换到第 {} 页", page_number);
        Ok(())
    }

    async fn card_visible(&self, card_name: &str) -> AppResult<bool> {
        let prelude = Self::card_prelude(card_name)?;
        let js = format!(
            r#"
            (() => {{
                {prelude}
                if (!label) return false;
                return label.getClientRects().length > 0;
            }})()
            "#,
            prelude = prelude
        );
        self.eval_as(js).await
    }

    async fn apply_code(&self, card_name: &str, code: &str) -> AppResult<()> {
        debug!("填入解锁码并点击解锁: {}", card_name);

        let prelude = Self::card_prelude(card_name)?;
        let code_json = serde_json::to_string(code)?;
        let js = format!(
            r#"
            (() => {{
                {prelude}
                if (!card) return {{ ok: false, missing: 'card' }};
                const input = card.querySelector('input[placeholder="{placeholder}"]');
                const button = Array.from(card.querySelectorAll('button'))
                    .find(b => b.textContent.trim() === '{unlock}');
                if (!input) return {{ ok: false, missing: 'input' }};
                if (!button) return {{ ok: false, missing: 'button' }};
                const setter = Object.getOwnPropertyDescriptor(
                    window.HTMLInputElement.prototype, 'value').set;
                setter.call(input, {code});
                input.dispatchEvent(new Event('input', {{ bubbles: true }}));
                button.click();
                return {{ ok: true }};
            }})()
            "#,
            prelude = prelude,
            placeholder = CODE_PLACEHOLDER,
            unlock = UNLOCK_LABEL,
            code = code_json
        );

        let probe: ControlProbe = self.eval_as(js).await?;
        if probe.ok {
            Ok(())
        } else {
            Err(AppError::element_not_found(
                card_name,
                probe.missing.unwrap_or_default(),
            ))
        }
    }

    async fn wait_unlock_confirmed(&self, timeout: Duration) -> AppResult<bool> {
        let started = Instant::now();
        while started.elapsed() < timeout {
            if self.body_contains_any(&CONFIRM_TEXTS).await? {
                return Ok(true);
            }
            sleep(self.confirm_poll).await;
        }
        Ok(false)
    }

    async fn dismiss_confirmation(&self) -> AppResult<()> {
        let js = format!(
            r#"
            (() => {{
                const button = Array.from(document.querySelectorAll('button'))
                    .find(b => b.textContent.trim() === '{close}');
                if (button) {{ button.click(); return true; }}
                document.dispatchEvent(new KeyboardEvent('keydown',
                    {{ key: 'Escape', bubbles: true }}));
                return false;
            }})()
            "#,
            close = CLOSE_LABEL
        );

        let closed_by_button: bool = self.eval_as(js).await?;
        if closed_by_button {
            debug!("✅ 解锁提示已通过按钮关闭");
        } else {
            debug!("✅ 解锁提示已通过 Escape 关闭");
        }

        sleep(Duration::from_millis(500)).await;
        Ok(())
    }

    async fn read_documentation(&self, card_name: &str) -> AppResult<Option<String>> {
        // 没有文档按钮不算错误，直接返回 None
        if self
            .click_card_button(card_name, DOCUMENTATION_LABEL)
            .await
            .is_err()
        {
            debug!("{} 没有文档按钮", card_name);
            return Ok(None);
        }

        sleep(self.settle_delay).await;

        let text: Option<String> = self
            .eval_as(
                r#"
                (() => {
                    const dialog = document.querySelector('[role="dialog"]');
                    return dialog ? dialog.textContent : null;
                })()
                "#
                .to_string(),
            )
            .await?;

        // 关闭弹窗：优先 ×/Cerrar 按钮，退回 Escape
        let close_js = format!(
            r#"
            (() => {{
                const dialog = document.querySelector('[role="dialog"]');
                if (dialog) {{
                    const button = Array.from(dialog.querySelectorAll('button'))
                        .find(b => /×|{close}/.test(b.textContent));
                    if (button) {{ button.click(); return true; }}
                }}
                document.dispatchEvent(new KeyboardEvent('keydown',
                    {{ key: 'Escape', bubbles: true }}));
                return false;
            }})()
            "#,
            close = CLOSE_LABEL
        );
        let _: bool = self.eval_as(close_js).await?;
        sleep(Duration::from_millis(500)).await;

        Ok(text)
    }

    async fn download_pdf(&self, card_name: &str, dest: &Path) -> AppResult<()> {
        info!("📥 开始下载 {} 的 PDF...", card_name);

        let dir = dest
            .parent()
            .ok_or_else(|| AppError::download_failed(card_name, "目标路径没有父目录"))?;
        fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::download_failed(card_name, e.to_string()))?;

        // 让浏览器把下载落到我们的目录
        let behavior = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(dir.display().to_string())
            .build()
            .map_err(AppError::Other)?;
        self.page.execute(behavior).await?;

        let before = Self::list_dir(dir)
            .await
            .map_err(|e| AppError::download_failed(card_name, e.to_string()))?;

        self.click_card_button(card_name, DOWNLOAD_LABEL).await?;

        let downloaded = self.wait_for_new_file(dir, &before, card_name).await?;
        let tmp_path = dir.join(&downloaded);

        if tmp_path != dest {
            fs::rename(&tmp_path, dest)
                .await
                .map_err(|e| AppError::download_failed(card_name, e.to_string()))?;
        }

        let size = fs::metadata(dest).await.map(|m| m.len()).unwrap_or(0);
        info!(
            "✅ {} 的 PDF 下载完成: {} ({:.2} KB)",
            card_name,
            dest.display(),
            size as f64 / 1024.0
        );

        Ok(())
    }
}
