//! 门户会话能力 - 基础设施层
//!
//! 解锁引擎只通过这组能力与页面打交道："给一个手稿名字，替我
//! 操作它的控件组"。DOM 选择器、容器层级这些细节全部留在实现里，
//! 流程层与编排层不认识任何选择器。

use crate::error::AppResult;
use std::path::Path;
use std::time::Duration;

/// 藏书阁门户会话能力
///
/// 职责：
/// - 登录与登录标志检测
/// - 翻页
/// - 按手稿名定位卡片控件组并操作（填码、解锁、下载、查看文档）
/// - 解锁确认的有界等待
///
/// 实现方持有稀缺资源（浏览器页面），这里只暴露能力。
#[allow(async_fn_in_trait)]
pub trait PortalSession {
    /// 提交登录表单，等待登录后标志元素出现；返回是否登录成功
    async fn login(&self, email: &str, password: &str) -> AppResult<bool>;

    /// 切换到指定门户页码
    async fn goto_page(&self, page_number: u32) -> AppResult<()>;

    /// 指定名字的手稿卡片当前是否可见
    async fn card_visible(&self, card_name: &str) -> AppResult<bool>;

    /// 在卡片的码输入框填入解锁码并点击解锁按钮
    async fn apply_code(&self, card_name: &str, code: &str) -> AppResult<()>;

    /// 在时限内等待解锁确认文案出现；超时返回 `false`，不重试
    async fn wait_unlock_confirmed(&self, timeout: Duration) -> AppResult<bool>;

    /// 关闭解锁成功的提示弹窗（找不到关闭按钮时退回 Escape）
    async fn dismiss_confirmation(&self) -> AppResult<()>;

    /// 打开卡片的文档弹窗并读取其文本，读完即关闭；没有该控件返回 `None`
    async fn read_documentation(&self, card_name: &str) -> AppResult<Option<String>>;

    /// 点击卡片的下载按钮，捕获下载产物并落盘到 `dest`
    async fn download_pdf(&self, card_name: &str, dest: &Path) -> AppResult<()>;
}
