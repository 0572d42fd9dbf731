use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 启动浏览器并导航到指定 URL
pub async fn launch_browser_and_page(url: &str, headless: bool) -> Result<(Browser, Page)> {
    info!("🚀 正在启动浏览器...");
    debug!("目标 URL: {}, 无头模式: {}", url, headless);

    let mut builder = BrowserConfig::builder();
    if !headless {
        builder = builder.with_head();
    }

    let config = builder
        .args(vec![
            "--no-sandbox",            // 禁用沙盒，防止权限问题导致的崩溃
            "--disable-dev-shm-usage", // 防止共享内存不足
        ])
        .build()
        .map_err(|e| {
            error!("配置浏览器失败: {}", e);
            anyhow::anyhow!("配置浏览器失败: {}", e)
        })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        e
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    // 创建新页面并导航
    let page = browser.new_page(url).await.map_err(|e| {
        error!("创建页面失败: {}", e);
        e
    })?;

    info!("✅ 已导航到: {}", url);
    Ok((browser, page))
}
