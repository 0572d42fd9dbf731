use anyhow::Result;
use unlock_manuscript_download::config::Config;
use unlock_manuscript_download::orchestrator::App;
use unlock_manuscript_download::utils::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();

    // 初始化并运行应用
    let app = App::initialize(config).await?;
    app.run().await?;

    Ok(())
}
