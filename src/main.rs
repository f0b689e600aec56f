use youtube_downloader_web::{config::AppConfig, logging, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let config = AppConfig::from_env();
    run(config).await
}
