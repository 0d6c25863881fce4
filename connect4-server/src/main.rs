use anyhow::Result;
use clap::Parser;
use connect4_server::ServerConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("connect4_server=debug".parse()?))
        .init();

    let config = ServerConfig::parse();
    info!("四子棋服务端启动中...");

    connect4_server::run(config).await
}
