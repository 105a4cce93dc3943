//! # Credential Gateway 主程序

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use credential_gateway::{
    api::{ApiServer, handlers::system::init_start_time},
    app::{AppContext, SessionSweepTask},
    config::ConfigManager,
    logging,
    store::SecretSealer,
};
use tokio_util::sync::CancellationToken;

/// 会话作用域的凭证网关
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// 配置文件路径
    #[arg(short, long, env = "GATEWAY_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// 日志级别，覆盖配置文件
    #[arg(long)]
    log_level: Option<String>,

    /// 打印日志配置说明后退出
    #[arg(long)]
    logging_help: bool,

    /// 生成一个新的封存密钥（填入 `store.sealing_key`）后退出
    #[arg(long)]
    generate_sealing_key: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.logging_help {
        logging::print_logging_help();
        return Ok(());
    }
    if args.generate_sealing_key {
        println!("{}", SecretSealer::generate_key());
        return Ok(());
    }

    let manager =
        ConfigManager::load(args.config.as_deref()).context("failed to load configuration")?;
    let source = manager.source().map(|p| p.display().to_string());
    let config = manager.into_config();

    logging::init_logging(Some(args.log_level.as_deref().unwrap_or(&config.logging.level)));
    init_start_time();
    tracing::info!(
        source = source.as_deref().unwrap_or("defaults"),
        version = env!("CARGO_PKG_VERSION"),
        "starting credential gateway"
    );
    if config.store.sealing_key.is_none() {
        tracing::warn!("no sealing key configured, using an ephemeral key for this process");
    }

    let sweep_interval = config.session.sweep_interval();
    let context = Arc::new(
        AppContext::from_config(config).context("failed to build application context")?,
    );

    let shutdown = CancellationToken::new();
    let sweeper =
        SessionSweepTask::new(Arc::clone(&context.store), sweep_interval).spawn(shutdown.clone());

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
        }
        signal_token.cancel();
    });

    let server = ApiServer::new(Arc::clone(&context)).context("failed to build server")?;
    let result = server.serve(shutdown.clone()).await;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "session sweep task ended abnormally");
    }
    result.context("gateway server failed")?;

    tracing::info!("credential gateway stopped");
    Ok(())
}
