//! car-doctor 服务二进制入口：CLI 分发后启动 HTTP 服务。

mod api;
mod app;
mod auth;
mod bookings;
mod catalog;
mod cli;
mod config;
mod logging;
mod state;
mod store;

#[tokio::main]
/// 启动 car-doctor 服务。
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = std::env::args().skip(1).collect::<Vec<String>>();
    match cli::dispatch(&args).await? {
        cli::CliDispatch::Run => {}
        cli::CliDispatch::Exit => return Ok(()),
    }

    let _log_runtime = logging::init("car-doctor")?;
    let config = config::Config::from_env()?;
    tracing::info!(?config, "configuration loaded");
    app::run(config).await
}
