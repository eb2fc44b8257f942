use clap::Parser;
use demos::Args;
use flexi_logger::Logger;
use robot_server::Server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _logger = Logger::try_with_env_or_str("info")?.start()?;

    // 获取配置
    let args = Args::parse();
    let cfg = demos::load(&args).await?;
    log::info!("starting with {:?}", cfg);

    // 启动服务
    Server::new(cfg).start().await?;
    Ok(())
}
