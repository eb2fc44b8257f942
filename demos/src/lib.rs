use clap::Parser;
use robot_server::{config, Config};

/// 命令行参数
#[derive(Debug, Parser)]
#[clap(author, version, about = "Robot navigation server")]
pub struct Args {
    /// 配置文件路径
    #[clap(short, long, default_value = "./standalone.toml")]
    pub config: String,
    /// 监听地址，覆盖配置文件
    #[clap(short, long)]
    pub addr: Option<String>,
}

/// 环境变量覆盖，前缀 ROBOT_
#[derive(Debug, Default, serde::Deserialize)]
pub struct EnvOverrides {
    pub addr: Option<String>,
    pub message_timeout_ms: Option<u64>,
    pub recharging_timeout_ms: Option<u64>,
}

impl EnvOverrides {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("ROBOT_").from_env::<EnvOverrides>()
    }

    pub fn apply(self, cfg: &mut Config) {
        if let Some(addr) = self.addr {
            cfg.server.addr = addr;
        }
        if let Some(ms) = self.message_timeout_ms {
            cfg.timeouts.message_ms = ms;
        }
        if let Some(ms) = self.recharging_timeout_ms {
            cfg.timeouts.recharging_ms = ms;
        }
    }
}

/// 配置优先级：命令行 > 环境变量 > 配置文件 > 默认值
pub async fn load(args: &Args) -> Result<Config, config::Error> {
    let mut cfg = Config::from_path(&args.config).await?;
    match EnvOverrides::from_env() {
        Ok(overrides) => overrides.apply(&mut cfg),
        Err(e) => log::warn!("ignore malformed ROBOT_* environment: {}", e),
    }
    if let Some(addr) = &args.addr {
        cfg.server.addr = addr.clone();
    }
    Ok(cfg)
}
