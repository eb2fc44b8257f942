use std::time::Duration;

use tokio::{fs, io::AsyncReadExt};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Read config file error: {0}")]
    Read(#[from] std::io::Error),
    #[error("Parse config file error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub navigation: Navigation,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Server {
    /// 监听地址
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

/// 读超时，单位毫秒
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct Timeouts {
    /// 普通报文的读超时
    #[serde(default = "default_message_ms")]
    pub message_ms: u64,
    /// 等待 FULL POWER 的超时
    #[serde(default = "default_recharging_ms")]
    pub recharging_ms: u64,
}

impl Timeouts {
    pub fn message(&self) -> Duration {
        Duration::from_millis(self.message_ms)
    }

    pub fn recharging(&self) -> Duration {
        Duration::from_millis(self.recharging_ms)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            message_ms: default_message_ms(),
            recharging_ms: default_recharging_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct Navigation {
    /// 绕障次数上限，超过后会话以 NavigationStuck 结束
    #[serde(default = "default_max_obstacle_retries")]
    pub max_obstacle_retries: usize,
}

impl Default for Navigation {
    fn default() -> Self {
        Self {
            max_obstacle_retries: default_max_obstacle_retries(),
        }
    }
}

fn default_addr() -> String {
    "0.0.0.0:4000".into()
}

fn default_message_ms() -> u64 {
    1000
}

fn default_recharging_ms() -> u64 {
    5000
}

fn default_max_obstacle_retries() -> usize {
    64
}

impl Config {
    pub async fn from_path(path: &str) -> Result<Self, Error> {
        let mut file = fs::File::open(path).await?;
        let mut s = String::new();
        file.read_to_string(&mut s).await?;

        Self::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> Result<Self, Error> {
        Ok(toml::from_str::<Config>(s)?)
    }
}
