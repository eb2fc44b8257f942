//! 一个机器人导航服务端库
//! 认证远程机器人，把它一步步引导到原点，并取回它携带的消息

use async_trait::async_trait;

pub mod config;
pub mod error;
mod network;
mod protocol;
pub mod server;

pub use config::Config;
pub use server::Server;

/// 会话事件发生时的回调，由用户实现
#[async_trait]
pub trait Hook: Send + Sync + 'static {
    /// 机器人认证成功
    async fn connected(&self, username: &str);
    /// 取回了机器人携带的消息
    async fn message_retrieved(&self, username: &str, message: &str);
    /// 会话结束
    async fn disconnect(&self, username: &str);
}

pub struct HookNoop;

#[async_trait]
impl Hook for HookNoop {
    async fn connected(&self, _username: &str) {}
    async fn message_retrieved(&self, _username: &str, _message: &str) {}
    async fn disconnect(&self, _username: &str) {}
}
