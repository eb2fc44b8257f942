//! 网络层
//! 本层只关心报文的拆分与读写，不包含任何协议相关逻辑

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

pub(crate) use conn::ClientConnection;
pub(crate) use message::{Command, Coordinate};

pub(crate) mod conn;
pub(crate) mod message;

/// 协议层与网络层之间的请求/应答通道
/// 协议严格同步，同一时刻只会有一个未完成的请求
#[async_trait]
pub(crate) trait Link: Send {
    /// 读取一条报文，`max_len` 包含分隔符
    async fn read_message(&mut self, max_len: usize) -> Result<String, conn::Error>;

    /// 发送一条指令
    async fn send(&mut self, command: Command) -> Result<(), conn::Error>;

    /// 发送指令并等待回复
    async fn execute(&mut self, command: Command, max_len: usize) -> Result<String, conn::Error> {
        self.send(command).await?;
        self.read_message(max_len).await
    }
}

#[async_trait]
impl<S> Link for ClientConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_message(&mut self, max_len: usize) -> Result<String, conn::Error> {
        ClientConnection::read_message(self, max_len).await
    }

    async fn send(&mut self, command: Command) -> Result<(), conn::Error> {
        self.write_command(command).await
    }
}
