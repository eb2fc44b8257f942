use bytes::BytesMut;
use log::debug;
use memchr::memmem;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    time,
};

use crate::{
    config::Timeouts,
    network::message::{
        Command, DELIMITER, FULL_POWER, MAX_FULL_POWER_LEN, RECHARGING, RECHARGING_FRAME,
    },
};

use super::Error;

/// 机器人与服务器之间的连接
/// 单纯的读写管理，以报文为单位读写
/// 读取时透明处理 RECHARGING/FULL POWER 充电子协议
pub(crate) struct ClientConnection<S> {
    /// tcp 连接
    stream: S,
    /// 读缓冲区，保存已收到但尚未组成完整报文的字节
    read: BytesMut,
    /// 写缓冲区
    write: BytesMut,
    timeouts: Timeouts,
}

impl<S> ClientConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub(crate) fn new(stream: S, timeouts: Timeouts) -> Self {
        Self {
            stream,
            read: BytesMut::with_capacity(1024),
            write: BytesMut::new(),
            timeouts,
        }
    }

    /// 读取一条报文，`max_len` 包含分隔符
    /// 充电报文不会返回给调用方
    pub(crate) async fn read_message(&mut self, max_len: usize) -> Result<String, Error> {
        loop {
            match self.take_message(max_len)? {
                Some(msg) if msg == RECHARGING => {
                    debug!("client started recharging");
                    self.recharge().await?;
                    debug!("client recharged, resume reading");
                }
                Some(msg) => return Ok(msg),
                None => self.read_more(self.timeouts.message()).await?,
            }
        }
    }

    pub(crate) async fn write_command(&mut self, command: Command) -> Result<(), Error> {
        command.write(&mut self.write);
        self.flush().await
    }

    /// 充电期间只接受 FULL POWER，其他任何报文或超时都违反了充电子协议
    async fn recharge(&mut self) -> Result<(), Error> {
        loop {
            match self.take_message(MAX_FULL_POWER_LEN) {
                Ok(Some(msg)) if msg == FULL_POWER => return Ok(()),
                Ok(Some(msg)) => {
                    return Err(Error::Recharge(format!("{:?} received while recharging", msg)))
                }
                Ok(None) => {}
                Err(Error::MessageTooLong(_)) | Err(Error::MalformedString) => {
                    return Err(Error::Recharge("malformed message while recharging".into()))
                }
                Err(e) => return Err(e),
            }

            match self.read_more(self.timeouts.recharging()).await {
                Err(Error::Timeout(_)) => {
                    return Err(Error::Recharge("no full power before deadline".into()))
                }
                read => read?,
            }
        }
    }

    /// 从缓冲区中取出一条完整报文
    /// 缓冲区中没有分隔符时返回 None，除非已经超过了长度限制
    fn take_message(&mut self, max_len: usize) -> Result<Option<String>, Error> {
        let index = match memmem::find(&self.read, DELIMITER) {
            Some(index) => index,
            // 充电报文在任何阶段都可能出现，不受当前阶段的长度限制
            None if self.read.len() > max_len.saturating_sub(1)
                && !RECHARGING_FRAME.starts_with(&self.read) =>
            {
                return Err(Error::MessageTooLong(max_len))
            }
            None => return Ok(None),
        };

        let frame = self.read.split_to(index + DELIMITER.len());
        let msg = match std::str::from_utf8(&frame[..index]) {
            Ok(msg) => msg,
            Err(_) => return Err(Error::MalformedString),
        };
        if frame.len() > max_len && msg != RECHARGING {
            return Err(Error::MessageTooLong(max_len));
        }

        Ok(Some(msg.to_owned()))
    }

    /// 从 socket 读取一次数据放入缓冲区，超时或对端关闭都视为错误
    async fn read_more(&mut self, timeout: time::Duration) -> Result<(), Error> {
        let read = time::timeout(timeout, self.stream.read_buf(&mut self.read)).await??;
        if 0 == read {
            return Err(Error::ConnectionAborted);
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), Error> {
        if self.write.is_empty() {
            return Ok(());
        }

        self.stream.write_all(&self.write).await?;
        self.write.clear();
        Ok(())
    }
}
