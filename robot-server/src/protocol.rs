//! 协议层
//! 处理认证、导航、取回消息等协议逻辑，依赖于底层的网络层进行报文读写

use crate::network::{conn, message, Command};

pub(crate) use session::Session;

mod auth;
mod navigator;
mod session;

/// 会话级错误
/// 除 IO 与 NavigationStuck 外，每种错误都对应一个发送给客户端的错误码
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Syntax error: {0}")]
    Syntax(String),
    #[error("Login failed")]
    LoginFailed,
    #[error("Key index {0} out of range")]
    KeyOutOfRange(i64),
    #[error("Logic error: {0}")]
    Logic(String),
    #[error("Navigation stuck after {0} obstacle retries")]
    NavigationStuck(usize),
    #[error("Connection error: {0}")]
    IO(conn::Error),
}

impl Error {
    /// 关闭连接前发送给客户端的错误码
    pub fn reply(&self) -> Option<Command> {
        match self {
            Error::Syntax(_) => Some(Command::SyntaxError),
            Error::LoginFailed => Some(Command::LoginFailed),
            Error::KeyOutOfRange(_) => Some(Command::KeyOutOfRange),
            Error::Logic(_) => Some(Command::LogicError),
            Error::NavigationStuck(_) | Error::IO(_) => None,
        }
    }
}

impl From<conn::Error> for Error {
    fn from(e: conn::Error) -> Self {
        match e {
            conn::Error::MessageTooLong(_) | conn::Error::MalformedString => {
                Error::Syntax(e.to_string())
            }
            conn::Error::Recharge(reason) => Error::Logic(reason),
            e => Error::IO(e),
        }
    }
}

impl From<message::Error> for Error {
    fn from(e: message::Error) -> Self {
        Error::Syntax(e.to_string())
    }
}
