//! 报文目录
//! 服务端指令、客户端保留报文以及各阶段报文的最大长度

use std::fmt;

use bytes::{BufMut, BytesMut};

/// 报文分隔符，双向的每条报文都以它结尾
pub const DELIMITER: &[u8] = b"\x07\x08";

/// 以下长度都包含两个字节的分隔符
pub const MAX_USERNAME_LEN: usize = 20;
pub const MAX_KEY_ID_LEN: usize = 5;
pub const MAX_CONFIRMATION_LEN: usize = 7;
pub const MAX_OK_LEN: usize = 12;
pub const MAX_FULL_POWER_LEN: usize = 12;
pub const MAX_MESSAGE_LEN: usize = 100;

/// 客户端开始充电
pub const RECHARGING: &str = "RECHARGING";
/// 客户端充电完成
pub const FULL_POWER: &str = "FULL POWER";
/// 带分隔符的完整充电报文
pub(crate) const RECHARGING_FRAME: &[u8] = b"RECHARGING\x07\x08";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed acknowledgment: {0:?}")]
    MalformedAck(String),
}

/// 服务端发送给客户端的报文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move,
    TurnLeft,
    TurnRight,
    GetMessage,
    Logout,
    KeyRequest,
    Ok,
    /// 认证时服务端计算出的 hash
    ServerHash(u16),
    LoginFailed,
    SyntaxError,
    LogicError,
    KeyOutOfRange,
}

impl Command {
    fn text(&self) -> &'static str {
        match self {
            Command::Move => "102 MOVE",
            Command::TurnLeft => "103 TURN LEFT",
            Command::TurnRight => "104 TURN RIGHT",
            Command::GetMessage => "105 GET MESSAGE",
            Command::Logout => "106 LOGOUT",
            Command::KeyRequest => "107 KEY REQUEST",
            Command::Ok => "200 OK",
            Command::ServerHash(_) => "",
            Command::LoginFailed => "300 LOGIN FAILED",
            Command::SyntaxError => "301 SYNTAX ERROR",
            Command::LogicError => "302 LOGIC ERROR",
            Command::KeyOutOfRange => "303 KEY OUT OF RANGE",
        }
    }

    /// 写入缓冲区，附带分隔符
    pub(crate) fn write(&self, stream: &mut BytesMut) {
        match self {
            Command::ServerHash(hash) => stream.put_slice(hash.to_string().as_bytes()),
            cmd => stream.put_slice(cmd.text().as_bytes()),
        }
        stream.put_slice(DELIMITER);
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::ServerHash(hash) => write!(f, "{}", hash),
            cmd => f.write_str(cmd.text()),
        }
    }
}

/// 二维网格坐标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub const ORIGIN: Coordinate = Coordinate { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// 解析 MOVE/TURN 的回复 `OK <x> <y>`
    pub(crate) fn read_ack(msg: &str) -> Result<Self, Error> {
        let malformed = || Error::MalformedAck(msg.to_owned());

        let parts = msg.split(' ').collect::<Vec<&str>>();
        match parts.as_slice() {
            ["OK", x, y] => {
                let x = x.parse::<i32>().map_err(|_| malformed())?;
                let y = y.parse::<i32>().map_err(|_| malformed())?;
                Ok(Coordinate::new(x, y))
            }
            _ => Err(malformed()),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}
