use log::{debug, info, warn};

use crate::network::{
    message::{MAX_CONFIRMATION_LEN, MAX_KEY_ID_LEN, MAX_USERNAME_LEN},
    Command, Link,
};

use super::Error;

/// 确认码最多 5 位数字
const MAX_CONFIRMATION_DIGITS: usize = 5;

/// 服务端与客户端的一对密钥
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthKey {
    pub server_key: u16,
    pub client_key: u16,
}

/// 密钥表，进程启动后只读
pub static AUTH_KEYS: [AuthKey; 5] = [
    AuthKey {
        server_key: 23019,
        client_key: 32037,
    },
    AuthKey {
        server_key: 32037,
        client_key: 29295,
    },
    AuthKey {
        server_key: 18789,
        client_key: 13603,
    },
    AuthKey {
        server_key: 16443,
        client_key: 29533,
    },
    AuthKey {
        server_key: 18189,
        client_key: 21952,
    },
];

/// 用户名的 hash：字符编码之和乘以 1000，对 65536 取模
pub fn hash(username: &str) -> u16 {
    let sum: u64 = username.chars().map(|c| c as u64).sum();
    (sum * 1000 % 65536) as u16
}

/// 根据客户端给出的序号查找密钥
fn lookup(index: &str) -> Result<AuthKey, Error> {
    let i = index
        .parse::<i64>()
        .map_err(|_| Error::Syntax(format!("key index {:?} is not a number", index)))?;

    usize::try_from(i)
        .ok()
        .and_then(|i| AUTH_KEYS.get(i))
        .copied()
        .ok_or(Error::KeyOutOfRange(i))
}

/// 双方各自的确认 hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Hashes {
    server: u16,
    client: u16,
}

impl Hashes {
    fn new(username: &str, key: AuthKey) -> Self {
        let hash = hash(username);
        Self {
            server: hash.wrapping_add(key.server_key),
            client: hash.wrapping_add(key.client_key),
        }
    }
}

/// 登录握手，成功时返回用户名
/// 任何一步失败都不重试
pub(crate) async fn authenticate<L: Link>(link: &mut L) -> Result<String, Error> {
    let username = link.read_message(MAX_USERNAME_LEN).await?;
    if username.len() > MAX_USERNAME_LEN - 2 {
        return Err(Error::Syntax(format!("username {:?} too long", username)));
    }
    debug!("[{}] authenticating", username);

    let index = link.execute(Command::KeyRequest, MAX_KEY_ID_LEN).await?;
    let key = lookup(&index)?;
    let hashes = Hashes::new(&username, key);
    debug!(
        "[{}] key index {}, sending server hash {}",
        username, index, hashes.server
    );

    let confirmation = link
        .execute(Command::ServerHash(hashes.server), MAX_CONFIRMATION_LEN)
        .await?;
    if confirmation.len() > MAX_CONFIRMATION_DIGITS {
        return Err(Error::Syntax(format!(
            "confirmation {:?} too long",
            confirmation
        )));
    }
    let confirmation = confirmation
        .parse::<i64>()
        .map_err(|_| Error::Syntax(format!("confirmation {:?} is not a number", confirmation)))?;

    if confirmation != i64::from(hashes.client) {
        warn!(
            "[{}] client hash mismatch, expect {} got {}",
            username, hashes.client, confirmation
        );
        return Err(Error::LoginFailed);
    }

    link.send(Command::Ok).await?;
    info!("[{}] authenticated", username);
    Ok(username)
}
