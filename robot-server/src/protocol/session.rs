use std::sync::Arc;

use log::{debug, error, info};

use crate::{
    config::Config,
    network::{message::MAX_MESSAGE_LEN, Command, Link},
    Hook,
};

use super::{auth, navigator::Navigator, Error};

/// 会话状态，只能按顺序向前推进，失败时直接进入 Closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Authenticating,
    AcquiringFix,
    Navigating,
    Retrieving,
    LoggingOut,
    Closed,
}

impl State {
    /// 当前状态成功后的下一个状态
    fn next(self) -> State {
        match self {
            State::Authenticating => State::AcquiringFix,
            State::AcquiringFix => State::Navigating,
            State::Navigating => State::Retrieving,
            State::Retrieving => State::LoggingOut,
            State::LoggingOut | State::Closed => State::Closed,
        }
    }
}

/// 代表与一个机器人之间的一次会话
/// 连接断开时会话结束，不保存任何状态
pub(crate) struct Session<L: Link, H: Hook> {
    link: L,
    /// 认证成功后设置，之后不再改变
    username: Option<String>,
    navigator: Navigator,
    /// 取回的消息，会话的结果
    message: Option<String>,
    state: State,
    hook: Arc<H>,
}

impl<L: Link, H: Hook> Session<L, H> {
    pub(crate) fn new(link: L, cfg: &Config, hook: Arc<H>) -> Self {
        Self {
            link,
            username: None,
            navigator: Navigator::new(cfg.navigation.max_obstacle_retries),
            message: None,
            state: State::Authenticating,
            hook,
        }
    }

    pub(crate) fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// 运行会话直到结束，成功时返回取回的消息
    /// 任何阶段失败都会先给客户端发送对应的错误码，然后结束会话
    pub(crate) async fn run(&mut self) -> Result<String, Error> {
        while self.state != State::Closed {
            debug!("[{}] entering {:?}", self.name(), self.state);
            if let Err(e) = self.handle().await {
                error!("[{}] session failed in {:?}: {}", self.name(), self.state, e);
                if let Some(reply) = e.reply() {
                    // 连接即将关闭，写失败无需处理
                    if let Err(we) = self.link.send(reply).await {
                        debug!("[{}] write {} failed: {}", self.name(), reply, we);
                    }
                }
                self.close().await;
                return Err(e);
            }
            self.state = self.state.next();
        }

        self.close().await;
        self.message
            .clone()
            .ok_or_else(|| Error::Logic("session closed without a message".into()))
    }

    /// 执行当前状态的动作
    async fn handle(&mut self) -> Result<(), Error> {
        match self.state {
            State::Authenticating => {
                let username = auth::authenticate(&mut self.link).await?;
                self.hook.connected(&username).await;
                self.username = Some(username);
            }
            State::AcquiringFix => {
                self.navigator.acquire_fix(&mut self.link).await?;
                debug!(
                    "[{}] initial fix {:?}, heading {:?}",
                    self.name(),
                    self.navigator.position(),
                    self.navigator.heading()
                );
            }
            State::Navigating => {
                self.navigator.navigate_to_target(&mut self.link).await?;
                info!("[{}] reached target", self.name());
            }
            State::Retrieving => {
                let message = self
                    .link
                    .execute(Command::GetMessage, MAX_MESSAGE_LEN)
                    .await?;
                info!("[{}] retrieved message: {}", self.name(), message);
                self.hook.message_retrieved(self.name(), &message).await;
                self.message = Some(message);
            }
            State::LoggingOut => self.link.send(Command::Logout).await?,
            State::Closed => {}
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.state = State::Closed;
        if let Some(username) = &self.username {
            self.hook.disconnect(username).await;
        }
    }

    fn name(&self) -> &str {
        self.username.as_deref().unwrap_or("-")
    }
}
