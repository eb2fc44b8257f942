use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::net::TcpListener;

use crate::{
    config::Config, error::Error, network::ClientConnection, protocol::Session, Hook, HookNoop,
};

/// 服务端，每个连接一个独立的会话任务
pub struct Server {
    cfg: Config,
}

impl Server {
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }

    pub async fn start(&self) -> Result<(), Error> {
        self.start_with_hook(Arc::new(HookNoop)).await
    }

    pub async fn start_with_hook<H: Hook>(&self, hook: Arc<H>) -> Result<(), Error> {
        let listener = TcpListener::bind(&self.cfg.server.addr).await?;
        info!("listening on {}", listener.local_addr()?);
        self.serve(listener, hook).await
    }

    /// 在已绑定的 listener 上接受连接
    /// 会话之间不共享任何可变状态
    pub async fn serve<H: Hook>(&self, listener: TcpListener, hook: Arc<H>) -> Result<(), Error> {
        loop {
            // 获取到连接
            let (stream, addr) = match listener.accept().await {
                Ok((s, a)) => (s, a),
                Err(e) => {
                    error!("accept tcp stream err: {}", e);
                    continue;
                }
            };
            info!("new stream coming in: {}", addr);

            let cfg = self.cfg.clone();
            let session_hook = hook.clone();
            tokio::spawn(async move {
                let conn = ClientConnection::new(stream, cfg.timeouts);
                let mut session = Session::new(conn, &cfg, session_hook);
                match session.run().await {
                    Ok(message) => info!(
                        "[{}] session from {} finished with message {:?}",
                        session.username().unwrap_or("-"),
                        addr,
                        message
                    ),
                    Err(e) => warn!(
                        "[{}] session from {} closed: {}",
                        session.username().unwrap_or("-"),
                        addr,
                        e
                    ),
                }
                debug!("connection {} closed", addr);
            });
        }
    }
}
