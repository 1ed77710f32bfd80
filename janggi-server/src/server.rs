//! 服务器主逻辑
//!
//! 每个连接只处理一次交换：读取一帧请求，交给处理器，写回回复后关闭。

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use janggi_protocol::{Connection, Endpoint, Listener, ProtocolError, Role, TcpListener};

use crate::handler::RequestHandler;

/// 服务器
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// 绑定地址，端口为 0 时由系统分配
    pub async fn bind(addr: &str) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("无法绑定地址 {}", addr))?;
        let local_addr = listener
            .local_addr()
            .and_then(|a| a.parse().ok())
            .context("无法获取监听地址")?;

        tracing::info!("Serving on {}", local_addr);
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 客户端连接用的地址
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::from(self.local_addr)
    }

    /// 接受连接直到 shutdown 完成，每个连接在独立任务中处理
    pub async fn serve<H, F>(mut self, handler: Arc<H>, shutdown: F) -> anyhow::Result<()>
    where
        H: RequestHandler,
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Server on {} shutting down", self.local_addr);
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok(conn) => {
                            let handler = Arc::clone(&handler);
                            tokio::spawn(async move {
                                if let Err(e) = serve_connection(conn, handler.as_ref()).await {
                                    tracing::warn!("Connection error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept failed: {}", e);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// 在后台任务中运行
    pub fn spawn<H: RequestHandler>(self, handler: Arc<H>) -> ServerHandle {
        let endpoint = self.endpoint();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(self.serve(handler, async move {
            let _ = shutdown_rx.await;
        }));

        ServerHandle {
            endpoint,
            shutdown_tx: Some(shutdown_tx),
            task,
        }
    }
}

/// 后台服务器句柄
pub struct ServerHandle {
    endpoint: Endpoint,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl ServerHandle {
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// 停止接受新连接并等待服务循环退出
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        (&mut self.task).await.context("服务任务异常退出")?
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some() {
            self.task.abort();
        }
    }
}

/// 处理单个连接上的一次请求/回复
///
/// 请求格式错误时记录日志并关闭连接，不回复。
pub async fn serve_connection<C, H>(mut conn: C, handler: &H) -> janggi_protocol::Result<()>
where
    C: Connection,
    H: RequestHandler + ?Sized,
{
    let peer = conn.peer_addr().unwrap_or_else(|| "unknown".to_string());

    let request = match conn.recv(Role::Server).await {
        Ok(request) => request,
        Err(e @ ProtocolError::MalformedEnvelope { .. }) => {
            tracing::warn!("Rejecting request from {}: {}", peer, e);
            return conn.close().await;
        }
        Err(e) => return Err(e),
    };

    tracing::debug!("Received {} from {}", request.action, peer);

    if let Some(reply) = handler.handle(request).await {
        tracing::debug!("Send {} to {}", reply.action, peer);
        conn.send(&reply).await?;
    }

    conn.close().await
}
