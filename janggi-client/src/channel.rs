//! 客户端通道
//!
//! 持有至多一个可写连接，每个连接有自己的读循环，把解码后的消息交给
//! 唯一注册的处理器。处理器运行在读循环所在的任务上，而不是调用方线程。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock};

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use janggi_protocol::{
    decode, Connector, Endpoint, FrameReader, FrameWriter, Message, ProtocolError, TcpConnector,
};

use crate::error::{ClientError, Result};

/// 连接编号，每次 connect 递增
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 收到的一条消息及其所在连接
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub connection: ConnectionId,
    pub message: Message,
}

type Handler = Arc<dyn Fn(Inbound) + Send + Sync>;

/// 客户端通道
pub struct Channel {
    connector: TcpConnector,
    handler: Arc<RwLock<Option<Handler>>>,
    writer: Mutex<Option<(ConnectionId, FrameWriter<OwnedWriteHalf>)>>,
    readers: StdMutex<JoinSet<()>>,
    next_id: AtomicU64,
}

impl Channel {
    pub fn new(connector: TcpConnector) -> Self {
        Self {
            connector,
            handler: Arc::new(RwLock::new(None)),
            writer: Mutex::new(None),
            readers: StdMutex::new(JoinSet::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// 注册消息处理器，重复注册会替换旧的处理器
    pub fn on_message<F>(&self, handler: F)
    where
        F: Fn(Inbound) + Send + Sync + 'static,
    {
        let mut slot = self.handler.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(handler));
    }

    /// 建立新连接并替换当前连接
    ///
    /// 旧连接的读循环继续运行直到对端关闭，迟到的回复仍会交给处理器。
    pub async fn connect(&self, endpoint: &Endpoint) -> Result<ConnectionId> {
        let conn = self.connector.connect(endpoint).await?;
        let (reader, writer) = conn.split();
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        {
            let mut readers = self.readers.lock().unwrap_or_else(PoisonError::into_inner);
            // 回收已结束的读循环
            while readers.try_join_next().is_some() {}
            readers.spawn(read_loop(id, reader, Arc::clone(&self.handler)));
        }

        let previous = self.writer.lock().await.replace((id, writer));
        if let Some((previous_id, _)) = previous {
            tracing::debug!("Connection {} replaced by {}", previous_id, id);
        }

        tracing::debug!("Connection {} open to {}", id, endpoint);
        Ok(id)
    }

    /// 通过当前连接发送消息
    pub async fn send(&self, message: &Message) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let (id, writer) = guard.as_mut().ok_or(ClientError::NotConnected)?;

        writer.send(message).await?;
        tracing::debug!("Sent {} on connection {}", message.action, id);
        Ok(())
    }

    /// 当前可写连接
    pub async fn current(&self) -> Option<ConnectionId> {
        self.writer.lock().await.as_ref().map(|(id, _)| *id)
    }

    pub async fn is_connected(&self) -> bool {
        self.current().await.is_some()
    }

    /// 关闭当前连接并停止所有读循环
    pub async fn close(&self) -> Result<()> {
        let previous = self.writer.lock().await.take();
        self.readers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .abort_all();

        if let Some((id, mut writer)) = previous {
            tracing::debug!("Closing connection {}", id);
            writer.shutdown().await?;
        }
        Ok(())
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new(TcpConnector::default())
    }
}

/// 读循环：坏帧只记录日志，不终止循环
async fn read_loop(
    id: ConnectionId,
    mut reader: FrameReader<OwnedReadHalf>,
    handler: Arc<RwLock<Option<Handler>>>,
) {
    loop {
        let frame = match reader.read_frame().await {
            Ok(frame) => frame,
            Err(ProtocolError::ConnectionClosed) => {
                tracing::debug!("Connection {} closed by peer", id);
                break;
            }
            Err(e) => {
                tracing::warn!("Receive error on connection {}: {}", id, e);
                break;
            }
        };

        let message = match decode(&frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Skipping bad frame on connection {}: {}", id, e);
                continue;
            }
        };

        tracing::debug!("Received {} on connection {}", message.action, id);

        let current = handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match current {
            Some(handler) => handler(Inbound {
                connection: id,
                message,
            }),
            None => tracing::debug!("No handler registered, dropping {}", message.action),
        }
    }
}
