//! 传输层抽象
//!
//! 提供 Connector/Connection/Listener traits 使上层协议与具体传输实现解耦。
//! 帧格式: 4 字节大端长度 + 信封编码后的消息体，读写两端对称。

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::codec::{self, Role};
use crate::error::{ProtocolError, Result};
use crate::message::Message;
use crate::{CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_PORT, HEADER_SIZE, MAX_FRAME_SIZE};

/// 服务端地址
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<std::net::SocketAddr> for Endpoint {
    fn from(addr: std::net::SocketAddr) -> Self {
        Self {
            host: addr.ip().to_string(),
            port: addr.port(),
        }
    }
}

/// 连接抽象 trait
#[async_trait]
pub trait Connection: Send + Sync {
    /// 编码并发送一条消息
    async fn send(&mut self, msg: &Message) -> Result<()>;

    /// 接收一帧原始消息体
    async fn recv_frame(&mut self) -> Result<Vec<u8>>;

    /// 接收并按角色解码一条消息
    async fn recv(&mut self, role: Role) -> Result<Message> {
        let frame = self.recv_frame().await?;
        codec::decode_with(&frame, role)
    }

    /// 关闭连接
    async fn close(&mut self) -> Result<()>;

    /// 获取远端地址
    fn peer_addr(&self) -> Option<String>;
}

/// 连接器 trait（客户端使用）
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Connection;

    /// 建立连接
    async fn connect(&self, endpoint: &Endpoint) -> Result<Self::Conn>;
}

/// 监听器 trait（服务端使用）
#[async_trait]
pub trait Listener: Send + Sync + Sized {
    type Conn: Connection;

    /// 绑定地址
    async fn bind(addr: &str) -> Result<Self>;

    /// 接受连接
    async fn accept(&mut self) -> Result<Self::Conn>;

    /// 获取本地地址
    fn local_addr(&self) -> Option<String>;
}

// ============================================================================
// TCP 实现
// ============================================================================

/// TCP 连接器
#[derive(Clone, Debug)]
pub struct TcpConnector {
    pub connect_timeout: Duration,
}

impl TcpConnector {
    pub fn with_timeout(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Conn = TcpConnection;

    async fn connect(&self, endpoint: &Endpoint) -> Result<Self::Conn> {
        let addr = endpoint.to_string();
        let stream = timeout(self.connect_timeout, TcpStream::connect(addr.as_str()))
            .await
            .map_err(|_| ProtocolError::ConnectionFailed {
                addr: addr.clone(),
                reason: format!("timed out after {:?}", self.connect_timeout),
            })?
            .map_err(|e| ProtocolError::ConnectionFailed {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!("Connected to {}", addr);
        TcpConnection::from_stream(stream)
    }
}

/// TCP 连接
pub struct TcpConnection {
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
    peer_addr: Option<String>,
}

impl TcpConnection {
    /// 从 TcpStream 创建（服务端使用）
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr().ok().map(|a| a.to_string());
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: FrameReader::new(read_half),
            writer: FrameWriter::new(write_half),
            peer_addr,
        })
    }

    /// 分离读写端
    pub fn split(self) -> (FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>) {
        (self.reader, self.writer)
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send(&mut self, msg: &Message) -> Result<()> {
        self.writer.send(msg).await
    }

    async fn recv_frame(&mut self) -> Result<Vec<u8>> {
        self.reader.read_frame().await
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer_addr.clone()
    }
}

/// TCP 监听器
pub struct TcpListener {
    listener: tokio::net::TcpListener,
}

#[async_trait]
impl Listener for TcpListener {
    type Conn = TcpConnection;

    async fn bind(addr: &str) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(ProtocolError::Io)?;
        Ok(Self { listener })
    }

    async fn accept(&mut self) -> Result<Self::Conn> {
        let (stream, _addr) = self.listener.accept().await.map_err(ProtocolError::Io)?;
        TcpConnection::from_stream(stream)
    }

    fn local_addr(&self) -> Option<String> {
        self.listener.local_addr().ok().map(|a| a.to_string())
    }
}

// ============================================================================
// 帧编解码
// ============================================================================

fn map_read_error(e: std::io::Error) -> ProtocolError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        ProtocolError::ConnectionClosed
    } else {
        ProtocolError::Io(e)
    }
}

/// 帧读取器
pub struct FrameReader<R> {
    reader: R,
}

impl<R: AsyncRead + Unpin + Send> FrameReader<R> {
    /// 创建新的帧读取器
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// 读取一帧消息体，对端在帧边界关闭时返回 `ConnectionClosed`
    pub async fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut header = [0u8; HEADER_SIZE];
        self.reader
            .read_exact(&mut header)
            .await
            .map_err(map_read_error)?;

        // 解析长度（大端序）
        let length = u32::from_be_bytes(header) as usize;
        if length > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: length,
                max: MAX_FRAME_SIZE,
            });
        }

        let mut body = vec![0u8; length];
        self.reader
            .read_exact(&mut body)
            .await
            .map_err(map_read_error)?;

        Ok(body)
    }

    /// 读取并按角色解码一条消息
    pub async fn recv(&mut self, role: Role) -> Result<Message> {
        let frame = self.read_frame().await?;
        codec::decode_with(&frame, role)
    }
}

/// 帧写入器
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> FrameWriter<W> {
    /// 创建新的帧写入器
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// 写入一帧消息体，写入失败返回 `SendFailed`
    pub async fn write_frame(&mut self, body: &[u8]) -> Result<()> {
        if body.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: body.len(),
                max: MAX_FRAME_SIZE,
            });
        }

        let header = (body.len() as u32).to_be_bytes();
        self.writer
            .write_all(&header)
            .await
            .map_err(ProtocolError::SendFailed)?;
        self.writer
            .write_all(body)
            .await
            .map_err(ProtocolError::SendFailed)?;
        self.writer.flush().await.map_err(ProtocolError::SendFailed)?;

        Ok(())
    }

    /// 编码并发送一条消息
    pub async fn send(&mut self, msg: &Message) -> Result<()> {
        let body = codec::encode(msg)?;
        self.write_frame(&body).await
    }

    /// 关闭写端
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Action, DestinationSet, Payload};
    use crate::piece::Coordinate;

    #[tokio::test]
    async fn test_frame_round_trip_in_memory() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = FrameWriter::new(client);
        let mut reader = FrameReader::new(server);

        writer.write_frame(b"first").await.unwrap();
        writer.write_frame(b"").await.unwrap();
        writer.write_frame(b"third").await.unwrap();

        assert_eq!(reader.read_frame().await.unwrap(), b"first");
        assert_eq!(reader.read_frame().await.unwrap(), b"");
        assert_eq!(reader.read_frame().await.unwrap(), b"third");
    }

    #[tokio::test]
    async fn test_frame_header_is_big_endian_length() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut writer = FrameWriter::new(client);
        writer.write_frame(b"hello").await.unwrap();

        let mut raw = [0u8; 9];
        server.read_exact(&mut raw).await.unwrap();
        assert_eq!(&raw[..4], &[0, 0, 0, 5]);
        assert_eq!(&raw[4..], b"hello");
    }

    #[tokio::test]
    async fn test_clean_shutdown_is_connection_closed() {
        let (client, server) = tokio::io::duplex(64);
        let mut writer = FrameWriter::new(client);
        let mut reader = FrameReader::new(server);

        writer.write_frame(b"last").await.unwrap();
        writer.shutdown().await.unwrap();
        drop(writer);

        assert_eq!(reader.read_frame().await.unwrap(), b"last");
        assert!(matches!(
            reader.read_frame().await,
            Err(ProtocolError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_rejects_oversized_frames() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut writer = FrameWriter::new(client);
        let big = vec![0u8; MAX_FRAME_SIZE + 1];
        assert!(matches!(
            writer.write_frame(&big).await,
            Err(ProtocolError::FrameTooLarge { .. })
        ));

        let (mut raw_writer, raw_reader) = tokio::io::duplex(64);
        raw_writer
            .write_all(&((MAX_FRAME_SIZE as u32) + 1).to_be_bytes())
            .await
            .unwrap();
        let mut reader = FrameReader::new(raw_reader);
        assert!(matches!(
            reader.read_frame().await,
            Err(ProtocolError::FrameTooLarge { .. })
        ));

        // 超限帧不会写出任何字节
        drop(writer);
        let mut rest = Vec::new();
        server.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_write_to_closed_peer_is_send_failed() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);

        let mut writer = FrameWriter::new(client);
        assert!(matches!(
            writer.send(&Message::bare(Action::NewGame)).await,
            Err(ProtocolError::SendFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_tcp_connection() {
        let mut listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: std::net::SocketAddr = listener.local_addr().unwrap().parse().unwrap();

        let client_handle = tokio::spawn(async move {
            let connector = TcpConnector::default();
            let mut conn = connector.connect(&Endpoint::from(addr)).await.unwrap();

            conn.send(&Message::with_payload(
                Action::GetPieceDestinations,
                Payload::DestinationSet(DestinationSet {
                    source: Coordinate::new(0, 9),
                    destinations: None,
                }),
            ))
            .await
            .unwrap();

            let msg = conn.recv(Role::Client).await.unwrap();
            assert_eq!(msg.action, Action::PieceDestinations);
            match msg.payload {
                Some(Payload::DestinationSet(set)) => {
                    assert_eq!(set.destinations, Some(vec![Coordinate::new(1, 0)]));
                }
                other => panic!("Unexpected payload: {:?}", other),
            }
        });

        let mut conn = listener.accept().await.unwrap();
        let msg = conn.recv(Role::Server).await.unwrap();
        assert_eq!(msg.action, Action::GetPieceDestinations);

        conn.send(&Message::with_payload(
            Action::PieceDestinations,
            Payload::DestinationSet(DestinationSet {
                source: Coordinate::new(0, 9),
                destinations: Some(vec![Coordinate::new(1, 0)]),
            }),
        ))
        .await
        .unwrap();
        conn.close().await.unwrap();

        client_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_failed() {
        // 绑定后立即释放，得到一个无人监听的端口
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = TcpConnector::default()
            .connect(&Endpoint::from(addr))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ProtocolError::ConnectionFailed { .. }));
    }
}
