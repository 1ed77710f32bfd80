//! 韩国象棋（Janggi）客户端/服务端共享协议库
//!
//! 包含:
//! - 棋子、坐标等数据结构（含行翻转）
//! - 消息信封与负载类型定义
//! - 信封编解码与负载还原
//! - 传输层抽象 (Connector, Connection, Listener traits) 与长度前缀帧

mod codec;
mod constants;
mod error;
mod message;
mod piece;
mod transport;

pub use codec::{decode, decode_with, encode, resolve_payload, Role};
pub use constants::*;
pub use error::{ProtocolError, Result};
pub use message::{
    Action, DestinationSet, GameState, Message, MoveOrder, Payload, PieceSet, SetupChoice,
    StatusReport,
};
pub use piece::{Category, Color, Coordinate, LenientEnum, PieceSnapshot};
pub use transport::{
    Connection, Connector, Endpoint, FrameReader, FrameWriter, Listener, TcpConnection,
    TcpConnector, TcpListener,
};
