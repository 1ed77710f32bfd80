//! 韩国象棋客户端网络层
//!
//! 包含:
//! - 客户端通道（连接生命周期、读循环、消息处理器）
//! - 请求分发器（按请求限时等待、最近已知状态缓存）
//! - 同步调用封装，供不在异步上下文中的界面使用
//! - 客户端配置

pub mod blocking;
pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod state;

pub use blocking::BlockingClient;
pub use channel::{Channel, ConnectionId, Inbound};
pub use client::{Client, DispatchOutcome};
pub use config::{ClientConfig, RequestBounds};
pub use error::{ClientError, Result};
pub use state::{GameStatus, SharedState};
