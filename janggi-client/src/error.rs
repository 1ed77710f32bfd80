//! 客户端错误类型

use thiserror::Error;

use janggi_protocol::{Action, ProtocolError};

/// 客户端错误
#[derive(Error, Debug)]
pub enum ClientError {
    /// 协议/传输错误（连接失败、发送失败等）
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// 发送前未建立连接
    #[error("Not connected")]
    NotConnected,

    /// 请求缺少必需的坐标
    #[error("{action} requires a {role} coordinate")]
    MissingCoordinate { action: Action, role: &'static str },

    /// 不是客户端可以发起的请求
    #[error("{0} is not a client request")]
    UnsupportedAction(Action),

    /// 配置文件错误
    #[error("Config error ({path}): {reason}")]
    Config { path: String, reason: String },

    /// 无法创建异步运行时
    #[error("Runtime error: {0}")]
    Runtime(#[source] std::io::Error),
}

impl ClientError {
    /// 是否为建立连接失败
    pub fn is_connection_failed(&self) -> bool {
        matches!(
            self,
            ClientError::Protocol(ProtocolError::ConnectionFailed { .. })
        )
    }

    /// 是否为连接建立后的发送失败
    pub fn is_send_failed(&self) -> bool {
        matches!(self, ClientError::Protocol(ProtocolError::SendFailed(_)))
    }
}

/// 客户端操作结果类型
pub type Result<T> = std::result::Result<T, ClientError>;
