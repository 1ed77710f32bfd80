//! 错误类型定义

use thiserror::Error;

use crate::message::Action;

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// 信封格式错误（缺少或无法识别 Action），只影响当前这一帧
    #[error("Malformed envelope: {reason}")]
    MalformedEnvelope { reason: String },

    /// Action 已知但负载结构不符，解码时降级为空负载
    #[error("Unresolved payload for {action}: {reason}")]
    UnresolvedPayload { action: Action, reason: String },

    /// 建立连接失败（拒绝、重置、超时）
    #[error("Connection to {addr} failed: {reason}")]
    ConnectionFailed { addr: String, reason: String },

    /// 连接建立后写入失败
    #[error("Send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 帧大小超限
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化错误
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ProtocolError::MalformedEnvelope {
            reason: reason.into(),
        }
    }
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
