//! 韩国象棋服务端传输层
//!
//! 包含:
//! - 监听与连接服务（每个连接一次请求、一次回复）
//! - 请求处理器抽象（规则引擎在此接入）

pub mod handler;
pub mod server;

pub use handler::{handler_fn, FnHandler, RequestHandler};
pub use server::{serve_connection, Server, ServerHandle};
