//! 请求处理器

use std::future::Future;

use async_trait::async_trait;
use janggi_protocol::Message;

/// 请求处理器，由规则引擎实现
///
/// 返回 None 表示不回复，连接直接关闭。
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    async fn handle(&self, request: Message) -> Option<Message>;
}

/// 闭包适配器
pub struct FnHandler<F> {
    f: F,
}

/// 用异步闭包构造处理器
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<Message>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<Message>> + Send + 'static,
{
    async fn handle(&self, request: Message) -> Option<Message> {
        (self.f)(request).await
    }
}
