//! 请求分发器
//!
//! 每个请求都新建连接、发送，然后最多等待该请求的上限时间，期间读循环
//! 可能把回复写入缓存。超时不是错误：调用方照常返回，缓存保持旧值，
//! 迟到的回复之后仍会写入缓存，但不再通知原调用方。

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;

use janggi_protocol::{
    Action, Color, Coordinate, DestinationSet, GameState, Message, MoveOrder, Payload,
    PieceSnapshot, SetupChoice, TcpConnector,
};

use crate::channel::{Channel, ConnectionId, Inbound};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::state::{GameStatus, SharedState};

/// 一次分发的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 已发出，不等待回复
    Sent,
    /// 在上限内收到预期回复，携带数据的回复已写入缓存
    Answered,
    /// 收到预期回复但负载无法还原，缓存保持旧值
    Unresolved(Action),
    /// 在上限内收到了其他动作的回复
    Unexpected(Action),
    /// 上限内没有回复，缓存保持旧值
    TimedOut,
}

/// 连接上收到的第一条回复
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reply {
    action: Action,
    /// 是否写入了缓存
    applied: bool,
}

type Waiters = HashMap<ConnectionId, oneshot::Sender<Reply>>;

/// 等待中的请求，按连接关联回复
#[derive(Default)]
struct PendingReplies {
    waiters: StdMutex<Waiters>,
}

impl PendingReplies {
    fn register(&self, connection: ConnectionId) -> oneshot::Receiver<Reply> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(connection, tx);
        rx
    }

    fn complete(&self, connection: ConnectionId, reply: Reply) {
        if let Some(tx) = self.lock().remove(&connection) {
            let _ = tx.send(reply);
        }
    }

    fn cancel(&self, connection: ConnectionId) {
        self.lock().remove(&connection);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Waiters> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Inner {
    config: ClientConfig,
    channel: Channel,
    state: Arc<SharedState>,
    pending: Arc<PendingReplies>,
    /// 保证 connect 与 send 成对执行
    send_lock: Mutex<()>,
}

/// 请求分发器
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let channel = Channel::new(TcpConnector::with_timeout(config.connect_timeout()));
        let state = Arc::new(SharedState::new());
        let pending = Arc::new(PendingReplies::default());

        {
            let state = Arc::clone(&state);
            let pending = Arc::clone(&pending);
            channel.on_message(move |inbound: Inbound| {
                let action = inbound.message.action;
                let applied = state.apply(&inbound.message);
                if applied {
                    tracing::debug!("Cached {} from connection {}", action, inbound.connection);
                }
                // 先写缓存再唤醒，调用方返回时能看到新值
                pending.complete(inbound.connection, Reply { action, applied });
            });
        }

        Self {
            inner: Arc::new(Inner {
                config,
                channel,
                state,
                pending,
                send_lock: Mutex::new(()),
            }),
        }
    }

    /// 分发一个请求
    ///
    /// source/destination 使用棋盘行序，发送前转换为线上行序。
    /// 连接或发送失败会返回错误；等待超时返回 `DispatchOutcome::TimedOut`。
    pub async fn dispatch(
        &self,
        action: Action,
        source: Option<Coordinate>,
        destination: Option<Coordinate>,
    ) -> Result<DispatchOutcome> {
        let payload = build_payload(action, source, destination)?;
        self.request(Message::new(action, payload)).await
    }

    /// 提交马象换位，发出即返回
    pub async fn confirm_setup(&self, choice: SetupChoice) -> Result<DispatchOutcome> {
        self.request(Message::with_payload(
            Action::SetupCompleted,
            Payload::SetupChoice(choice),
        ))
        .await
    }

    async fn request(&self, message: Message) -> Result<DispatchOutcome> {
        let action = message.action;
        let expected = action.reply();
        let bound = self.inner.config.bounds.bound_for(action);

        let (connection, waiter) = {
            let _guard = self.inner.send_lock.lock().await;
            let connection = self.inner.channel.connect(&self.inner.config.endpoint).await?;
            let waiter = bound.map(|_| self.inner.pending.register(connection));

            if let Err(e) = self.inner.channel.send(&message).await {
                self.inner.pending.cancel(connection);
                return Err(e);
            }
            (connection, waiter)
        };

        let (Some(bound), Some(waiter)) = (bound, waiter) else {
            return Ok(DispatchOutcome::Sent);
        };

        match timeout(bound, waiter).await {
            Ok(Ok(reply)) if Some(reply.action) == expected => {
                if reply.applied || !carries_payload(reply.action) {
                    Ok(DispatchOutcome::Answered)
                } else {
                    tracing::warn!("{} payload unresolved, keeping cached state", reply.action);
                    Ok(DispatchOutcome::Unresolved(reply.action))
                }
            }
            Ok(Ok(reply)) => {
                tracing::warn!("{} answered with {}", action, reply.action);
                Ok(DispatchOutcome::Unexpected(reply.action))
            }
            Ok(Err(_)) | Err(_) => {
                self.inner.pending.cancel(connection);
                tracing::debug!(
                    "{} not answered within {:?}, keeping cached state",
                    action,
                    bound
                );
                Ok(DispatchOutcome::TimedOut)
            }
        }
    }

    /// 关闭当前连接并停止所有读循环
    pub async fn close(&self) -> Result<()> {
        self.inner.channel.close().await
    }

    pub fn piece_snapshots(&self) -> Vec<PieceSnapshot> {
        self.inner.state.piece_snapshots()
    }

    pub fn legal_destinations(&self) -> Vec<Coordinate> {
        self.inner.state.legal_destinations()
    }

    pub fn game_state(&self) -> GameState {
        self.inner.state.game_state()
    }

    pub fn player_turn(&self) -> Color {
        self.inner.state.player_turn()
    }

    pub fn is_checked(&self) -> bool {
        self.inner.state.is_checked()
    }

    /// 状态字段组的一致副本
    pub fn status(&self) -> GameStatus {
        self.inner.state.status()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

/// 回复是否携带需要写入缓存的数据
fn carries_payload(action: Action) -> bool {
    matches!(
        action,
        Action::GameStarted | Action::GameStatus | Action::PieceDestinations
    )
}

fn require(
    action: Action,
    coordinate: Option<Coordinate>,
    role: &'static str,
) -> Result<Coordinate> {
    coordinate.ok_or(ClientError::MissingCoordinate { action, role })
}

/// 构造请求负载，坐标转换为线上行序
fn build_payload(
    action: Action,
    source: Option<Coordinate>,
    destination: Option<Coordinate>,
) -> Result<Option<Payload>> {
    let payload = match action {
        Action::NewGame | Action::GetGameStatus | Action::EndGame => None,
        Action::GetPieceDestinations => Some(Payload::DestinationSet(DestinationSet {
            source: require(action, source, "source")?.to_wire(),
            destinations: None,
        })),
        Action::MoveCompleted => Some(Payload::MoveOrder(MoveOrder {
            source: require(action, source, "source")?.to_wire(),
            destination: require(action, destination, "destination")?.to_wire(),
        })),
        Action::SetupCompleted => Some(Payload::SetupChoice(SetupChoice::default())),
        other => return Err(ClientError::UnsupportedAction(other)),
    };
    Ok(payload)
}
