//! 同步调用封装
//!
//! 界面线程不在异步上下文中，这里持有自己的多线程 tokio Runtime。
//! 读循环运行在 Runtime 的工作线程上，两次调用之间迟到的回复照常写入缓存。

use tokio::runtime::Runtime;

use janggi_protocol::{Action, Color, Coordinate, GameState, PieceSnapshot, SetupChoice};

use crate::client::{Client, DispatchOutcome};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// 阻塞式客户端
pub struct BlockingClient {
    client: Client,
    runtime: Runtime,
}

impl BlockingClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("janggi-client")
            .enable_all()
            .build()
            .map_err(ClientError::Runtime)?;

        Ok(Self {
            client: Client::new(config),
            runtime,
        })
    }

    /// 分发请求，最多阻塞该请求的等待上限
    pub fn dispatch(
        &self,
        action: Action,
        source: Option<Coordinate>,
        destination: Option<Coordinate>,
    ) -> Result<DispatchOutcome> {
        self.runtime
            .block_on(self.client.dispatch(action, source, destination))
    }

    pub fn confirm_setup(&self, choice: SetupChoice) -> Result<DispatchOutcome> {
        self.runtime.block_on(self.client.confirm_setup(choice))
    }

    pub fn close(&self) -> Result<()> {
        self.runtime.block_on(self.client.close())
    }

    pub fn piece_snapshots(&self) -> Vec<PieceSnapshot> {
        self.client.piece_snapshots()
    }

    pub fn legal_destinations(&self) -> Vec<Coordinate> {
        self.client.legal_destinations()
    }

    pub fn game_state(&self) -> GameState {
        self.client.game_state()
    }

    pub fn player_turn(&self) -> Color {
        self.client.player_turn()
    }

    pub fn is_checked(&self) -> bool {
        self.client.is_checked()
    }
}
