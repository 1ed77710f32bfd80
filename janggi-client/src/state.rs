//! 最近一次已知的对局状态
//!
//! 由读循环写入、由调用方读取。每组字段一把锁，读取得到整体副本，
//! 不会读到一半更新的值。后到的回复直接覆盖先到的。

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use janggi_protocol::{
    Color, Coordinate, DestinationSet, GameState, LenientEnum, Message, Payload, PieceSnapshot,
    StatusReport,
};

/// 对局状态字段组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GameStatus {
    pub game_state: GameState,
    pub player_turn: Color,
    pub is_checked: bool,
}

/// 共享的缓存状态
#[derive(Debug, Default)]
pub struct SharedState {
    pieces: RwLock<Arc<Vec<PieceSnapshot>>>,
    destinations: RwLock<Arc<Vec<Coordinate>>>,
    status: RwLock<GameStatus>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 把回复中的负载写入对应字段，返回是否有字段被更新
    pub fn apply(&self, message: &Message) -> bool {
        match &message.payload {
            Some(Payload::PieceSet(set)) => {
                *write(&self.pieces) = Arc::new(set.pieces.clone());
                true
            }
            Some(Payload::DestinationSet(set)) => {
                self.apply_destinations(set);
                true
            }
            Some(Payload::StatusReport(report)) => {
                self.apply_status(report);
                true
            }
            _ => false,
        }
    }

    fn apply_destinations(&self, set: &DestinationSet) {
        // 线上行序还原为棋盘行序；没有列表视为没有可走位置
        let destinations: Vec<Coordinate> = set
            .destinations
            .iter()
            .flatten()
            .map(|c| c.from_wire())
            .collect();
        *write(&self.destinations) = Arc::new(destinations);
    }

    fn apply_status(&self, report: &StatusReport) {
        let mut status = write(&self.status);

        // 无法识别的名称保留旧值
        match GameState::parse_lenient(&report.game_state) {
            Some(state) => status.game_state = state,
            None => tracing::warn!("Ignoring unknown game state `{}`", report.game_state),
        }
        match Color::parse_lenient(&report.player_turn) {
            Some(turn) => status.player_turn = turn,
            None => tracing::warn!("Ignoring unknown player turn `{}`", report.player_turn),
        }
        status.is_checked = report.is_checked;
    }

    pub fn piece_snapshots(&self) -> Vec<PieceSnapshot> {
        read(&self.pieces).as_ref().clone()
    }

    pub fn legal_destinations(&self) -> Vec<Coordinate> {
        read(&self.destinations).as_ref().clone()
    }

    /// 状态字段组的一致副本
    pub fn status(&self) -> GameStatus {
        *read(&self.status)
    }

    pub fn game_state(&self) -> GameState {
        self.status().game_state
    }

    pub fn player_turn(&self) -> Color {
        self.status().player_turn
    }

    pub fn is_checked(&self) -> bool {
        self.status().is_checked
    }
}
