//! 协议常量定义

use std::time::Duration;

/// 服务端默认地址（仅回环）
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// 服务端默认端口
pub const DEFAULT_PORT: u16 = 9001;

/// 棋盘宽度（列数）
pub const BOARD_COLUMNS: i32 = 9;

/// 棋盘高度（行数）
pub const BOARD_ROWS: i32 = 10;

/// 帧头大小: 4 字节大端长度
pub const HEADER_SIZE: usize = 4;

/// 消息帧最大大小
pub const MAX_FRAME_SIZE: usize = 65536;

/// 连接超时（毫秒）
pub const CONNECT_TIMEOUT_MS: u64 = 2000;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(CONNECT_TIMEOUT_MS);

/// 新对局请求等待上限（毫秒）
pub const NEW_GAME_BOUND_MS: u64 = 500;

/// 走棋确认等待上限（毫秒）
pub const MOVE_COMPLETED_BOUND_MS: u64 = 250;

/// 对局状态查询等待上限（毫秒）
pub const GAME_STATUS_BOUND_MS: u64 = 250;

/// 可走位置查询等待上限（毫秒）
pub const PIECE_DESTINATIONS_BOUND_MS: u64 = 100;

/// 结束对局等待上限（毫秒）
pub const END_GAME_BOUND_MS: u64 = 250;
