//! 客户端配置
//!
//! 服务端地址、连接超时与各请求的等待上限，可持久化为 JSON。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use janggi_protocol::{
    Action, Endpoint, CONNECT_TIMEOUT_MS, END_GAME_BOUND_MS, GAME_STATUS_BOUND_MS,
    MOVE_COMPLETED_BOUND_MS, NEW_GAME_BOUND_MS, PIECE_DESTINATIONS_BOUND_MS,
};

use crate::error::{ClientError, Result};

/// 各请求等待回复的上限（毫秒）
///
/// 这是界面能容忍的阻塞时间，不保证回复一定在上限内到达。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestBounds {
    pub new_game_ms: u64,
    pub move_completed_ms: u64,
    pub game_status_ms: u64,
    pub piece_destinations_ms: u64,
    pub end_game_ms: u64,
}

impl Default for RequestBounds {
    fn default() -> Self {
        Self {
            new_game_ms: NEW_GAME_BOUND_MS,
            move_completed_ms: MOVE_COMPLETED_BOUND_MS,
            game_status_ms: GAME_STATUS_BOUND_MS,
            piece_destinations_ms: PIECE_DESTINATIONS_BOUND_MS,
            end_game_ms: END_GAME_BOUND_MS,
        }
    }
}

impl RequestBounds {
    /// 请求的等待上限，None 表示发出即返回
    pub fn bound_for(&self, action: Action) -> Option<Duration> {
        let ms = match action {
            Action::NewGame => self.new_game_ms,
            Action::MoveCompleted => self.move_completed_ms,
            Action::GetGameStatus => self.game_status_ms,
            Action::GetPieceDestinations => self.piece_destinations_ms,
            Action::EndGame => self.end_game_ms,
            _ => return None,
        };
        Some(Duration::from_millis(ms))
    }
}

/// 客户端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 服务端地址
    pub endpoint: Endpoint,
    /// 连接超时（毫秒）
    pub connect_timeout_ms: u64,
    /// 请求等待上限
    pub bounds: RequestBounds,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            connect_timeout_ms: CONNECT_TIMEOUT_MS,
            bounds: RequestBounds::default(),
        }
    }
}

impl ClientConfig {
    /// 指定服务端地址，其余使用默认值
    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// 配置文件路径
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("janggi");
            path.push("client.json");
            path
        })
    }

    /// 从默认位置加载，任何问题都回退到默认配置
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            tracing::warn!("无法获取配置目录，使用默认配置");
            return Self::default();
        };

        if !path.exists() {
            tracing::info!("配置文件不存在，使用默认配置");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                tracing::info!("已加载配置: {:?}", path);
                config
            }
            Err(e) => {
                tracing::warn!("{}，使用默认配置", e);
                Self::default()
            }
        }
    }

    /// 从指定文件加载
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| config_error(path, e))?;
        serde_json::from_str(&content).map_err(|e| config_error(path, e))
    }

    /// 保存到默认位置
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or_else(|| ClientError::Config {
            path: "<config dir>".to_string(),
            reason: "无法获取配置目录".to_string(),
        })?;
        self.save_to(&path)
    }

    /// 保存到指定文件
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| config_error(path, e))?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|e| config_error(path, e))?;
        std::fs::write(path, content).map_err(|e| config_error(path, e))?;

        tracing::info!("配置已保存: {:?}", path);
        Ok(())
    }
}

fn config_error(path: &Path, e: impl std::fmt::Display) -> ClientError {
    ClientError::Config {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}
