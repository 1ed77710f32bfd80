//! 消息类型定义

use serde::{Deserialize, Serialize};

use crate::piece::{Coordinate, LenientEnum, PieceSnapshot};

/// 消息动作（信封的判别字段），线上以符号名传输
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    // === 客户端请求 ===
    /// 开始新对局
    NewGame,
    /// 开局布局（服务端回复）
    GameStarted,
    /// 提交马象换位
    SetupCompleted,
    /// 换位已确认
    SetupConfirmed,
    /// 查询对局状态
    GetGameStatus,
    /// 对局状态（服务端回复）
    GameStatus,
    /// 查询棋子可走位置
    GetPieceDestinations,
    /// 可走位置（服务端回复）
    PieceDestinations,
    /// 提交走棋
    MoveCompleted,
    /// 走棋已确认
    MoveConfirmed,
    /// 结束对局
    EndGame,
    /// 对局已结束
    GameOver,
    /// 无法处理时的默认回复
    Default,
}

impl Action {
    pub const ALL: [Action; 13] = [
        Action::NewGame,
        Action::GameStarted,
        Action::SetupCompleted,
        Action::SetupConfirmed,
        Action::GetGameStatus,
        Action::GameStatus,
        Action::GetPieceDestinations,
        Action::PieceDestinations,
        Action::MoveCompleted,
        Action::MoveConfirmed,
        Action::EndGame,
        Action::GameOver,
        Action::Default,
    ];

    /// 线上使用的符号名
    pub fn name(&self) -> &'static str {
        match self {
            Action::NewGame => "NEW_GAME",
            Action::GameStarted => "GAME_STARTED",
            Action::SetupCompleted => "SETUP_COMPLETED",
            Action::SetupConfirmed => "SETUP_CONFIRMED",
            Action::GetGameStatus => "GET_GAME_STATUS",
            Action::GameStatus => "GAME_STATUS",
            Action::GetPieceDestinations => "GET_PIECE_DESTINATIONS",
            Action::PieceDestinations => "PIECE_DESTINATIONS",
            Action::MoveCompleted => "MOVE_COMPLETED",
            Action::MoveConfirmed => "MOVE_CONFIRMED",
            Action::EndGame => "END_GAME",
            Action::GameOver => "GAME_OVER",
            Action::Default => "DEFAULT",
        }
    }

    /// 请求对应的服务端回复动作，非请求动作返回 None
    pub fn reply(&self) -> Option<Action> {
        match self {
            Action::NewGame => Some(Action::GameStarted),
            Action::SetupCompleted => Some(Action::SetupConfirmed),
            Action::GetGameStatus => Some(Action::GameStatus),
            Action::GetPieceDestinations => Some(Action::PieceDestinations),
            Action::MoveCompleted => Some(Action::MoveConfirmed),
            Action::EndGame => Some(Action::GameOver),
            _ => None,
        }
    }

    /// 是否为客户端发起的请求
    pub fn is_request(&self) -> bool {
        self.reply().is_some()
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    /// 严格解析：未知名称不会映射为 DEFAULT
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .iter()
            .find(|a| a.name() == s)
            .copied()
            .ok_or_else(|| format!("unknown action `{}`", s))
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 对局状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameState {
    /// 进行中
    #[default]
    Unfinished,
    /// 蓝方胜
    BlueWon,
    /// 红方胜
    RedWon,
}

impl LenientEnum for GameState {
    const VARIANTS: &'static [Self] =
        &[GameState::Unfinished, GameState::BlueWon, GameState::RedWon];

    fn name(&self) -> &'static str {
        match self {
            GameState::Unfinished => "UNFINISHED",
            GameState::BlueWon => "BLUE_WON",
            GameState::RedWon => "RED_WON",
        }
    }
}

/// 开局布局
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PieceSet {
    pub pieces: Vec<PieceSnapshot>,
}

/// 马象换位选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SetupChoice {
    #[serde(rename = "BlueLeftTransposed")]
    pub blue_left_swap: bool,
    #[serde(rename = "BlueRightTransposed")]
    pub blue_right_swap: bool,
    #[serde(rename = "RedLeftTransposed")]
    pub red_left_swap: bool,
    #[serde(rename = "RedRightTransposed")]
    pub red_right_swap: bool,
}

/// 对局状态报告，枚举字段保持原始字符串，由接收方宽松解析
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusReport {
    pub game_state: String,
    pub player_turn: String,
    pub is_checked: bool,
}

/// 可走位置集合（请求时 destinations 为空）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DestinationSet {
    pub source: Coordinate,
    #[serde(default)]
    pub destinations: Option<Vec<Coordinate>>,
}

/// 走棋指令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MoveOrder {
    pub source: Coordinate,
    pub destination: Coordinate,
}

/// 消息负载，由信封的 Action 决定具体变体
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    PieceSet(PieceSet),
    SetupChoice(SetupChoice),
    StatusReport(StatusReport),
    DestinationSet(DestinationSet),
    MoveOrder(MoveOrder),
}

/// 消息信封
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub action: Action,
    pub payload: Option<Payload>,
}

impl Message {
    pub fn new(action: Action, payload: Option<Payload>) -> Self {
        Self { action, payload }
    }

    /// 不带负载的消息
    pub fn bare(action: Action) -> Self {
        Self {
            action,
            payload: None,
        }
    }

    pub fn with_payload(action: Action, payload: Payload) -> Self {
        Self {
            action,
            payload: Some(payload),
        }
    }
}
