//! 棋子与坐标定义

use serde::{Deserialize, Serialize};

use crate::constants::BOARD_ROWS;

/// 按名称宽松解析的枚举
///
/// 负载中的枚举字段来自服务端的字符串，无法识别时不应让整条消息失败，
/// 由调用方决定回退到零值还是保留旧值。
pub trait LenientEnum: Sized + Copy + 'static {
    /// 按序号排列的全部取值，第一个为零值
    const VARIANTS: &'static [Self];

    /// 线上使用的符号名
    fn name(&self) -> &'static str;

    /// 接受精确的符号名或范围内的序号，否则返回 None
    fn parse_lenient(token: &str) -> Option<Self> {
        let token = token.trim();
        if let Some(found) = Self::VARIANTS.iter().find(|v| v.name() == token) {
            return Some(*found);
        }
        token
            .parse::<usize>()
            .ok()
            .and_then(|index| Self::VARIANTS.get(index).copied())
    }

    /// 解析失败时回退到零值
    fn parse_or_zero(token: &str) -> Self {
        Self::parse_lenient(token).unwrap_or(Self::VARIANTS[0])
    }
}

/// 阵营
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    /// 楚（蓝方）
    #[default]
    Blue,
    /// 漢（红方）
    Red,
}

impl LenientEnum for Color {
    const VARIANTS: &'static [Self] = &[Color::Blue, Color::Red];

    fn name(&self) -> &'static str {
        match self {
            Color::Blue => "BLUE",
            Color::Red => "RED",
        }
    }
}

/// 棋子类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// 将
    #[default]
    General,
    /// 士
    Guard,
    /// 马
    Horse,
    /// 象
    Elephant,
    /// 车
    Chariot,
    /// 包
    Cannon,
    /// 卒/兵
    Soldier,
}

impl LenientEnum for Category {
    const VARIANTS: &'static [Self] = &[
        Category::General,
        Category::Guard,
        Category::Horse,
        Category::Elephant,
        Category::Chariot,
        Category::Cannon,
        Category::Soldier,
    ];

    fn name(&self) -> &'static str {
        match self {
            Category::General => "GENERAL",
            Category::Guard => "GUARD",
            Category::Horse => "HORSE",
            Category::Elephant => "ELEPHANT",
            Category::Chariot => "CHARIOT",
            Category::Cannon => "CANNON",
            Category::Soldier => "SOLDIER",
        }
    }
}

/// 棋盘坐标（0 起始），线上格式为 `[x, y]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Coordinate {
    /// 列
    pub x: i32,
    /// 行
    pub y: i32,
}

impl Coordinate {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// 转换为线上行序（行翻转）
    pub fn to_wire(self) -> Self {
        Self {
            x: self.x,
            y: BOARD_ROWS - 1 - self.y,
        }
    }

    /// 从线上行序还原，行翻转是自身的逆
    pub fn from_wire(self) -> Self {
        self.to_wire()
    }
}

impl From<[i32; 2]> for Coordinate {
    fn from([x, y]: [i32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Coordinate> for [i32; 2] {
    fn from(c: Coordinate) -> Self {
        [c.x, c.y]
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// 棋子快照（服务端开局布局中的一项）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PieceSnapshot {
    pub position: Coordinate,
    pub color: Color,
    pub category: Category,
}

impl PieceSnapshot {
    pub fn new(position: Coordinate, color: Color, category: Category) -> Self {
        Self {
            position,
            color,
            category,
        }
    }
}
