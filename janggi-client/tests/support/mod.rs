//! 集成测试公共工具

#![allow(dead_code)]

use std::time::{Duration, Instant};

use janggi_protocol::{Category, Color, Coordinate, PieceSnapshot};
use tracing_subscriber::EnvFilter;

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// 标准开局布局，共 32 子（红方在 0-3 行，蓝方在 6-9 行）
pub fn standard_layout() -> Vec<PieceSnapshot> {
    let mut pieces = Vec::with_capacity(32);
    for (color, home, forward) in [(Color::Red, 0, 1), (Color::Blue, 9, -1)] {
        let back_rank = [
            (0, Category::Chariot),
            (1, Category::Horse),
            (2, Category::Elephant),
            (3, Category::Guard),
            (5, Category::Guard),
            (6, Category::Elephant),
            (7, Category::Horse),
            (8, Category::Chariot),
        ];
        for (x, category) in back_rank {
            pieces.push(PieceSnapshot::new(Coordinate::new(x, home), color, category));
        }
        pieces.push(PieceSnapshot::new(
            Coordinate::new(4, home + forward),
            color,
            Category::General,
        ));
        for x in [1, 7] {
            pieces.push(PieceSnapshot::new(
                Coordinate::new(x, home + 2 * forward),
                color,
                Category::Cannon,
            ));
        }
        for x in [0, 2, 4, 6, 8] {
            pieces.push(PieceSnapshot::new(
                Coordinate::new(x, home + 3 * forward),
                color,
                Category::Soldier,
            ));
        }
    }
    pieces
}

/// 在限定时间内轮询直到条件成立
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
