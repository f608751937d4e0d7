//! 游戏核心逻辑模块（状态、牌组、规则引擎）。

pub mod deck;
pub mod rules;
pub mod state;

pub use rules::{GameEngine, GameResolution, RuleError};
pub use state::{
    Card,
    CardId,
    CardView,
    GameEvent,
    GameSnapshot,
    GameState,
    GameStatus,
    ImageRef,
    IntegrityError,
    MATCH_POINTS,
    MAX_PAIRS,
    MIN_PAIRS,
};
