use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    deck,
    state::{
        CardId, GameEvent, GameSnapshot, GameState, GameStatus, ImageRef, IntegrityError,
        MATCH_POINTS, MAX_SELECTED,
    },
};
use crate::utils;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    InsufficientImages { required: usize, provided: usize },
    IntegrityViolation { error: IntegrityError },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::InsufficientImages { required, provided } => write!(
                f,
                "Please upload at least {required} images (got {provided})"
            ),
            RuleError::IntegrityViolation { error } => {
                write!(f, "game state integrity violated: {error:?}")
            }
        }
    }
}

impl std::error::Error for RuleError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResolution {
    pub snapshot: GameSnapshot,
    pub events: Vec<GameEvent>,
}

impl GameResolution {
    pub fn new(state: &GameState, events: Vec<GameEvent>) -> Self {
        Self {
            snapshot: GameSnapshot::from(state),
            events,
        }
    }
}

/// 记忆翻牌的规则引擎。所有操作同步执行，非法调用一律忽略。
pub struct GameEngine {
    state: GameState,
    rng: SmallRng,
    epoch: u64,
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEngine {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// 固定种子，洗牌结果可复现。
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            state: GameState::default(),
            rng,
            epoch: 0,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn status(&self) -> GameStatus {
        self.state.status
    }

    /// 每次开局或重置都会递增，用于识别过期的延迟回调。
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::from(&self.state)
    }

    pub fn ensure_integrity(&self) -> Result<(), RuleError> {
        self.state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }

    /// 开始新的一局。图片不足时返回错误，当前状态保持不变。
    pub fn start(&mut self, images: &[ImageRef]) -> Result<Vec<GameEvent>, RuleError> {
        let cards = match deck::build_deck(images, &mut self.rng) {
            Ok(cards) => cards,
            Err(error) => {
                utils::warn(&format!("start rejected: {error}"));
                return Err(error);
            }
        };

        let pairs = cards.len() / 2;
        self.state = GameState::new(cards);
        self.epoch += 1;
        utils::log(&format!("game started with {pairs} pairs"));

        Ok(vec![GameEvent::GameStarted { pairs }])
    }

    pub fn select_card(&mut self, card_id: CardId) -> Vec<GameEvent> {
        let state = &mut self.state;
        if !state.is_active()
            || !state.contains_card(card_id)
            || state.is_matched(card_id)
            || state.selected.len() >= MAX_SELECTED
            || state.selected.contains(&card_id)
        {
            return Vec::new();
        }

        state.selected.push(card_id);
        let mut events = vec![GameEvent::CardRevealed { card_id }];

        if let Some((first, second)) = state.selected_pair() {
            events.extend(self.evaluate_pair(first, second));
        }

        events
    }

    fn evaluate_pair(&mut self, first: CardId, second: CardId) -> Vec<GameEvent> {
        let state = &mut self.state;
        state.move_count += 1;

        let same_image = match (state.get_card(first), state.get_card(second)) {
            (Some(a), Some(b)) => a.image_ref == b.image_ref,
            _ => false,
        };

        if !same_image {
            return vec![GameEvent::PairMismatched { first, second }];
        }

        state.selected.clear();
        state.matched_ids.insert(first);
        state.matched_ids.insert(second);
        state.score += MATCH_POINTS;

        let mut events = vec![GameEvent::PairMatched {
            first,
            second,
            score: state.score,
        }];

        if state.all_matched() {
            state.status = GameStatus::Completed;
            utils::log(&format!(
                "game completed: score {} in {} moves, {}",
                state.score,
                state.move_count,
                utils::format_time(state.elapsed_seconds)
            ));
            events.push(GameEvent::GameCompleted {
                score: state.score,
                moves: state.move_count,
                elapsed_seconds: state.elapsed_seconds,
            });
        }

        events
    }

    /// 翻回未配对的两张牌。只有处于待清除状态时才生效，可重复调用。
    pub fn clear_selection(&mut self) -> Vec<GameEvent> {
        if !self.state.is_active() || self.state.selected_pair().is_none() {
            return Vec::new();
        }
        let card_ids = std::mem::take(&mut self.state.selected);
        vec![GameEvent::SelectionCleared { card_ids }]
    }

    /// 仅当翻开的仍是 `pair` 时才清除，避免过期的延迟回调翻回新的一组牌。
    pub fn clear_selection_if(&mut self, pair: (CardId, CardId)) -> Vec<GameEvent> {
        if self.state.selected_pair() != Some(pair) {
            return Vec::new();
        }
        self.clear_selection()
    }

    pub fn tick(&mut self) -> bool {
        if !self.state.is_active() {
            return false;
        }
        self.state.elapsed_seconds += 1;
        true
    }

    pub fn reset(&mut self) -> Vec<GameEvent> {
        self.epoch += 1;
        if self.state == GameState::default() {
            return Vec::new();
        }
        self.state = GameState::default();
        vec![GameEvent::GameReset]
    }
}
