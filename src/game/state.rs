use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// 每局最少的图片（配对）数量。
pub const MIN_PAIRS: usize = 4;
/// 每局最多使用的图片数量，多余的会被截断。
pub const MAX_PAIRS: usize = 8;
/// 每次成功配对的得分。
pub const MATCH_POINTS: u32 = 10;
/// 同时翻开的卡牌上限。
pub const MAX_SELECTED: usize = 2;

/// 单局内唯一的卡牌标识。
pub type CardId = u32;
/// 图片引用（URL 或索引），对引擎来说是不透明的。
pub type ImageRef = String;

/// 游戏状态。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GameStatus {
    #[default]
    NotStarted,
    Active,
    Completed,
}

/// 棋盘上的一张卡牌。翻开/配对标记不存储，由状态推导。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub image_ref: ImageRef,
}

impl Card {
    pub fn new(id: CardId, image_ref: impl Into<ImageRef>) -> Self {
        Self {
            id,
            image_ref: image_ref.into(),
        }
    }
}

/// 游戏事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    GameStarted {
        pairs: usize,
    },
    CardRevealed {
        card_id: CardId,
    },
    PairMatched {
        first: CardId,
        second: CardId,
        score: u32,
    },
    PairMismatched {
        first: CardId,
        second: CardId,
    },
    SelectionCleared {
        card_ids: Vec<CardId>,
    },
    GameCompleted {
        score: u32,
        moves: u32,
        elapsed_seconds: u32,
    },
    GameReset,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    OddCardCount { count: usize },
    TooFewCards { count: usize },
    DuplicateCardId { card_id: CardId },
    UnpairedImage { image_ref: ImageRef, occurrences: usize },
    UnknownMatchedCard { card_id: CardId },
    UnknownSelectedCard { card_id: CardId },
    SelectedAlreadyMatched { card_id: CardId },
    SelectionOverflow { count: usize },
    CompletionMismatch { status: GameStatus, all_matched: bool },
}

/// 游戏整体状态，由引擎独占。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GameState {
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub selected: Vec<CardId>,
    #[serde(default)]
    pub matched_ids: BTreeSet<CardId>,
    pub score: u32,
    pub move_count: u32,
    pub elapsed_seconds: u32,
    pub status: GameStatus,
}

impl GameState {
    /// 以洗好的卡牌开始新的一局。
    pub fn new(cards: Vec<Card>) -> Self {
        Self {
            cards,
            status: GameStatus::Active,
            ..Self::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == GameStatus::Active
    }

    pub fn get_card(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn contains_card(&self, id: CardId) -> bool {
        self.get_card(id).is_some()
    }

    pub fn is_matched(&self, id: CardId) -> bool {
        self.matched_ids.contains(&id)
    }

    pub fn is_flipped(&self, id: CardId) -> bool {
        self.selected.contains(&id) || self.is_matched(id)
    }

    pub fn total_pairs(&self) -> usize {
        self.cards.len() / 2
    }

    pub fn pairs_matched(&self) -> usize {
        self.matched_ids.len() / 2
    }

    pub fn all_matched(&self) -> bool {
        !self.cards.is_empty() && self.matched_ids.len() == self.cards.len()
    }

    /// 当前翻开的两张卡牌（评估前，或未配对等待 `clear_selection`）。
    pub fn selected_pair(&self) -> Option<(CardId, CardId)> {
        match self.selected.as_slice() {
            [first, second] => Some((*first, *second)),
            _ => None,
        }
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let all_matched = self.all_matched();
        if (self.status == GameStatus::Completed) != all_matched {
            return Err(IntegrityError::CompletionMismatch {
                status: self.status,
                all_matched,
            });
        }

        if self.status == GameStatus::NotStarted {
            return Ok(());
        }

        let count = self.cards.len();
        if count % 2 != 0 {
            return Err(IntegrityError::OddCardCount { count });
        }
        if count < MIN_PAIRS * 2 {
            return Err(IntegrityError::TooFewCards { count });
        }

        let mut ids = HashSet::new();
        let mut occurrences: HashMap<&str, usize> = HashMap::new();
        for card in &self.cards {
            if !ids.insert(card.id) {
                return Err(IntegrityError::DuplicateCardId { card_id: card.id });
            }
            *occurrences.entry(card.image_ref.as_str()).or_default() += 1;
        }
        if let Some((image_ref, count)) = occurrences.iter().find(|(_, n)| **n != 2) {
            return Err(IntegrityError::UnpairedImage {
                image_ref: (*image_ref).to_owned(),
                occurrences: *count,
            });
        }

        if let Some(card_id) = self.matched_ids.iter().find(|id| !ids.contains(*id)) {
            return Err(IntegrityError::UnknownMatchedCard { card_id: *card_id });
        }

        if self.selected.len() > MAX_SELECTED {
            return Err(IntegrityError::SelectionOverflow {
                count: self.selected.len(),
            });
        }
        for card_id in &self.selected {
            if !ids.contains(card_id) {
                return Err(IntegrityError::UnknownSelectedCard { card_id: *card_id });
            }
            if self.matched_ids.contains(card_id) {
                return Err(IntegrityError::SelectedAlreadyMatched { card_id: *card_id });
            }
        }

        Ok(())
    }

    /// 按顺序排列的示例棋盘（未洗牌），便于前端调试和测试。
    pub fn sample() -> Self {
        let cards = ["a", "b", "c", "d"]
            .iter()
            .chain(["a", "b", "c", "d"].iter())
            .enumerate()
            .map(|(index, image)| Card::new(index as CardId, *image))
            .collect();
        Self::new(cards)
    }
}

/// 渲染用的卡牌视图，附带推导出的翻开/配对标记。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardView {
    pub id: CardId,
    pub image_ref: ImageRef,
    pub is_flipped: bool,
    pub is_matched: bool,
}

/// 只读快照，供表现层渲染。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSnapshot {
    pub cards: Vec<CardView>,
    pub selected: Vec<CardId>,
    pub matched_ids: Vec<CardId>,
    pub score: u32,
    pub move_count: u32,
    pub elapsed_seconds: u32,
    pub status: GameStatus,
    pub pairs_matched: usize,
    pub total_pairs: usize,
}

impl From<&GameState> for GameSnapshot {
    fn from(state: &GameState) -> Self {
        let cards = state
            .cards
            .iter()
            .map(|card| CardView {
                id: card.id,
                image_ref: card.image_ref.clone(),
                is_flipped: state.is_flipped(card.id),
                is_matched: state.is_matched(card.id),
            })
            .collect();

        Self {
            cards,
            selected: state.selected.clone(),
            matched_ids: state.matched_ids.iter().copied().collect(),
            score: state.score,
            move_count: state.move_count,
            elapsed_seconds: state.elapsed_seconds,
            status: state.status,
            pairs_matched: state.pairs_matched(),
            total_pairs: state.total_pairs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_state_passes_integrity_check() {
        let state = GameState::sample();
        assert_eq!(state.cards.len(), 8);
        assert!(state.integrity_check().is_ok());
    }

    #[test]
    fn default_state_is_not_started_and_valid() {
        let state = GameState::default();
        assert_eq!(state.status, GameStatus::NotStarted);
        assert!(state.integrity_check().is_ok());
    }

    #[test]
    fn integrity_check_rejects_selected_matched_overlap() {
        let mut state = GameState::sample();
        state.matched_ids.extend([0, 4]);
        state.selected.push(4);

        assert_eq!(
            state.integrity_check(),
            Err(IntegrityError::SelectedAlreadyMatched { card_id: 4 })
        );
    }

    #[test]
    fn integrity_check_rejects_unpaired_image() {
        let mut state = GameState::sample();
        state.cards[7].image_ref = "a".into();

        assert!(matches!(
            state.integrity_check(),
            Err(IntegrityError::UnpairedImage { .. })
        ));
    }

    #[test]
    fn integrity_check_rejects_completed_without_all_matches() {
        let mut state = GameState::sample();
        state.status = GameStatus::Completed;

        assert_eq!(
            state.integrity_check(),
            Err(IntegrityError::CompletionMismatch {
                status: GameStatus::Completed,
                all_matched: false,
            })
        );
    }

    #[test]
    fn snapshot_derives_flip_flags_from_selection_and_matches() {
        let mut state = GameState::sample();
        state.matched_ids.extend([1, 5]);
        state.selected.push(2);

        let snapshot = GameSnapshot::from(&state);
        let view = |id: CardId| {
            snapshot
                .cards
                .iter()
                .find(|card| card.id == id)
                .expect("card should be in snapshot")
        };

        assert!(view(1).is_flipped && view(1).is_matched);
        assert!(view(2).is_flipped && !view(2).is_matched);
        assert!(!view(3).is_flipped && !view(3).is_matched);
        assert_eq!(snapshot.pairs_matched, 1);
        assert_eq!(snapshot.total_pairs, 4);
    }
}
