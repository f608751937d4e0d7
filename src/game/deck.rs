//! 牌组构建：每张图片生成两张卡牌，然后均匀洗牌。

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use super::rules::RuleError;
use super::state::{Card, CardId, ImageRef, MAX_PAIRS, MIN_PAIRS};

/// 去掉重复图片（保留首次出现的顺序），校验数量，并截取前 `MAX_PAIRS` 张。
pub fn select_images(images: &[ImageRef]) -> Result<Vec<ImageRef>, RuleError> {
    let mut seen = HashSet::new();
    let mut unique: Vec<ImageRef> = images
        .iter()
        .filter(|image| seen.insert(image.as_str()))
        .cloned()
        .collect();

    if unique.len() < MIN_PAIRS {
        return Err(RuleError::InsufficientImages {
            required: MIN_PAIRS,
            provided: unique.len(),
        });
    }
    unique.truncate(MAX_PAIRS);
    Ok(unique)
}

/// 按顺序生成两份图片对应的卡牌，id 从 0 递增。
pub fn build_pairs(images: &[ImageRef]) -> Vec<Card> {
    images
        .iter()
        .chain(images.iter())
        .enumerate()
        .map(|(index, image)| Card::new(index as CardId, image.clone()))
        .collect()
}

/// Fisher-Yates 洗牌，每种排列概率相同。
pub fn shuffle_cards<R: Rng + ?Sized>(cards: &mut [Card], rng: &mut R) {
    cards.shuffle(rng);
}

pub fn build_deck<R: Rng + ?Sized>(
    images: &[ImageRef],
    rng: &mut R,
) -> Result<Vec<Card>, RuleError> {
    let images = select_images(images)?;
    let mut cards = build_pairs(&images);
    shuffle_cards(&mut cards, rng);
    Ok(cards)
}
