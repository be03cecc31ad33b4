//! Hand evaluation: best five of five to seven cards, comparison, and
//! winner selection.

use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};
use thiserror::Error;

use super::entities::{Card, MAX_VALUE, MIN_VALUE, Value};

/// Hand categories, weakest first so the derived ordering ranks them.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::HighCard => "High Card",
            Self::OnePair => "One Pair",
            Self::TwoPair => "Two Pair",
            Self::ThreeOfAKind => "Three of a Kind",
            Self::Straight => "Straight",
            Self::Flush => "Flush",
            Self::FullHouse => "Full House",
            Self::FourOfAKind => "Four of a Kind",
            Self::StraightFlush => "Straight Flush",
        };
        write!(f, "{repr}")
    }
}

/// Category plus tie-break values. The derived ordering is the hand
/// ordering: category first, then kickers element-wise.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct HandStrength {
    pub rank: Rank,
    pub kickers: Vec<Value>,
}

impl HandStrength {
    /// Display name. An ace-high straight flush is reported as a royal
    /// flush but ranks like any other straight flush.
    #[must_use]
    pub fn name(&self) -> String {
        if self.rank == Rank::StraightFlush && self.kickers.first() == Some(&MAX_VALUE) {
            "Royal Flush".to_string()
        } else {
            self.rank.to_string()
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BestHand {
    pub strength: HandStrength,
    /// The five cards making the hand, strongest first.
    pub cards: Vec<Card>,
}

impl BestHand {
    #[must_use]
    pub fn name(&self) -> String {
        self.strength.name()
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum EvalError {
    #[error("need 5 to 7 cards, got {0}")]
    CardCount(usize),
    #[error("card value {0} is out of range")]
    InvalidValue(Value),
}

/// Score exactly five cards.
#[must_use]
pub fn eval_five(cards: &[Card; 5]) -> HandStrength {
    let mut values: Vec<Value> = cards.iter().map(Card::value).collect();
    values.sort_unstable_by(|a, b| b.cmp(a));

    let is_flush = cards.iter().all(|c| c.suit() == cards[0].suit());

    let distinct = {
        let mut v = values.clone();
        v.dedup();
        v.len() == 5
    };
    let straight_high = if distinct && values[0] - values[4] == 4 {
        Some(values[0])
    } else if values == [14, 5, 4, 3, 2] {
        // The wheel plays the ace low.
        Some(5)
    } else {
        None
    };

    let mut counts = [0u8; Value::MAX as usize + 1];
    for &v in &values {
        counts[v as usize] += 1;
    }
    // (count, value) groups, largest group first, then highest value.
    let mut groups: Vec<(u8, Value)> = counts
        .iter()
        .enumerate()
        .filter(|&(_, &n)| n > 0)
        .map(|(v, &n)| (n, v as Value))
        .collect();
    groups.sort_unstable_by(|a, b| b.cmp(a));
    let grouped: Vec<Value> = groups.iter().map(|&(_, v)| v).collect();

    let (rank, kickers) = match (straight_high, is_flush, groups[0].0, groups.get(1).map(|g| g.0)) {
        (Some(high), true, _, _) => (Rank::StraightFlush, vec![high]),
        (_, _, 4, _) => (Rank::FourOfAKind, grouped),
        (_, _, 3, Some(2)) => (Rank::FullHouse, grouped),
        (_, true, _, _) => (Rank::Flush, values),
        (Some(high), false, _, _) => (Rank::Straight, vec![high]),
        (_, _, 3, _) => (Rank::ThreeOfAKind, grouped),
        (_, _, 2, Some(2)) => (Rank::TwoPair, grouped),
        (_, _, 2, _) => (Rank::OnePair, grouped),
        _ => (Rank::HighCard, values),
    };
    HandStrength { rank, kickers }
}

/// Order five cards for display: by group then value, with the wheel's
/// ace moved to the end.
fn arrange(cards: &[Card; 5], strength: &HandStrength) -> Vec<Card> {
    let mut arranged = cards.to_vec();
    let count = |v: Value| cards.iter().filter(|c| c.value() == v).count();
    arranged.sort_by(|a, b| {
        count(b.value())
            .cmp(&count(a.value()))
            .then(b.value().cmp(&a.value()))
            .then(a.suit().cmp(&b.suit()))
    });
    if matches!(strength.rank, Rank::Straight | Rank::StraightFlush) && strength.kickers == [5] {
        arranged.rotate_left(1);
    }
    arranged
}

/// Find the best five-card hand among 5 to 7 cards by scoring every
/// five-card subset.
pub fn evaluate_best_hand(cards: &[Card]) -> Result<BestHand, EvalError> {
    let n = cards.len();
    if !(5..=7).contains(&n) {
        return Err(EvalError::CardCount(n));
    }
    if let Some(card) = cards
        .iter()
        .find(|c| !(MIN_VALUE..=MAX_VALUE).contains(&c.value()))
    {
        return Err(EvalError::InvalidValue(card.value()));
    }

    let mut best: Option<(HandStrength, [Card; 5])> = None;
    for mask in 0u32..(1 << n) {
        if mask.count_ones() != 5 {
            continue;
        }
        let mut combo = [cards[0]; 5];
        let mut k = 0;
        for (i, card) in cards.iter().enumerate() {
            if mask & (1 << i) != 0 {
                combo[k] = *card;
                k += 1;
            }
        }
        let strength = eval_five(&combo);
        if best.as_ref().is_none_or(|(b, _)| strength > *b) {
            best = Some((strength, combo));
        }
    }

    // The loop always visits at least one mask with five bits set.
    let (strength, combo) = best.ok_or(EvalError::CardCount(n))?;
    let cards = arrange(&combo, &strength);
    Ok(BestHand { strength, cards })
}

/// Lexicographic comparison: category, then kickers element-wise.
#[must_use]
pub fn compare_hands(a: &HandStrength, b: &HandStrength) -> Ordering {
    a.rank.cmp(&b.rank).then_with(|| {
        a.kickers
            .iter()
            .zip(&b.kickers)
            .map(|(x, y)| x.cmp(y))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    })
}

/// Indices of the strongest hands, ascending. Ties return every index
/// that matches the maximum.
#[must_use]
pub fn argmax(hands: &[HandStrength]) -> Vec<usize> {
    let Some(max) = hands.iter().max_by(|a, b| compare_hands(a, b)) else {
        return Vec::new();
    };
    hands
        .iter()
        .enumerate()
        .filter(|(_, h)| compare_hands(h, max).is_eq())
        .map(|(i, _)| i)
        .collect()
}

/// Evaluate every entry's cards and return the indices whose best hand
/// ties the maximum, in input order.
pub fn determine_winners(entries: &[Vec<Card>]) -> Result<Vec<usize>, EvalError> {
    let strengths = entries
        .iter()
        .map(|cards| evaluate_best_hand(cards).map(|best| best.strength))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(argmax(&strengths))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Suit::{Club, Diamond, Heart, Spade};

    fn five(cards: [Card; 5]) -> HandStrength {
        eval_five(&cards)
    }

    #[test]
    fn test_royal_flush_name() {
        let best = evaluate_best_hand(&[
            Card(10, Spade),
            Card(11, Spade),
            Card(12, Spade),
            Card(13, Spade),
            Card(14, Spade),
        ])
        .unwrap();
        assert_eq!(best.strength.rank, Rank::StraightFlush);
        assert_eq!(best.strength.kickers, vec![14]);
        assert_eq!(best.name(), "Royal Flush");
    }

    #[test]
    fn test_wheel_is_five_high_straight() {
        let wheel = five([
            Card(14, Heart),
            Card(2, Club),
            Card(3, Diamond),
            Card(4, Spade),
            Card(5, Heart),
        ]);
        assert_eq!(wheel.rank, Rank::Straight);
        assert_eq!(wheel.kickers, vec![5]);

        let six_high = five([
            Card(2, Club),
            Card(3, Diamond),
            Card(4, Spade),
            Card(5, Heart),
            Card(6, Heart),
        ]);
        assert_eq!(compare_hands(&wheel, &six_high), Ordering::Less);
    }

    #[test]
    fn test_wheel_cards_put_ace_last() {
        let best = evaluate_best_hand(&[
            Card(14, Heart),
            Card(2, Club),
            Card(3, Diamond),
            Card(4, Spade),
            Card(5, Heart),
        ])
        .unwrap();
        assert_eq!(best.cards.first(), Some(&Card(5, Heart)));
        assert_eq!(best.cards.last(), Some(&Card(14, Heart)));
    }

    #[test]
    fn test_ace_king_queen_jack_nine_is_not_straight() {
        let hand = five([
            Card(14, Heart),
            Card(13, Club),
            Card(12, Diamond),
            Card(11, Spade),
            Card(9, Heart),
        ]);
        assert_eq!(hand.rank, Rank::HighCard);
    }

    #[test]
    fn test_full_house_kickers() {
        let hand = five([
            Card(4, Heart),
            Card(4, Club),
            Card(9, Diamond),
            Card(9, Spade),
            Card(9, Heart),
        ]);
        assert_eq!(hand.rank, Rank::FullHouse);
        assert_eq!(hand.kickers, vec![9, 4]);
    }

    #[test]
    fn test_two_pair_kickers() {
        let hand = five([
            Card(4, Heart),
            Card(4, Club),
            Card(13, Diamond),
            Card(9, Spade),
            Card(9, Heart),
        ]);
        assert_eq!(hand.rank, Rank::TwoPair);
        assert_eq!(hand.kickers, vec![9, 4, 13]);
    }

    #[test]
    fn test_one_pair_kickers() {
        let hand = five([
            Card(2, Heart),
            Card(7, Club),
            Card(13, Diamond),
            Card(9, Spade),
            Card(7, Heart),
        ]);
        assert_eq!(hand.rank, Rank::OnePair);
        assert_eq!(hand.kickers, vec![7, 13, 9, 2]);
    }

    #[test]
    fn test_category_order() {
        let quads = five([
            Card(3, Heart),
            Card(3, Club),
            Card(3, Diamond),
            Card(3, Spade),
            Card(2, Heart),
        ]);
        let flush = five([
            Card(2, Club),
            Card(7, Club),
            Card(9, Club),
            Card(11, Club),
            Card(14, Club),
        ]);
        let straight = five([
            Card(10, Heart),
            Card(11, Club),
            Card(12, Diamond),
            Card(13, Spade),
            Card(14, Heart),
        ]);
        assert!(quads > flush);
        assert!(flush > straight);
    }

    #[test]
    fn test_best_of_seven_picks_flush_over_pair() {
        let best = evaluate_best_hand(&[
            Card(2, Heart),
            Card(2, Spade),
            Card(5, Heart),
            Card(9, Heart),
            Card(11, Heart),
            Card(13, Heart),
            Card(3, Club),
        ])
        .unwrap();
        assert_eq!(best.strength.rank, Rank::Flush);
        assert_eq!(best.strength.kickers, vec![13, 11, 9, 5, 2]);
        assert_eq!(best.cards.len(), 5);
    }

    #[test]
    fn test_best_of_seven_prefers_higher_straight() {
        let best = evaluate_best_hand(&[
            Card(14, Heart),
            Card(2, Spade),
            Card(3, Heart),
            Card(4, Diamond),
            Card(5, Club),
            Card(6, Heart),
            Card(13, Club),
        ])
        .unwrap();
        assert_eq!(best.strength.rank, Rank::Straight);
        assert_eq!(best.strength.kickers, vec![6]);
    }

    #[test]
    fn test_wrong_card_count() {
        assert_eq!(
            evaluate_best_hand(&[Card(2, Heart); 4]),
            Err(EvalError::CardCount(4))
        );
        assert_eq!(
            evaluate_best_hand(&[Card(2, Heart); 8]),
            Err(EvalError::CardCount(8))
        );
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let mut cards = vec![
            Card(2, Heart),
            Card(5, Club),
            Card(9, Spade),
            Card(11, Diamond),
            Card(13, Heart),
        ];
        cards.push(Card(15, Spade));
        assert_eq!(evaluate_best_hand(&cards), Err(EvalError::InvalidValue(15)));
        cards[5] = Card(0, Spade);
        assert_eq!(evaluate_best_hand(&cards), Err(EvalError::InvalidValue(0)));
        assert_eq!(
            determine_winners(&[cards]),
            Err(EvalError::InvalidValue(0))
        );

        // Scoring five raw cards never indexes out of bounds.
        let strength = eval_five(&[
            Card(200, Spade),
            Card(200, Heart),
            Card(3, Club),
            Card(4, Club),
            Card(5, Club),
        ]);
        assert_eq!(strength.rank, Rank::OnePair);
    }

    #[test]
    fn test_determine_winners_split() {
        let board = [
            Card(10, Heart),
            Card(11, Club),
            Card(12, Diamond),
            Card(13, Spade),
            Card(14, Heart),
        ];
        let with = |a: Card, b: Card| {
            let mut cards = board.to_vec();
            cards.push(a);
            cards.push(b);
            cards
        };
        let winners = determine_winners(&[
            with(Card(2, Club), Card(3, Club)),
            with(Card(2, Diamond), Card(3, Diamond)),
            with(Card(4, Club), Card(4, Diamond)),
        ])
        .unwrap();
        assert_eq!(winners, vec![0, 1, 2]);
    }

    #[test]
    fn test_argmax_empty() {
        assert!(argmax(&[]).is_empty());
    }
}
