/// Property-based tests for hand evaluation using proptest
///
/// These tests check that hand comparison is a total order over randomly
/// generated hands and that the wheel ranks where it should.
use holdem_table::game::{
    entities::{Card, Suit},
    functional::{Rank, argmax, compare_hands, determine_winners, eval_five, evaluate_best_hand},
};
use proptest::prelude::*;
use std::{cmp::Ordering, collections::BTreeSet};

// Strategy to generate a valid card (values 2-14, aces are 14)
fn card_strategy() -> impl Strategy<Value = Card> {
    (2u8..=14, 0usize..4).prop_map(|(value, suit_idx)| Card(value, Suit::ALL[suit_idx]))
}

// Strategy to generate a vec of unique cards (no duplicates)
fn unique_cards_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<Card>> {
    prop::collection::vec(card_strategy(), min..=max).prop_filter("Cards must be unique", |cards| {
        let set: BTreeSet<_> = cards.iter().collect();
        set.len() == cards.len()
    })
}

fn five(cards: &[Card]) -> [Card; 5] {
    [cards[0], cards[1], cards[2], cards[3], cards[4]]
}

proptest! {
    #[test]
    fn test_compare_is_antisymmetric(
        a in unique_cards_strategy(5, 5),
        b in unique_cards_strategy(5, 5),
    ) {
        let (a, b) = (eval_five(&five(&a)), eval_five(&five(&b)));
        prop_assert_eq!(compare_hands(&a, &b), compare_hands(&b, &a).reverse());
    }

    #[test]
    fn test_compare_is_transitive(
        a in unique_cards_strategy(5, 5),
        b in unique_cards_strategy(5, 5),
        c in unique_cards_strategy(5, 5),
    ) {
        let mut hands = [eval_five(&five(&a)), eval_five(&five(&b)), eval_five(&five(&c))];
        hands.sort_by(compare_hands);
        prop_assert_ne!(compare_hands(&hands[0], &hands[1]), Ordering::Greater);
        prop_assert_ne!(compare_hands(&hands[1], &hands[2]), Ordering::Greater);
        prop_assert_ne!(compare_hands(&hands[0], &hands[2]), Ordering::Greater);
    }

    #[test]
    fn test_compare_agrees_with_derived_order(
        a in unique_cards_strategy(5, 5),
        b in unique_cards_strategy(5, 5),
    ) {
        let (a, b) = (eval_five(&five(&a)), eval_five(&five(&b)));
        prop_assert_eq!(compare_hands(&a, &b), a.cmp(&b));
    }

    #[test]
    fn test_best_hand_beats_every_subset(cards in unique_cards_strategy(7, 7)) {
        let best = evaluate_best_hand(&cards).unwrap();
        prop_assert_eq!(best.cards.len(), 5);
        for skip_a in 0..7 {
            for skip_b in (skip_a + 1)..7 {
                let subset: Vec<Card> = cards
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != skip_a && *i != skip_b)
                    .map(|(_, c)| *c)
                    .collect();
                let strength = eval_five(&five(&subset));
                prop_assert_ne!(compare_hands(&strength, &best.strength), Ordering::Greater);
            }
        }
    }

    #[test]
    fn test_best_hand_cards_come_from_input(cards in unique_cards_strategy(5, 7)) {
        let best = evaluate_best_hand(&cards).unwrap();
        prop_assert!(best.cards.iter().all(|c| cards.contains(c)));
    }

    #[test]
    fn test_evaluation_deterministic(cards in unique_cards_strategy(7, 7)) {
        let first = evaluate_best_hand(&cards).unwrap();
        let mut reversed = cards.clone();
        reversed.reverse();
        let second = evaluate_best_hand(&reversed).unwrap();
        prop_assert_eq!(first.strength, second.strength);
    }

    #[test]
    fn test_argmax_single_hand_returns_zero(cards in unique_cards_strategy(5, 5)) {
        prop_assert_eq!(argmax(&[eval_five(&five(&cards))]), vec![0]);
    }

    #[test]
    fn test_determine_winners_identical_hands_tie(cards in unique_cards_strategy(7, 7)) {
        let winners = determine_winners(&[cards.clone(), cards]).unwrap();
        prop_assert_eq!(winners, vec![0, 1]);
    }
}

#[test]
fn test_wheel_ranks_between_six_high_straight_and_trips() {
    use Suit::{Club, Diamond, Heart, Spade};

    let wheel = eval_five(&[
        Card(14, Club),
        Card(2, Diamond),
        Card(3, Heart),
        Card(4, Spade),
        Card(5, Club),
    ]);
    let six_high = eval_five(&[
        Card(2, Club),
        Card(3, Diamond),
        Card(4, Heart),
        Card(5, Spade),
        Card(6, Club),
    ]);
    let trips = eval_five(&[
        Card(14, Club),
        Card(14, Diamond),
        Card(14, Heart),
        Card(13, Spade),
        Card(12, Club),
    ]);

    assert_eq!(wheel.rank, Rank::Straight);
    assert_eq!(wheel.kickers, vec![5]);
    assert_eq!(compare_hands(&wheel, &six_high), Ordering::Less);
    assert_eq!(compare_hands(&wheel, &trips), Ordering::Greater);
}

#[test]
fn test_wrong_card_counts_rejected() {
    let four = [
        Card(2, Suit::Club),
        Card(3, Suit::Club),
        Card(4, Suit::Club),
        Card(5, Suit::Club),
    ];
    assert!(evaluate_best_hand(&four).is_err());
    assert!(determine_winners(&[four.to_vec()]).is_err());
}
