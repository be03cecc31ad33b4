//! Side pot calculation tests using property-based testing
//!
//! These tests verify that side pot layering works correctly in all scenarios:
//! - Multiple all-ins at different amounts
//! - Folded players contribute but can't win
//! - Correct distribution of remainder chips
//! - No chips created or lost for any set of commitments

use holdem_table::game::{
    entities::{Chips, SeatIndex},
    pot::{Pot, SidePot, Uncalled, split},
};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn pot_of(entries: &[(SeatIndex, Chips)]) -> Pot {
    let mut pot = Pot::default();
    for &(seat, amount) in entries {
        pot.bet(seat, amount);
    }
    pot
}

#[test]
fn test_all_ins_at_100_300_500() {
    // Three players all-in for 100, 300 and 500; nobody folded.
    let pot = pot_of(&[(0, 100), (1, 300), (2, 500)]);
    let live = BTreeSet::from([0, 1, 2]);
    let layers = pot.layers(&live, |_| true);

    assert_eq!(
        layers.pots,
        vec![
            SidePot {
                amount: 300,
                eligible: vec![0, 1, 2]
            },
            SidePot {
                amount: 400,
                eligible: vec![1, 2]
            },
        ]
    );
    // The last 200 was never matched and goes back.
    assert_eq!(
        layers.uncalled,
        Some(Uncalled {
            seat: 2,
            amount: 200
        })
    );

    // The short stack can win at most the first layer.
    let reachable: Chips = layers
        .pots
        .iter()
        .filter(|p| p.eligible.contains(&0))
        .map(|p| p.amount)
        .sum();
    assert_eq!(reachable, 300);
}

#[test]
fn test_multiple_side_pots_four_players() {
    // Player 0: all-in 25, player 1: all-in 75, players 2 and 3: 150 each.
    let pot = pot_of(&[(0, 25), (1, 75), (2, 150), (3, 150)]);
    let live = BTreeSet::from([0, 1, 2, 3]);
    let layers = pot.layers(&live, |_| true);

    let amounts: Vec<Chips> = layers.pots.iter().map(|p| p.amount).collect();
    assert_eq!(amounts, vec![100, 150, 150]);
    assert_eq!(layers.pots[2].eligible, vec![2, 3]);
    assert_eq!(layers.uncalled, None);
    assert_eq!(layers.total(), 400);
}

#[test]
fn test_folded_player_contributes_but_cannot_win() {
    // Player 1 called 100 and then folded.
    let pot = pot_of(&[(0, 200), (1, 100), (2, 200)]);
    let live = BTreeSet::from([0, 2]);
    let layers = pot.layers(&live, |_| true);

    assert!(layers.pots.iter().all(|p| !p.eligible.contains(&1)));
    assert_eq!(layers.total(), 500);
}

#[test]
fn test_remainder_goes_to_first_winner() {
    assert_eq!(split(301, &[1, 2]), vec![(1, 151), (2, 150)]);
    assert_eq!(split(100, &[0, 3, 5]), vec![(0, 34), (3, 33), (5, 33)]);
}

fn investments_strategy() -> impl Strategy<Value = Vec<(SeatIndex, Chips)>> {
    prop::collection::btree_map(0usize..7, 1u32..=2000, 2..=7)
        .prop_map(|m| m.into_iter().collect())
}

proptest! {
    #[test]
    fn test_layers_conserve_chips(
        investments in investments_strategy(),
        live_mask in 1u8..=127,
    ) {
        let pot = pot_of(&investments);
        let mut live: BTreeSet<SeatIndex> = investments
            .iter()
            .map(|(seat, _)| *seat)
            .filter(|seat| live_mask & (1 << seat) != 0)
            .collect();
        if live.is_empty() {
            live.insert(investments[0].0);
        }

        let layers = pot.layers(&live, |_| true);
        prop_assert_eq!(layers.total(), pot.size());
        for side in &layers.pots {
            prop_assert!(!side.eligible.is_empty());
            prop_assert!(side.eligible.iter().all(|seat| live.contains(seat)));
        }
    }

    #[test]
    fn test_uncalled_belongs_to_sole_top_contributor(investments in investments_strategy()) {
        let pot = pot_of(&investments);
        let live: BTreeSet<SeatIndex> = investments.iter().map(|(seat, _)| *seat).collect();
        let layers = pot.layers(&live, |_| true);

        let top = investments.iter().map(|(_, amount)| *amount).max().unwrap_or(0);
        let at_top: Vec<SeatIndex> = investments
            .iter()
            .filter(|(_, amount)| *amount == top)
            .map(|(seat, _)| *seat)
            .collect();
        match layers.uncalled {
            Some(uncalled) => {
                prop_assert_eq!(at_top, vec![uncalled.seat]);
                let second = investments
                    .iter()
                    .map(|(_, amount)| *amount)
                    .filter(|amount| *amount < top)
                    .max()
                    .unwrap_or(0);
                prop_assert_eq!(uncalled.amount, top - second);
            }
            None => prop_assert!(at_top.len() > 1),
        }
    }

    #[test]
    fn test_split_conserves_amount(amount in 0u32..100_000, winners in 1usize..=7) {
        let seats: Vec<SeatIndex> = (0..winners).collect();
        let shares = split(amount, &seats);
        prop_assert_eq!(shares.iter().map(|(_, share)| *share).sum::<Chips>(), amount);
        let max = shares.iter().map(|(_, s)| *s).max().unwrap_or(0);
        let min = shares.iter().map(|(_, s)| *s).min().unwrap_or(0);
        prop_assert!(max - min < winners as Chips);
    }
}
