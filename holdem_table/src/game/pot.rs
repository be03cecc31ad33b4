//! Chip commitments for a hand and their split into side pots.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::entities::{Chips, SeatIndex};

#[derive(Clone, Debug, Default)]
pub struct Pot {
    // Map seat indices to everything they've put in this hand. Entries
    // outlive the player: a seat that leaves mid-hand keeps its chips in.
    pub investments: BTreeMap<SeatIndex, Chips>,
}

/// One layer of the pot and the seats that can win it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SidePot {
    pub amount: Chips,
    pub eligible: Vec<SeatIndex>,
}

/// A top commitment level nobody else matched. Goes back to its owner.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Uncalled {
    pub seat: SeatIndex,
    pub amount: Chips,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PotLayers {
    pub pots: Vec<SidePot>,
    pub uncalled: Option<Uncalled>,
}

impl PotLayers {
    #[must_use]
    pub fn total(&self) -> Chips {
        self.pots.iter().map(|p| p.amount).sum::<Chips>()
            + self.uncalled.map_or(0, |u| u.amount)
    }
}

impl Pot {
    pub fn bet(&mut self, seat: SeatIndex, amount: Chips) {
        if amount == 0 {
            return;
        }
        *self.investments.entry(seat).or_default() += amount;
    }

    #[must_use]
    pub fn investment(&self, seat: SeatIndex) -> Chips {
        self.investments.get(&seat).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn size(&self) -> Chips {
        self.investments.values().sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Slice the pot into layers by distinct commitment level. Every seat
    /// committed at or above a level pays the increment since the previous
    /// level into that layer; only `live` seats may win it.
    ///
    /// A top layer paid by a single seat is uncalled and is handed back
    /// through `uncalled` when `refundable` says the seat can still take
    /// chips. A layer without any live contributor is merged into the
    /// nearest layer that has one, so no chips go unawarded.
    pub fn layers(
        &self,
        live: &BTreeSet<SeatIndex>,
        refundable: impl Fn(SeatIndex) -> bool,
    ) -> PotLayers {
        let mut levels: Vec<Chips> = self.investments.values().copied().collect();
        levels.sort_unstable();
        levels.dedup();

        let mut pots: Vec<SidePot> = Vec::with_capacity(levels.len());
        let mut uncalled = None;
        let mut orphaned: Chips = 0;
        let mut prev_level = 0;

        for (i, &level) in levels.iter().enumerate() {
            let contributors: Vec<SeatIndex> = self
                .investments
                .iter()
                .filter(|&(_, &amount)| amount >= level)
                .map(|(&seat, _)| seat)
                .collect();
            let amount = (level - prev_level) * contributors.len() as Chips;
            prev_level = level;

            let is_top = i == levels.len() - 1;
            if is_top && contributors.len() == 1 && refundable(contributors[0]) {
                uncalled = Some(Uncalled {
                    seat: contributors[0],
                    amount,
                });
                continue;
            }

            let eligible: Vec<SeatIndex> = contributors
                .into_iter()
                .filter(|seat| live.contains(seat))
                .collect();
            if eligible.is_empty() {
                orphaned += amount;
                continue;
            }
            pots.push(SidePot {
                amount: amount + orphaned,
                eligible,
            });
            orphaned = 0;
        }

        if orphaned > 0 {
            match pots.last_mut() {
                Some(last) => last.amount += orphaned,
                None => log::error!("{orphaned} chips in the pot have no live contender"),
            }
        }

        PotLayers { pots, uncalled }
    }
}

/// Split `amount` evenly among `winners`; the first winner takes the
/// remainder. Returns `(seat, share)` in the order given.
#[must_use]
pub fn split(amount: Chips, winners: &[SeatIndex]) -> Vec<(SeatIndex, Chips)> {
    if winners.is_empty() {
        return Vec::new();
    }
    let share = amount / winners.len() as Chips;
    let remainder = amount - share * winners.len() as Chips;
    winners
        .iter()
        .enumerate()
        .map(|(i, &seat)| (seat, if i == 0 { share + remainder } else { share }))
        .collect()
}
