//! Per-viewer table snapshots.
//!
//! A view is a pure projection of the table: nothing here mutates state,
//! and hole cards the viewer isn't entitled to see are replaced with
//! `None` before the snapshot leaves the engine.

use serde::{Deserialize, Serialize};

use super::{
    entities::{ActionChoice, Blinds, Card, Chips, Phase, PlayerId, PlayerStatus, SeatIndex},
    state_machine::{HandResults, SettlementEntry, Table},
};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerView {
    pub seat: SeatIndex,
    pub name: String,
    pub chips: Chips,
    pub total_buy_in: Chips,
    /// `None` for a card the viewer can't see.
    pub hole_cards: Vec<Option<Card>>,
    pub street_bet: Chips,
    pub status: PlayerStatus,
    pub ready: bool,
    pub connected: bool,
    /// Confirmed the showdown or the settlement, whichever is pending.
    pub confirmed: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableView {
    pub phase: Phase,
    pub started: bool,
    pub round: u32,
    pub max_rounds: u32,
    pub blinds: Blinds,
    pub players: Vec<PlayerView>,
    pub seated_count: usize,
    pub board: Vec<Card>,
    pub pot: Chips,
    pub current_bet: Chips,
    pub min_raise: Chips,
    pub dealer_seat: Option<SeatIndex>,
    pub small_blind_seat: Option<SeatIndex>,
    pub big_blind_seat: Option<SeatIndex>,
    pub current_seat: Option<SeatIndex>,
    pub time_remaining: u64,
    pub turn_time_limit: u64,
    pub confirmed_count: usize,
    pub last_results: Option<HandResults>,
    /// Whether the last hand went to a multi-way showdown.
    pub showdown_revealed: bool,
    pub settlement: Option<Vec<SettlementEntry>>,
    pub viewer_seat: Option<SeatIndex>,
    pub legal_actions: Vec<ActionChoice>,
    pub to_call: Chips,
    pub can_rebuy: bool,
}

impl TableView {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Table {
    /// Snapshot the table as `viewer` may see it. `None` is a spectator.
    #[must_use]
    pub fn view(&self, viewer: Option<&PlayerId>) -> TableView {
        let viewer_seat = viewer.and_then(|id| self.player_by_id(id)).map(|p| p.seat);
        let showdown_revealed = self.last_results.as_ref().is_some_and(|r| r.showdown);
        let reveal = self.phase == Phase::Showdown && showdown_revealed;
        let confirmations = match self.phase {
            Phase::Settled => &self.confirmed_settlement,
            _ => &self.confirmed_next,
        };

        let players = self
            .players()
            .map(|p| {
                let visible = viewer_seat == Some(p.seat)
                    || (reveal && p.status != PlayerStatus::Folded);
                PlayerView {
                    seat: p.seat,
                    name: p.name.clone(),
                    chips: p.chips,
                    total_buy_in: p.total_buy_in,
                    hole_cards: p
                        .hole_cards
                        .iter()
                        .map(|&card| visible.then_some(card))
                        .collect(),
                    street_bet: p.street_bet,
                    status: p.status,
                    ready: p.ready,
                    connected: p.connected,
                    confirmed: confirmations.contains(&p.seat),
                }
            })
            .collect();

        let confirmed_count = match self.phase {
            Phase::Settled => self.settlement_confirmation().confirmed,
            _ => self.next_hand_confirmation().confirmed,
        };
        let (legal_actions, to_call, can_rebuy) = match viewer_seat {
            Some(seat) => (
                self.legal_actions(seat),
                self.to_call(seat),
                self.seat(seat).is_some_and(|p| p.chips == 0)
                    && matches!(
                        self.phase,
                        Phase::Waiting | Phase::Showdown | Phase::Settled
                    ),
            ),
            None => (Vec::new(), 0, false),
        };

        TableView {
            phase: self.phase,
            started: self.started,
            round: self.round,
            max_rounds: self.settings.max_rounds,
            blinds: self.settings.blinds,
            players,
            seated_count: self.seated_count(),
            board: self.board.clone(),
            pot: self.pot.size(),
            current_bet: self.current_bet,
            min_raise: self.min_raise,
            dealer_seat: self.dealer_seat,
            small_blind_seat: self.small_blind_seat,
            big_blind_seat: self.big_blind_seat,
            current_seat: self.current,
            time_remaining: self.time_remaining(),
            turn_time_limit: self.settings.turn_time_limit_secs,
            confirmed_count,
            last_results: self.last_results.clone(),
            showdown_revealed,
            settlement: (self.phase == Phase::Settled).then(|| self.settlement()),
            viewer_seat,
            legal_actions,
            to_call,
            can_rebuy,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::game::{
        entities::{Action, ActionChoice, PlayerId},
        state_machine::Table,
    };

    fn seated(n: usize) -> Table {
        let mut table = Table::default();
        for i in 0..n {
            let id = PlayerId::new(&format!("p{i}"));
            table.add_player(id.clone(), &format!("p{i}")).unwrap();
            table.set_ready(&id, true).unwrap();
        }
        table
    }

    #[test]
    fn test_viewer_sees_only_own_cards() {
        let mut table = seated(3);
        table.start_hand().unwrap();
        let view = table.view(Some(&PlayerId::new("p1")));
        assert_eq!(view.viewer_seat, Some(1));
        for player in &view.players {
            assert_eq!(player.hole_cards.len(), 2);
            let visible = player.hole_cards.iter().all(Option::is_some);
            assert_eq!(visible, player.seat == 1);
        }
    }

    #[test]
    fn test_spectator_sees_nothing_and_has_no_actions() {
        let mut table = seated(2);
        table.start_hand().unwrap();
        let view = table.view(None);
        assert!(view.players.iter().all(|p| p.hole_cards.iter().all(Option::is_none)));
        assert!(view.legal_actions.is_empty());
        assert!(!view.can_rebuy);
    }

    #[test]
    fn test_current_player_gets_legal_actions() {
        let mut table = seated(3);
        table.start_hand().unwrap();
        let view = table.view(Some(&PlayerId::new("p0")));
        assert_eq!(view.current_seat, Some(0));
        assert_eq!(view.to_call, 20);
        assert_eq!(
            view.legal_actions,
            vec![
                ActionChoice::Fold,
                ActionChoice::Call(20),
                ActionChoice::Raise { min: 20, max: 980 },
                ActionChoice::AllIn(1000),
            ]
        );
        let other = table.view(Some(&PlayerId::new("p1")));
        assert!(other.legal_actions.is_empty());
    }

    #[test]
    fn test_fold_win_keeps_cards_hidden() {
        let mut table = seated(2);
        table.start_hand().unwrap();
        let current = table.current_seat().unwrap();
        let id = table.seat(current).unwrap().id.clone();
        table.act(&id, Action::Fold).unwrap();
        let view = table.view(None);
        assert!(!view.showdown_revealed);
        assert!(view.players.iter().all(|p| p.hole_cards.iter().all(Option::is_none)));
        assert!(view.to_json().unwrap().contains("\"phase\":\"showdown\""));
    }
}
