//! Hold'em table state machine.
//!
//! A [`Table`] owns the seats, deck, and pot of one table and walks a match
//! through its phases: waiting for players, the four betting streets,
//! showdown, and final settlement once the round cap is reached.
//!
//! Every public operation validates before it mutates, so an `Err` leaves
//! the table exactly as it was. The only exception is a fatal error (see
//! [`TableError::is_fatal`]), after which the table must be discarded.

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fmt,
    sync::Arc,
};

use super::{
    clock::{Clock, SystemClock},
    constants::{
        DEFAULT_BIG_BLIND, DEFAULT_MAX_ROUNDS, DEFAULT_REBUY_AMOUNT, DEFAULT_SMALL_BLIND,
        DEFAULT_STARTING_STACK, DEFAULT_TURN_TIME_LIMIT_SECS, MAX_PLAYERS,
    },
    entities::{
        Action, ActionChoice, Blinds, Card, Chips, Deck, Phase, Player, PlayerId, PlayerStatus,
        SeatIndex, Shuffle, ThreadRngShuffle,
    },
    errors::{TableError, TableResult},
    functional::{self, BestHand, HandStrength},
    pot::{self, Pot, SidePot, Uncalled},
};

/// Table configuration settings
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct GameSettings {
    pub max_players: usize,
    pub starting_stack: Chips,
    pub rebuy_amount: Chips,
    pub blinds: Blinds,
    /// Hands played before the match settles.
    pub max_rounds: u32,
    pub turn_time_limit_secs: u64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_players: MAX_PLAYERS,
            starting_stack: DEFAULT_STARTING_STACK,
            rebuy_amount: DEFAULT_REBUY_AMOUNT,
            blinds: Blinds {
                small: DEFAULT_SMALL_BLIND,
                big: DEFAULT_BIG_BLIND,
            },
            max_rounds: DEFAULT_MAX_ROUNDS,
            turn_time_limit_secs: DEFAULT_TURN_TIME_LIMIT_SECS,
        }
    }
}

impl GameSettings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), String> {
        if !(2..=MAX_PLAYERS).contains(&self.max_players) {
            return Err(format!("max_players must be between 2 and {MAX_PLAYERS}"));
        }
        if self.blinds.small == 0 {
            return Err("small blind must be positive".to_string());
        }
        if self.blinds.big < self.blinds.small {
            return Err("big blind must be >= small blind".to_string());
        }
        if self.starting_stack == 0 {
            return Err("starting stack must be positive".to_string());
        }
        if self.rebuy_amount == 0 {
            return Err("rebuy amount must be positive".to_string());
        }
        if self.max_rounds == 0 {
            return Err("max_rounds must be positive".to_string());
        }
        if self.turn_time_limit_secs == 0 {
            return Err("turn time limit must be positive".to_string());
        }
        Ok(())
    }
}

/// Events that occur during play. Drained by whoever drives the table and
/// doubles as the hand history.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum TableEvent {
    Joined { seat: SeatIndex, name: String },
    Left(String),
    Readied { name: String, ready: bool },
    HandStarted { round: u32, dealer: SeatIndex },
    BlindsPosted { small: (String, Chips), big: (String, Chips) },
    Acted { name: String, action: Action, amount: Chips },
    TimedOut(String),
    StreetDealt { phase: Phase, cards: Vec<Card> },
    Won { name: String, amount: Chips, hand: String },
    Refunded { name: String, amount: Chips },
    Disconnected(String),
    Reconnected(String),
    Rebought { name: String, amount: Chips },
    BackToWaiting,
    Settled,
    Restarted,
}

impl fmt::Display for TableEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Joined { seat, name } => format!("{name} sat down at seat {seat}"),
            Self::Left(name) => format!("{name} left the table"),
            Self::Readied { name, ready } => {
                if *ready {
                    format!("{name} is ready")
                } else {
                    format!("{name} is no longer ready")
                }
            }
            Self::HandStarted { round, dealer } => {
                format!("hand #{round} started, dealer at seat {dealer}")
            }
            Self::BlindsPosted { small, big } => format!(
                "{} posted small blind {}, {} posted big blind {}",
                small.0, small.1, big.0, big.1
            ),
            Self::Acted {
                name,
                action,
                amount,
            } => {
                if *amount > 0 {
                    format!("{name} {action} ({amount} in)")
                } else {
                    format!("{name} {action}")
                }
            }
            Self::TimedOut(name) => format!("{name} ran out of time and folds"),
            Self::StreetDealt { phase, cards } => {
                let cards = cards.iter().map(Card::to_string).collect::<Vec<_>>();
                format!("{phase}: {}", cards.join(" "))
            }
            Self::Won { name, amount, hand } => format!("{name} won {amount} with {hand}"),
            Self::Refunded { name, amount } => format!("{amount} uncalled returned to {name}"),
            Self::Disconnected(name) => format!("{name} disconnected"),
            Self::Reconnected(name) => format!("{name} reconnected"),
            Self::Rebought { name, amount } => format!("{name} rebought for {amount}"),
            Self::BackToWaiting => "not enough players; waiting for more".to_string(),
            Self::Settled => "match over; final settlement".to_string(),
            Self::Restarted => "table restarted".to_string(),
        };
        write!(f, "{repr}")
    }
}

/// What happened to the turn after an action.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Transition {
    /// Same street; this seat acts next.
    NextTurn(SeatIndex),
    /// The street closed and a new one opened with `first` to act.
    NewStreet { phase: Phase, first: SeatIndex },
    /// The hand is over and results are posted.
    HandEnded,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub seat: SeatIndex,
    pub action: Action,
    /// Chips moved from the stack into the pot.
    pub amount: Chips,
    pub transition: Transition,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Confirmation {
    pub confirmed: usize,
    pub required: usize,
}

impl Confirmation {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.confirmed >= self.required
    }
}

/// Result of a showdown confirmation.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum NextHand {
    /// Still waiting on other players.
    Pending(Confirmation),
    Dealt { round: u32, transition: Transition },
    /// Fewer than two funded players; the table went back to waiting.
    Waiting,
    /// The round cap was reached.
    Settled,
}

/// Side effects of a player disconnecting or leaving.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Departure {
    pub seat: SeatIndex,
    /// Set when the departure moved the hand along.
    pub transition: Option<Transition>,
    /// Set when the departure completed the showdown confirmations.
    pub next_hand: Option<NextHand>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SeatResult {
    pub seat: SeatIndex,
    pub name: String,
    pub win_amount: Chips,
    pub hand_name: String,
    /// Only for an actual showdown.
    pub best_hand: Option<BestHand>,
    pub hole_cards: Vec<Card>,
}

/// Snapshot of how the last hand was resolved.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandResults {
    pub round: u32,
    /// Whether two or more contenders compared hands. An all-fold win
    /// reveals nothing.
    pub showdown: bool,
    pub board: Vec<Card>,
    pub pots: Vec<SidePot>,
    pub uncalled: Option<Uncalled>,
    pub players: Vec<SeatResult>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SettlementEntry {
    pub seat: SeatIndex,
    pub name: String,
    pub final_chips: Chips,
    pub total_buy_in: Chips,
    pub profit: i64,
}

/// A single hold'em table.
pub struct Table {
    pub(crate) settings: GameSettings,
    pub(crate) seats: Vec<Option<Player>>,
    pub(crate) phase: Phase,
    /// Instantiated once and reshuffled each deal.
    deck: Deck,
    shuffler: Box<dyn Shuffle>,
    clock: Arc<dyn Clock>,
    /// Community cards shared amongst all players.
    pub(crate) board: Vec<Card>,
    pub(crate) pot: Pot,
    pub(crate) current_bet: Chips,
    pub(crate) min_raise: Chips,
    /// Seats dealt into the current hand, in seat order. Kept for the
    /// whole hand even if a player leaves.
    pub(crate) hand_seats: Vec<SeatIndex>,
    /// Hand seats whose player left mid-hand. A newcomer may sit there
    /// before payout, so nothing committed from these seats is refunded.
    vacated: BTreeSet<SeatIndex>,
    pub(crate) current: Option<SeatIndex>,
    /// Last seat to raise on this street, or the street's first actor.
    pub(crate) last_aggressor: Option<SeatIndex>,
    /// Active seats that still owe an action on this street.
    pending: BTreeSet<SeatIndex>,
    /// Pending seats that may only call or fold because the last raise
    /// was a short all-in.
    raise_closed: BTreeSet<SeatIndex>,
    pub(crate) dealer_seat: Option<SeatIndex>,
    pub(crate) small_blind_seat: Option<SeatIndex>,
    pub(crate) big_blind_seat: Option<SeatIndex>,
    pub(crate) round: u32,
    pub(crate) started: bool,
    pub(crate) confirmed_next: BTreeSet<SeatIndex>,
    pub(crate) confirmed_settlement: BTreeSet<SeatIndex>,
    turn_started_at: Option<DateTime<Utc>>,
    pub(crate) last_results: Option<HandResults>,
    events: VecDeque<TableEvent>,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("phase", &self.phase)
            .field("round", &self.round)
            .field("seats", &self.seats)
            .field("board", &self.board)
            .field("pot", &self.pot)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new(GameSettings::default())
    }
}

impl Table {
    #[must_use]
    pub fn new(settings: GameSettings) -> Self {
        Self::with_parts(settings, Box::new(ThreadRngShuffle), Arc::new(SystemClock))
    }

    /// Build a table with an explicit shuffler and clock.
    #[must_use]
    pub fn with_parts(
        settings: GameSettings,
        shuffler: Box<dyn Shuffle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            seats: vec![None; settings.max_players],
            phase: Phase::Waiting,
            deck: Deck::default(),
            shuffler,
            clock,
            board: Vec::with_capacity(5),
            pot: Pot::default(),
            current_bet: 0,
            min_raise: settings.blinds.big,
            hand_seats: Vec::with_capacity(settings.max_players),
            vacated: BTreeSet::new(),
            current: None,
            last_aggressor: None,
            pending: BTreeSet::new(),
            raise_closed: BTreeSet::new(),
            dealer_seat: None,
            small_blind_seat: None,
            big_blind_seat: None,
            round: 0,
            started: false,
            confirmed_next: BTreeSet::new(),
            confirmed_settlement: BTreeSet::new(),
            turn_started_at: None,
            last_results: None,
            events: VecDeque::new(),
            settings,
        }
    }

    // Read access.

    #[must_use]
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    #[must_use]
    pub fn board(&self) -> &[Card] {
        &self.board
    }

    #[must_use]
    pub fn pot_size(&self) -> Chips {
        self.pot.size()
    }

    #[must_use]
    pub fn current_bet(&self) -> Chips {
        self.current_bet
    }

    #[must_use]
    pub fn min_raise(&self) -> Chips {
        self.min_raise
    }

    #[must_use]
    pub fn current_seat(&self) -> Option<SeatIndex> {
        self.current
    }

    #[must_use]
    pub fn dealer_seat(&self) -> Option<SeatIndex> {
        self.dealer_seat
    }

    /// Small and big blind seats of the current or last hand.
    #[must_use]
    pub fn blind_seats(&self) -> (Option<SeatIndex>, Option<SeatIndex>) {
        (self.small_blind_seat, self.big_blind_seat)
    }

    #[must_use]
    pub fn last_results(&self) -> Option<&HandResults> {
        self.last_results.as_ref()
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.seats.iter().flatten()
    }

    fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.seats.iter_mut().flatten()
    }

    #[must_use]
    pub fn seated_count(&self) -> usize {
        self.players().count()
    }

    #[must_use]
    pub fn seat(&self, seat: SeatIndex) -> Option<&Player> {
        self.seats.get(seat).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn player_by_id(&self, id: &PlayerId) -> Option<&Player> {
        self.players().find(|p| &p.id == id)
    }

    /// First seated player with this display name.
    #[must_use]
    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players().find(|p| p.name == name)
    }

    pub fn seat_of(&self, id: &PlayerId) -> TableResult<SeatIndex> {
        self.player_by_id(id)
            .map(|p| p.seat)
            .ok_or(TableError::PlayerNotFound)
    }

    pub fn drain_events(&mut self) -> VecDeque<TableEvent> {
        std::mem::take(&mut self.events)
    }

    // Lobby.

    /// Seat a new player at the lowest open seat.
    pub fn add_player(&mut self, id: PlayerId, name: &str) -> TableResult<SeatIndex> {
        if self.player_by_id(&id).is_some() {
            return Err(TableError::AlreadyJoined);
        }
        let seat = self
            .seats
            .iter()
            .position(Option::is_none)
            .ok_or(TableError::RoomFull)?;

        let mut player = Player::new(id, name, seat, self.settings.starting_stack);
        if self.phase != Phase::Waiting {
            // Dealt in from the next hand.
            player.status = PlayerStatus::SittingOut;
        }
        info!("{} joined at seat {seat}", player.name);
        self.events.push_back(TableEvent::Joined {
            seat,
            name: player.name.clone(),
        });
        self.seats[seat] = Some(player);
        Ok(seat)
    }

    /// Flip a player's ready flag. Returns whether a hand can now start.
    pub fn set_ready(&mut self, id: &PlayerId, ready: bool) -> TableResult<bool> {
        if self.phase != Phase::Waiting {
            return Err(TableError::NotAllowedNow { phase: self.phase });
        }
        let seat = self.seat_of(id)?;
        let player = self.player_mut(seat)?;
        player.ready = ready;
        let name = player.name.clone();
        self.events.push_back(TableEvent::Readied { name, ready });
        Ok(self.can_start())
    }

    fn eligible_seats(&self) -> Vec<SeatIndex> {
        self.players()
            .filter(|p| p.ready && p.connected && p.chips > 0)
            .map(|p| p.seat)
            .collect()
    }

    #[must_use]
    pub fn can_start(&self) -> bool {
        self.phase == Phase::Waiting && self.eligible_seats().len() >= 2
    }

    /// Deal a hand from `Waiting`. The first hand of a match also resets
    /// everyone's lifetime buy-in to their current stack.
    pub fn start_hand(&mut self) -> TableResult<Transition> {
        if self.phase != Phase::Waiting {
            return Err(TableError::NotAllowedNow { phase: self.phase });
        }
        if !self.can_start() {
            return Err(TableError::NotEnoughPlayers);
        }
        if !self.started {
            self.started = true;
            self.round = 0;
            self.dealer_seat = None;
            for player in self.players_mut() {
                player.total_buy_in = player.chips;
            }
            info!("match started");
        }
        self.deal_hand()
    }

    // Betting.

    /// Apply a player's betting action.
    pub fn act(&mut self, id: &PlayerId, action: Action) -> TableResult<ActionOutcome> {
        if !self.phase.is_betting() {
            return Err(TableError::NotBettingPhase);
        }
        let seat = self.seat_of(id)?;
        if self.current != Some(seat) {
            return Err(TableError::NotYourTurn);
        }
        let player = self.player(seat)?;
        if player.status != PlayerStatus::Active {
            return Err(TableError::InvalidStatus);
        }

        let to_call = self.current_bet.saturating_sub(player.street_bet);
        let closed = self.raise_closed.contains(&seat);
        let commit = match action {
            Action::Fold => 0,
            Action::Check => {
                if to_call > 0 {
                    return Err(TableError::MustCallOrFold);
                }
                0
            }
            Action::Call => to_call.min(player.chips),
            Action::Raise(increment) => {
                if closed {
                    return Err(TableError::RaiseNotReopened);
                }
                let needed = to_call.saturating_add(increment);
                if needed > player.chips {
                    return Err(TableError::InsufficientChips {
                        needed,
                        available: player.chips,
                    });
                }
                // A raise short of the minimum is only legal as an all-in.
                if increment < self.min_raise && needed < player.chips {
                    return Err(TableError::BelowMinRaise {
                        min: self.min_raise,
                    });
                }
                needed
            }
            Action::AllIn => {
                if closed && player.chips > to_call {
                    return Err(TableError::RaiseNotReopened);
                }
                player.chips
            }
        };

        self.apply(seat, action, commit)
    }

    /// [`Table::act`] for callers holding the action as text, such as
    /// `("raise", Some(40))` off the wire.
    pub fn act_kind(
        &mut self,
        id: &PlayerId,
        kind: &str,
        amount: Option<Chips>,
    ) -> TableResult<ActionOutcome> {
        let action = Action::from_kind(kind, amount)?;
        self.act(id, action)
    }

    /// Fold whoever is on the clock.
    pub fn force_timeout(&mut self) -> TableResult<ActionOutcome> {
        if !self.phase.is_betting() {
            return Err(TableError::NotBettingPhase);
        }
        let seat = self.current.ok_or(TableError::NoActiveTurn)?;
        let player = self.player(seat)?;
        let (id, name) = (player.id.clone(), player.name.clone());
        let outcome = self.act(&id, Action::Fold)?;
        info!("{name} timed out at seat {seat}");
        self.events.push_back(TableEvent::TimedOut(name));
        Ok(outcome)
    }

    /// Whole seconds left on the current turn; zero when nobody is on the
    /// clock.
    #[must_use]
    pub fn time_remaining(&self) -> u64 {
        match (self.current, self.turn_started_at) {
            (Some(_), Some(started)) => {
                let elapsed = (self.clock.now() - started).num_seconds().max(0) as u64;
                self.settings.turn_time_limit_secs.saturating_sub(elapsed)
            }
            _ => 0,
        }
    }

    #[must_use]
    pub fn turn_expired(&self) -> bool {
        self.phase.is_betting() && self.current.is_some() && self.time_remaining() == 0
    }

    /// What `seat` may do right now. Empty unless it's their turn.
    #[must_use]
    pub fn legal_actions(&self, seat: SeatIndex) -> Vec<ActionChoice> {
        let Some(player) = self.seat(seat) else {
            return Vec::new();
        };
        if !self.phase.is_betting()
            || self.current != Some(seat)
            || player.status != PlayerStatus::Active
        {
            return Vec::new();
        }

        let to_call = self.current_bet.saturating_sub(player.street_bet);
        let closed = self.raise_closed.contains(&seat);
        let mut choices = vec![ActionChoice::Fold];
        if to_call == 0 {
            choices.push(ActionChoice::Check);
        } else {
            choices.push(ActionChoice::Call(to_call.min(player.chips)));
        }
        if !closed && player.chips > to_call {
            let max = player.chips - to_call;
            choices.push(ActionChoice::Raise {
                min: self.min_raise.min(max),
                max,
            });
        }
        if !closed || player.chips <= to_call {
            choices.push(ActionChoice::AllIn(player.chips));
        }
        choices
    }

    /// Chips `seat` needs to put in to call.
    #[must_use]
    pub fn to_call(&self, seat: SeatIndex) -> Chips {
        self.seat(seat).map_or(0, |p| {
            self.current_bet.saturating_sub(p.street_bet).min(p.chips)
        })
    }

    // Between hands.

    #[must_use]
    pub fn next_hand_confirmation(&self) -> Confirmation {
        self.confirmation(&self.confirmed_next)
    }

    #[must_use]
    pub fn settlement_confirmation(&self) -> Confirmation {
        self.confirmation(&self.confirmed_settlement)
    }

    /// Disconnected players count as confirmed.
    fn confirmation(&self, confirmed: &BTreeSet<SeatIndex>) -> Confirmation {
        let mut status = Confirmation::default();
        for player in self.players() {
            status.required += 1;
            if !player.connected || confirmed.contains(&player.seat) {
                status.confirmed += 1;
            }
        }
        status
    }

    /// Confirm the showdown. The next hand is dealt once every seated
    /// player has confirmed.
    pub fn confirm_next_hand(&mut self, id: &PlayerId) -> TableResult<NextHand> {
        if self.phase != Phase::Showdown {
            return Err(TableError::NotAllowedNow { phase: self.phase });
        }
        let seat = self.seat_of(id)?;
        self.confirmed_next.insert(seat);
        self.advance_if_confirmed()
    }

    pub fn confirm_settlement(&mut self, id: &PlayerId) -> TableResult<Confirmation> {
        if self.phase != Phase::Settled {
            return Err(TableError::NotAllowedNow { phase: self.phase });
        }
        let seat = self.seat_of(id)?;
        self.confirmed_settlement.insert(seat);
        Ok(self.settlement_confirmation())
    }

    fn advance_if_confirmed(&mut self) -> TableResult<NextHand> {
        let status = self.next_hand_confirmation();
        if !status.is_complete() {
            return Ok(NextHand::Pending(status));
        }
        if !self.prepare_next_round()? {
            return Ok(NextHand::Settled);
        }
        match self.deal_hand() {
            Ok(transition) => Ok(NextHand::Dealt {
                round: self.round,
                transition,
            }),
            Err(TableError::NotEnoughPlayers) => {
                self.phase = Phase::Waiting;
                for player in self.players_mut() {
                    player.ready = false;
                }
                info!("not enough funded players; back to waiting");
                self.events.push_back(TableEvent::BackToWaiting);
                Ok(NextHand::Waiting)
            }
            Err(err) => Err(err),
        }
    }

    /// Leave showdown. Settles the match when the round cap is reached and
    /// returns `false`; otherwise clears per-hand state, marks everyone
    /// ready, and returns `true`.
    pub fn prepare_next_round(&mut self) -> TableResult<bool> {
        if self.phase != Phase::Showdown {
            return Err(TableError::NotAllowedNow { phase: self.phase });
        }
        self.confirmed_next.clear();

        if self.round >= self.settings.max_rounds {
            self.phase = Phase::Settled;
            self.confirmed_settlement.clear();
            info!("round cap of {} reached; settling", self.settings.max_rounds);
            self.events.push_back(TableEvent::Settled);
            return Ok(false);
        }

        self.clear_hand();
        for player in self.players_mut() {
            player.reset();
            player.ready = true;
        }
        Ok(true)
    }

    /// Restock a broke player. Allowed only between hands.
    pub fn rebuy(&mut self, id: &PlayerId) -> TableResult<Chips> {
        let seat = self.seat_of(id)?;
        let phase = self.phase;
        if !matches!(phase, Phase::Waiting | Phase::Showdown | Phase::Settled) {
            return Err(TableError::NotAllowedNow { phase });
        }
        let amount = self.settings.rebuy_amount;
        let player = self.player_mut(seat)?;
        if player.chips > 0 {
            return Err(TableError::StillHasChips);
        }
        player.chips = amount;
        player.total_buy_in += amount;
        if phase != Phase::Showdown {
            player.status = PlayerStatus::Active;
        }
        let name = player.name.clone();
        info!("{name} rebought for {amount}");
        self.events.push_back(TableEvent::Rebought { name, amount });
        Ok(amount)
    }

    /// Start the match over: every stack and buy-in goes back to the
    /// starting amount and the round counter is cleared.
    pub fn restart(&mut self) {
        self.clear_hand();
        self.phase = Phase::Waiting;
        self.round = 0;
        self.started = false;
        self.dealer_seat = None;
        self.confirmed_next.clear();
        self.confirmed_settlement.clear();
        let stack = self.settings.starting_stack;
        for player in self.players_mut() {
            player.chips = stack;
            player.total_buy_in = stack;
            player.reset();
            player.ready = false;
        }
        info!("table restarted");
        self.events.push_back(TableEvent::Restarted);
    }

    /// Final standings by profit, best first.
    #[must_use]
    pub fn settlement(&self) -> Vec<SettlementEntry> {
        let mut entries: Vec<SettlementEntry> = self
            .players()
            .map(|p| SettlementEntry {
                seat: p.seat,
                name: p.name.clone(),
                final_chips: p.chips,
                total_buy_in: p.total_buy_in,
                profit: i64::from(p.chips) - i64::from(p.total_buy_in),
            })
            .collect();
        entries.sort_by(|a, b| b.profit.cmp(&a.profit));
        entries
    }

    // Connection lifecycle.

    /// Folds the player if they're on the clock and counts them as
    /// confirmed for any pending showdown or settlement.
    pub fn mark_disconnected(&mut self, id: &PlayerId) -> TableResult<Departure> {
        let seat = self.seat_of(id)?;
        let player = self.player_mut(seat)?;
        player.connected = false;
        let status = player.status;
        let name = player.name.clone();
        info!("{name} disconnected from seat {seat}");
        self.events.push_back(TableEvent::Disconnected(name));

        let mut departure = Departure {
            seat,
            transition: None,
            next_hand: None,
        };
        match self.phase {
            phase if phase.is_betting() => {
                if self.current == Some(seat) && status == PlayerStatus::Active {
                    departure.transition = Some(self.apply(seat, Action::Fold, 0)?.transition);
                }
            }
            Phase::Showdown => {
                self.confirmed_next.insert(seat);
                departure.next_hand = Some(self.advance_if_confirmed()?);
            }
            Phase::Settled => {
                self.confirmed_settlement.insert(seat);
            }
            _ => {}
        }
        Ok(departure)
    }

    /// Swap a player's identity token, keeping seat, stack, and
    /// confirmations.
    pub fn reconnect(&mut self, old: &PlayerId, new: PlayerId) -> TableResult<SeatIndex> {
        let seat = self.seat_of(old)?;
        if &new != old && self.player_by_id(&new).is_some() {
            return Err(TableError::AlreadyJoined);
        }
        let player = self.player_mut(seat)?;
        player.id = new;
        player.connected = true;
        let name = player.name.clone();
        info!("{name} reconnected at seat {seat}");
        self.events.push_back(TableEvent::Reconnected(name));
        Ok(seat)
    }

    /// Remove a player from their seat. Mid-hand this is a fold; whatever
    /// they already put in stays in the pot.
    pub fn remove_player(&mut self, id: &PlayerId) -> TableResult<Departure> {
        let seat = self.seat_of(id)?;
        let player = self.seats[seat].take().ok_or(TableError::CorruptSeat(seat))?;
        self.pending.remove(&seat);
        self.raise_closed.remove(&seat);
        self.confirmed_next.remove(&seat);
        self.confirmed_settlement.remove(&seat);
        if self.hand_seats.contains(&seat) {
            self.vacated.insert(seat);
        }
        info!("{} left seat {seat}", player.name);
        self.events.push_back(TableEvent::Left(player.name));

        let mut departure = Departure {
            seat,
            transition: None,
            next_hand: None,
        };
        if self.phase.is_betting() && self.hand_seats.contains(&seat) {
            let from = self.current.unwrap_or(seat);
            departure.transition = Some(self.progress(from, from != seat)?);
        } else if self.phase == Phase::Showdown {
            departure.next_hand = Some(self.advance_if_confirmed()?);
        }
        Ok(departure)
    }

    // Internals.

    fn player(&self, seat: SeatIndex) -> TableResult<&Player> {
        self.seat(seat).ok_or(TableError::CorruptSeat(seat))
    }

    fn player_mut(&mut self, seat: SeatIndex) -> TableResult<&mut Player> {
        self.seats
            .get_mut(seat)
            .and_then(Option::as_mut)
            .ok_or(TableError::CorruptSeat(seat))
    }

    fn name_of(&self, seat: SeatIndex) -> String {
        self.seat(seat).map_or_else(|| format!("seat {seat}"), |p| p.name.clone())
    }

    /// Seats in the hand whose player is still seated and matches `pred`.
    fn hand_seats_where(&self, pred: impl Fn(&Player) -> bool) -> Vec<SeatIndex> {
        self.hand_seats
            .iter()
            .copied()
            .filter(|&seat| self.seat(seat).is_some_and(&pred))
            .collect()
    }

    fn live_seats(&self) -> Vec<SeatIndex> {
        self.hand_seats_where(|p| p.status.is_live())
    }

    fn active_seats(&self) -> Vec<SeatIndex> {
        self.hand_seats_where(|p| p.status == PlayerStatus::Active)
    }

    /// First hand seat after `from`, wrapping around, matching `pred`.
    fn next_in_hand(
        &self,
        from: SeatIndex,
        pred: impl Fn(SeatIndex) -> bool,
    ) -> Option<SeatIndex> {
        let n = self.hand_seats.len();
        let pos = self.hand_seats.iter().position(|&s| s == from)?;
        (1..=n)
            .map(|k| self.hand_seats[(pos + k) % n])
            .find(|&seat| pred(seat))
    }

    fn clear_hand(&mut self) {
        self.board.clear();
        self.pot = Pot::default();
        self.current_bet = 0;
        self.min_raise = self.settings.blinds.big;
        self.hand_seats.clear();
        self.vacated.clear();
        self.current = None;
        self.last_aggressor = None;
        self.pending.clear();
        self.raise_closed.clear();
        self.small_blind_seat = None;
        self.big_blind_seat = None;
        self.turn_started_at = None;
        self.last_results = None;
    }

    fn deal_hand(&mut self) -> TableResult<Transition> {
        let participants = self.eligible_seats();
        if participants.len() < 2 {
            return Err(TableError::NotEnoughPlayers);
        }

        self.clear_hand();
        self.confirmed_next.clear();
        self.deck.reset(self.shuffler.as_mut());
        for player in self.players_mut() {
            player.reset();
            if !participants.contains(&player.seat) {
                player.status = PlayerStatus::SittingOut;
            }
        }

        let dealer = match self.dealer_seat {
            Some(prev) => participants
                .iter()
                .copied()
                .find(|&seat| seat > prev)
                .unwrap_or(participants[0]),
            None => participants[0],
        };
        self.dealer_seat = Some(dealer);
        self.hand_seats = participants;
        self.round += 1;
        self.phase = Phase::PreFlop;

        for seat in self.hand_seats.clone() {
            let cards = self.deck.deal_cards(2)?;
            self.player_mut(seat)?.hole_cards = cards;
        }
        info!(
            "hand #{} started with {} players, dealer at seat {dealer}",
            self.round,
            self.hand_seats.len()
        );
        self.events.push_back(TableEvent::HandStarted {
            round: self.round,
            dealer,
        });

        self.post_blinds(dealer)
    }

    fn post_blinds(&mut self, dealer: SeatIndex) -> TableResult<Transition> {
        let n = self.hand_seats.len();
        let d = self
            .hand_seats
            .iter()
            .position(|&s| s == dealer)
            .ok_or(TableError::CorruptSeat(dealer))?;
        // Heads-up, the dealer posts the small blind.
        let (sb_pos, bb_pos) = if n == 2 {
            (d, (d + 1) % n)
        } else {
            ((d + 1) % n, (d + 2) % n)
        };
        let (sb, bb) = (self.hand_seats[sb_pos], self.hand_seats[bb_pos]);
        let blinds = self.settings.blinds;

        let sb_paid = self.player_mut(sb)?.commit(blinds.small);
        self.pot.bet(sb, sb_paid);
        let bb_paid = self.player_mut(bb)?.commit(blinds.big);
        self.pot.bet(bb, bb_paid);
        self.small_blind_seat = Some(sb);
        self.big_blind_seat = Some(bb);
        self.current_bet = blinds.big;
        self.min_raise = blinds.big;
        self.events.push_back(TableEvent::BlindsPosted {
            small: (self.name_of(sb), sb_paid),
            big: (self.name_of(bb), bb_paid),
        });

        let first = if n == 2 {
            sb
        } else {
            self.hand_seats[(bb_pos + 1) % n]
        };
        self.pending = self.active_seats().into_iter().collect();
        self.last_aggressor = Some(first);
        self.progress(first, true)
    }

    fn apply(&mut self, seat: SeatIndex, action: Action, commit: Chips) -> TableResult<ActionOutcome> {
        let player = self.player_mut(seat)?;
        if action == Action::Fold {
            player.status = PlayerStatus::Folded;
        }
        let paid = player.commit(commit);
        let street_bet = player.street_bet;
        let name = player.name.clone();

        self.pot.bet(seat, paid);
        self.pending.remove(&seat);
        self.raise_closed.remove(&seat);

        if street_bet > self.current_bet {
            let increment = street_bet - self.current_bet;
            self.current_bet = street_bet;
            self.last_aggressor = Some(seat);
            let others = self.active_seats().into_iter().filter(|&s| s != seat);
            if increment >= self.min_raise {
                // A full raise reopens the action for everyone.
                self.min_raise = increment;
                self.raise_closed.clear();
                self.pending = others.collect();
            } else {
                // Short all-in: whoever already acted must respond, but
                // may not raise again.
                let others: Vec<SeatIndex> = others.collect();
                for other in others {
                    if self.pending.insert(other) {
                        self.raise_closed.insert(other);
                    }
                }
            }
        }

        debug!("{name} {action} (seat {seat}, {paid} in)");
        self.events.push_back(TableEvent::Acted {
            name,
            action,
            amount: paid,
        });

        let transition = self.progress(seat, false)?;
        Ok(ActionOutcome {
            seat,
            action,
            amount: paid,
            transition,
        })
    }

    /// Hand the turn to the next seat that owes an action, closing the
    /// street or the hand when nobody does.
    fn progress(&mut self, from: SeatIndex, include_from: bool) -> TableResult<Transition> {
        if self.live_seats().len() <= 1 {
            self.finish_hand()?;
            return Ok(Transition::HandEnded);
        }

        // A lone active player facing no bet has nothing to decide.
        if let [only] = self.active_seats()[..] {
            if self.player(only)?.street_bet >= self.current_bet {
                self.pending.clear();
            }
        }

        let next = if include_from && self.pending.contains(&from) {
            Some(from)
        } else {
            self.next_in_hand(from, |seat| self.pending.contains(&seat))
        };
        match next {
            Some(seat) => {
                if self.current != Some(seat) {
                    self.current = Some(seat);
                    self.turn_started_at = Some(self.clock.now());
                }
                Ok(Transition::NextTurn(seat))
            }
            None => self.close_street(),
        }
    }

    /// Deal the next street. Streets with fewer than two players able to
    /// bet are dealt straight through to showdown.
    fn close_street(&mut self) -> TableResult<Transition> {
        loop {
            for seat in self.hand_seats.clone() {
                if let Some(player) = self.seats[seat].as_mut() {
                    player.street_bet = 0;
                }
            }
            self.current_bet = 0;
            self.min_raise = self.settings.blinds.big;
            self.pending.clear();
            self.raise_closed.clear();
            self.current = None;
            self.turn_started_at = None;

            let street = match self.phase.next_street() {
                Some(Phase::Showdown) | None => {
                    self.finish_hand()?;
                    return Ok(Transition::HandEnded);
                }
                Some(street) => street,
            };
            let cards = self
                .deck
                .deal_cards(if street == Phase::Flop { 3 } else { 1 })?;
            self.board.extend(&cards);
            self.phase = street;
            debug!("dealt the {street}");
            self.events.push_back(TableEvent::StreetDealt {
                phase: street,
                cards,
            });

            let active = self.active_seats();
            if active.len() >= 2 {
                let first = self
                    .dealer_seat
                    .and_then(|dealer| self.next_in_hand(dealer, |seat| active.contains(&seat)))
                    .unwrap_or(active[0]);
                self.pending = active.into_iter().collect();
                self.last_aggressor = Some(first);
                self.current = Some(first);
                self.turn_started_at = Some(self.clock.now());
                return Ok(Transition::NewStreet {
                    phase: street,
                    first,
                });
            }
        }
    }

    /// Pay out the pot and move to showdown.
    fn finish_hand(&mut self) -> TableResult<()> {
        self.phase = Phase::Showdown;
        self.current = None;
        self.turn_started_at = None;
        self.pending.clear();
        self.raise_closed.clear();
        self.confirmed_next.clear();

        let live = self.live_seats();
        let mut winnings: BTreeMap<SeatIndex, Chips> = BTreeMap::new();
        let results = if let [winner] = live[..] {
            let amount = self.pot.size();
            winnings.insert(winner, amount);
            HandResults {
                round: self.round,
                showdown: false,
                board: self.board.clone(),
                pots: vec![SidePot {
                    amount,
                    eligible: vec![winner],
                }],
                uncalled: None,
                players: vec![SeatResult {
                    seat: winner,
                    name: self.name_of(winner),
                    win_amount: amount,
                    hand_name: "Others folded".to_string(),
                    best_hand: None,
                    hole_cards: Vec::new(),
                }],
            }
        } else {
            let mut best: BTreeMap<SeatIndex, BestHand> = BTreeMap::new();
            for &seat in &live {
                let player = self.player(seat)?;
                let mut cards = player.hole_cards.clone();
                cards.extend(&self.board);
                best.insert(seat, functional::evaluate_best_hand(&cards)?);
            }

            let live_set: BTreeSet<SeatIndex> = live.iter().copied().collect();
            let layers = self.pot.layers(&live_set, |seat| {
                !self.vacated.contains(&seat) && self.seat(seat).is_some()
            });
            for side in &layers.pots {
                let contenders: Vec<(SeatIndex, &BestHand)> = side
                    .eligible
                    .iter()
                    .filter_map(|seat| best.get(seat).map(|hand| (*seat, hand)))
                    .collect();
                let strengths: Vec<HandStrength> = contenders
                    .iter()
                    .map(|(_, hand)| hand.strength.clone())
                    .collect();
                let winners: Vec<SeatIndex> = functional::argmax(&strengths)
                    .into_iter()
                    .map(|i| contenders[i].0)
                    .collect();
                for (seat, share) in pot::split(side.amount, &winners) {
                    *winnings.entry(seat).or_default() += share;
                }
            }

            let mut players = Vec::with_capacity(live.len());
            for &seat in &live {
                let player = self.player(seat)?;
                let hand = best.remove(&seat);
                players.push(SeatResult {
                    seat,
                    name: player.name.clone(),
                    win_amount: winnings.get(&seat).copied().unwrap_or(0),
                    hand_name: hand.as_ref().map(BestHand::name).unwrap_or_default(),
                    best_hand: hand,
                    hole_cards: player.hole_cards.clone(),
                });
            }
            HandResults {
                round: self.round,
                showdown: true,
                board: self.board.clone(),
                pots: layers.pots,
                uncalled: layers.uncalled,
                players,
            }
        };

        if let Some(refund) = results.uncalled {
            if let Some(player) = self.seats[refund.seat].as_mut() {
                player.chips += refund.amount;
                self.events.push_back(TableEvent::Refunded {
                    name: player.name.clone(),
                    amount: refund.amount,
                });
            }
        }
        for (&seat, &amount) in &winnings {
            match self.seats.get_mut(seat).and_then(Option::as_mut) {
                Some(player) => player.chips += amount,
                None => error!("winner at seat {seat} is gone; {amount} chips unpaid"),
            }
        }
        for entry in results.players.iter().filter(|e| e.win_amount > 0) {
            info!("{} won {} with {}", entry.name, entry.win_amount, entry.hand_name);
            self.events.push_back(TableEvent::Won {
                name: entry.name.clone(),
                amount: entry.win_amount,
                hand: entry.hand_name.clone(),
            });
        }

        self.pot = Pot::default();
        self.last_results = Some(results);
        Ok(())
    }
}
