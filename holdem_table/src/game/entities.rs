use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer, Serialize};
use std::{
    fmt::{self},
    hash::{Hash, Hasher},
    mem::discriminant,
    str::FromStr,
};
use thiserror::Error;

use super::constants;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Heart,
    Diamond,
    Club,
    Spade,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Heart, Suit::Diamond, Suit::Club, Suit::Spade];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Heart => "♥",
            Self::Diamond => "♦",
            Self::Club => "♣",
            Self::Spade => "♠",
        };
        write!(f, "{repr}")
    }
}

/// Placeholder for card values.
pub type Value = u8;

/// Lowest and highest card values. Aces are always 14; the evaluator
/// handles the wheel on its own.
pub const MIN_VALUE: Value = 2;
pub const MAX_VALUE: Value = 14;

/// A card is a tuple of a value (2 ..= 14, ace high) and a suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl Card {
    #[must_use]
    pub fn value(&self) -> Value {
        self.0
    }

    #[must_use]
    pub fn suit(&self) -> Suit {
        self.1
    }

    /// Face label of the card's rank ("2" ..= "10", "J", "Q", "K", "A").
    #[must_use]
    pub fn rank_label(&self) -> String {
        match self.0 {
            11 => "J".to_string(),
            12 => "Q".to_string(),
            13 => "K".to_string(),
            14 => "A".to_string(),
            v => v.to_string(),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.rank_label(), self.1)
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum DeckError {
    #[error("deck exhausted")]
    Exhausted,
}

/// Produces the order cards are dealt in. Implementations must yield a
/// uniformly random permutation unless they exist for tests.
pub trait Shuffle: Send {
    fn shuffle(&mut self, cards: &mut [Card]);
}

/// Default shuffler backed by the thread-local RNG.
#[derive(Debug, Default)]
pub struct ThreadRngShuffle;

impl Shuffle for ThreadRngShuffle {
    fn shuffle(&mut self, cards: &mut [Card]) {
        cards.shuffle(&mut rand::rng());
    }
}

#[derive(Debug)]
pub struct Deck {
    cards: [Card; 52],
    pub deck_idx: usize,
}

impl Deck {
    /// Restore all 52 cards and shuffle them. Dealing starts over from the
    /// top.
    pub fn reset(&mut self, shuffler: &mut dyn Shuffle) {
        *self = Self::default();
        shuffler.shuffle(&mut self.cards);
    }

    pub fn deal_card(&mut self) -> Result<Card, DeckError> {
        let card = *self.cards.get(self.deck_idx).ok_or(DeckError::Exhausted)?;
        self.deck_idx += 1;
        Ok(card)
    }

    pub fn deal_cards(&mut self, n: usize) -> Result<Vec<Card>, DeckError> {
        if self.remaining() < n {
            return Err(DeckError::Exhausted);
        }
        (0..n).map(|_| self.deal_card()).collect()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cards.len() - self.deck_idx
    }
}

impl Default for Deck {
    fn default() -> Self {
        let mut cards: [Card; 52] = [Card(MIN_VALUE, Suit::Heart); 52];
        for (i, suit) in Suit::ALL.into_iter().enumerate() {
            for (j, value) in (MIN_VALUE..=MAX_VALUE).enumerate() {
                cards[13 * i + j] = Card(value, suit);
            }
        }
        Self { cards, deck_idx: 0 }
    }
}

/// Type alias for whole chips. Stacks, bets, and pots are all whole chips.
pub type Chips = u32;

/// Opaque identity token supplied by the caller (a connection id, a
/// session token). Replaced wholesale on reconnect.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(s: &str) -> Self {
        let mut id: String = s.chars().filter(|c| !c.is_control()).collect();
        truncate_at_boundary(&mut id, constants::MAX_USER_INPUT_LENGTH);
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

/// Clean up a display name: whitespace runs become single spaces and the
/// name is capped in length.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let mut cleaned = name.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_at_boundary(&mut cleaned, constants::MAX_USER_INPUT_LENGTH / 2);
    cleaned
}

/// Cap `s` at `max_bytes`, backing off to the last whole character.
fn truncate_at_boundary(s: &mut String, max_bytes: usize) {
    if s.len() <= max_bytes {
        return;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

/// Type alias for seat positions at the table.
pub type SeatIndex = usize;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Blinds {
    pub small: Chips,
    pub big: Chips,
}

impl fmt::Display for Blinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.small, self.big)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Waiting,
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
    Settled,
}

impl Phase {
    /// Whether players take betting actions in this phase.
    #[must_use]
    pub fn is_betting(&self) -> bool {
        matches!(self, Self::PreFlop | Self::Flop | Self::Turn | Self::River)
    }

    /// The street that follows this one, if any.
    #[must_use]
    pub fn next_street(&self) -> Option<Self> {
        match self {
            Self::PreFlop => Some(Self::Flop),
            Self::Flop => Some(Self::Turn),
            Self::Turn => Some(Self::River),
            Self::River => Some(Self::Showdown),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::PreFlop => "pre-flop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
            Self::Showdown => "showdown",
            Self::Settled => "settled",
        };
        write!(f, "{repr}")
    }
}

/// A betting action. `Raise` carries the increment above the amount
/// needed to call.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    AllIn,
    Call,
    Check,
    Fold,
    Raise(Chips),
}

impl Action {
    /// Build an action from a caller-supplied kind string, the way a
    /// transport layer receives it.
    pub fn from_kind(kind: &str, amount: Option<Chips>) -> Result<Self, UnknownAction> {
        match kind.to_ascii_lowercase().as_str() {
            "fold" => Ok(Self::Fold),
            "check" => Ok(Self::Check),
            "call" => Ok(Self::Call),
            "raise" => Ok(Self::Raise(amount.unwrap_or(0))),
            "allin" | "all-in" | "all_in" => Ok(Self::AllIn),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AllIn => write!(f, "goes all-in"),
            Self::Call => write!(f, "calls"),
            Self::Check => write!(f, "checks"),
            Self::Fold => write!(f, "folds"),
            Self::Raise(amount) => write!(f, "raises by {amount}"),
        }
    }
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_kind(s, None)
    }
}

/// An action a player may legally take right now, with the amounts the
/// client needs to render it.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionChoice {
    AllIn(Chips),
    Call(Chips),
    Check,
    Fold,
    Raise { min: Chips, max: Chips },
}

impl fmt::Display for ActionChoice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AllIn(amount) => write!(f, "all-in ({amount})"),
            Self::Call(amount) => write!(f, "call ({amount})"),
            Self::Check => write!(f, "check"),
            Self::Fold => write!(f, "fold"),
            Self::Raise { min, max } => write!(f, "raise ({min}..={max})"),
        }
    }
}

// Choices compare by variant only; amounts are informational.
impl Eq for ActionChoice {}

impl Hash for ActionChoice {
    fn hash<H: Hasher>(&self, state: &mut H) {
        discriminant(self).hash(state);
    }
}

impl PartialEq for ActionChoice {
    fn eq(&self, other: &Self) -> bool {
        discriminant(self) == discriminant(other)
    }
}

impl ActionChoice {
    /// Whether `action` is an instance of this choice.
    #[must_use]
    pub fn permits(&self, action: &Action) -> bool {
        matches!(
            (self, action),
            (Self::AllIn(_), Action::AllIn)
                | (Self::Call(_), Action::Call)
                | (Self::Check, Action::Check)
                | (Self::Fold, Action::Fold)
                | (Self::Raise { .. }, Action::Raise(_))
        )
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Active,
    Folded,
    AllIn,
    SittingOut,
}

impl PlayerStatus {
    /// Still contesting the pot (able to win at showdown).
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Active | Self::AllIn)
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Active => "active",
            Self::Folded => "folded",
            Self::AllIn => "all-in",
            Self::SittingOut => "sitting out",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub seat: SeatIndex,
    pub chips: Chips,
    /// Lifetime buy-in: the starting stack plus every rebuy.
    pub total_buy_in: Chips,
    pub hole_cards: Vec<Card>,
    /// Chips put in on the current street.
    pub street_bet: Chips,
    /// Chips put in since the hand began, across all streets.
    pub hand_bet: Chips,
    pub status: PlayerStatus,
    pub ready: bool,
    pub connected: bool,
}

impl Player {
    #[must_use]
    pub fn new(id: PlayerId, name: &str, seat: SeatIndex, stack: Chips) -> Self {
        Self {
            id,
            name: sanitize_name(name),
            seat,
            chips: stack,
            total_buy_in: stack,
            hole_cards: Vec::with_capacity(2),
            street_bet: 0,
            hand_bet: 0,
            status: PlayerStatus::Active,
            ready: false,
            connected: true,
        }
    }

    /// Clear per-hand state. Players without chips sit out.
    pub fn reset(&mut self) {
        self.hole_cards.clear();
        self.street_bet = 0;
        self.hand_bet = 0;
        self.status = if self.chips > 0 {
            PlayerStatus::Active
        } else {
            PlayerStatus::SittingOut
        };
    }

    /// Move up to `amount` chips from the stack into the current bet,
    /// returning what was actually committed. Empties the stack into an
    /// all-in when it can't cover the amount.
    pub fn commit(&mut self, amount: Chips) -> Chips {
        let paid = amount.min(self.chips);
        self.chips -= paid;
        self.street_bet += paid;
        self.hand_bet += paid;
        if self.chips == 0 && paid > 0 {
            self.status = PlayerStatus::AllIn;
        }
        paid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Identity;

    impl Shuffle for Identity {
        fn shuffle(&mut self, _cards: &mut [Card]) {}
    }

    #[test]
    fn test_deck_has_52_distinct_cards() {
        let mut deck = Deck::default();
        let mut cards = deck.deal_cards(52).unwrap();
        cards.sort();
        cards.dedup();
        assert_eq!(cards.len(), 52);
        assert_eq!(deck.remaining(), 0);
    }

    #[test]
    fn test_deck_exhaustion() {
        let mut deck = Deck::default();
        deck.deal_cards(52).unwrap();
        assert_eq!(deck.deal_card(), Err(DeckError::Exhausted));
        assert_eq!(deck.deal_cards(1), Err(DeckError::Exhausted));
    }

    #[test]
    fn test_deal_cards_does_not_partially_consume() {
        let mut deck = Deck::default();
        deck.deal_cards(50).unwrap();
        assert!(deck.deal_cards(3).is_err());
        assert_eq!(deck.remaining(), 2);
    }

    #[test]
    fn test_deck_reset_restores_all_cards() {
        let mut deck = Deck::default();
        deck.deal_cards(10).unwrap();
        deck.reset(&mut ThreadRngShuffle);
        assert_eq!(deck.deck_idx, 0);
        assert_eq!(deck.remaining(), 52);
    }

    #[test]
    fn test_deck_reset_with_identity_shuffle_is_ordered() {
        let mut deck = Deck::default();
        deck.reset(&mut Identity);
        assert_eq!(deck.deal_card(), Ok(Card(2, Suit::Heart)));
        assert_eq!(deck.deal_card(), Ok(Card(3, Suit::Heart)));
    }

    #[test]
    fn test_card_display() {
        assert_eq!(Card(14, Suit::Spade).to_string(), "A♠");
        assert_eq!(Card(10, Suit::Heart).to_string(), "10♥");
        assert_eq!(Card(11, Suit::Club).to_string(), "J♣");
    }

    #[test]
    fn test_action_from_kind() {
        assert_eq!(Action::from_kind("fold", None), Ok(Action::Fold));
        assert_eq!(Action::from_kind("RAISE", Some(40)), Ok(Action::Raise(40)));
        assert_eq!(Action::from_kind("allin", None), Ok(Action::AllIn));
        assert_eq!(
            Action::from_kind("bet", Some(5)),
            Err(UnknownAction("bet".to_string()))
        );
    }

    #[test]
    fn test_action_choice_permits() {
        assert!(ActionChoice::Call(10).permits(&Action::Call));
        assert!(ActionChoice::Raise { min: 20, max: 100 }.permits(&Action::Raise(5)));
        assert!(!ActionChoice::Check.permits(&Action::Call));
    }

    #[test]
    fn test_action_choice_equality_ignores_amounts() {
        assert_eq!(ActionChoice::Call(10), ActionChoice::Call(99));
        assert_ne!(ActionChoice::Call(10), ActionChoice::AllIn(10));
    }

    #[test]
    fn test_player_commit_caps_at_stack() {
        let mut player = Player::new(PlayerId::new("p"), "alice", 0, 50);
        assert_eq!(player.commit(80), 50);
        assert_eq!(player.chips, 0);
        assert_eq!(player.street_bet, 50);
        assert_eq!(player.hand_bet, 50);
        assert_eq!(player.status, PlayerStatus::AllIn);
    }

    #[test]
    fn test_player_reset_sits_out_when_broke() {
        let mut player = Player::new(PlayerId::new("p"), "alice", 0, 0);
        player.reset();
        assert_eq!(player.status, PlayerStatus::SittingOut);
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("  big   blind\tbob "), "big blind bob");
    }

    #[test]
    fn test_player_id_strips_control_characters() {
        assert_eq!(PlayerId::new("ab\0c\n").as_str(), "abc");
    }

    #[test]
    fn test_multibyte_input_is_cut_on_a_char_boundary() {
        // 11 three-byte characters, one byte over the name cap.
        let name = sanitize_name("张三李四王五赵六钱七孙");
        assert_eq!(name, "张三李四王五赵六钱七");
        assert!(name.len() <= constants::MAX_USER_INPUT_LENGTH / 2);

        let id = PlayerId::new(&"é".repeat(40));
        assert_eq!(id.as_str().chars().count(), 32);
        assert_eq!(PlayerId::new(&"a".repeat(70)).as_str().len(), 64);
    }

    #[test]
    fn test_phase_next_street() {
        assert_eq!(Phase::PreFlop.next_street(), Some(Phase::Flop));
        assert_eq!(Phase::River.next_street(), Some(Phase::Showdown));
        assert_eq!(Phase::Waiting.next_street(), None);
        assert!(Phase::Turn.is_betting());
        assert!(!Phase::Showdown.is_betting());
    }
}
