//! Random-but-plausible betting policy for simulated players.

use holdem_table::{
    Action, PlayerId, TableView,
    entities::{ActionChoice, Chips},
};
use rand::Rng;

/// A seated bot. `aggression` in `[0, 1]` scales how often it bets and
/// raises instead of checking, calling, or folding.
#[derive(Debug, Clone)]
pub struct Bot {
    pub id: PlayerId,
    pub name: String,
    pub aggression: f64,
}

impl Bot {
    pub fn new(table: usize, index: usize, aggression: f64) -> Self {
        let name = format!("bot-{}-{}", table + 1, index + 1);
        Self {
            id: PlayerId::new(&format!("{name}-conn")),
            name,
            aggression: aggression.clamp(0.0, 1.0),
        }
    }

    /// Pick one of the legal actions in `view`, or `None` if it isn't this
    /// bot's turn.
    pub fn choose<R: Rng>(&self, view: &TableView, rng: &mut R) -> Option<Action> {
        let choices = &view.legal_actions;
        if choices.is_empty() {
            return None;
        }

        let raise = choices.iter().find_map(|choice| match choice {
            ActionChoice::Raise { min, max } => Some((*min, *max)),
            _ => None,
        });
        let can_all_in = choices.contains(&ActionChoice::AllIn(0));
        let can_check = choices.contains(&ActionChoice::Check);

        // Rare shoves keep stacks moving so busts and rebuys happen.
        if can_all_in && rng.random_bool(self.aggression * 0.05) {
            return Some(Action::AllIn);
        }
        if let Some((min, max)) = raise {
            if rng.random_bool(self.aggression * 0.4) {
                return Some(Action::Raise(raise_size(min, max, view.pot, rng)));
            }
        }
        if can_check {
            return Some(Action::Check);
        }

        // Facing a bet: fold more often the bigger it is relative to the pot.
        let pressure = view.to_call as f64 / (view.pot.max(1) as f64);
        let fold_odds = ((1.0 - self.aggression) * pressure).clamp(0.0, 0.9);
        if rng.random_bool(fold_odds) {
            Some(Action::Fold)
        } else {
            Some(Action::Call)
        }
    }
}

/// Somewhere between the minimum raise and a pot-sized raise.
fn raise_size<R: Rng>(min: Chips, max: Chips, pot: Chips, rng: &mut R) -> Chips {
    let ceiling = pot.max(min).min(max);
    if ceiling <= min {
        min
    } else {
        rng.random_range(min..=ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdem_table::Table;
    use rand::{SeedableRng, rngs::StdRng};

    fn dealt_table() -> (Table, PlayerId) {
        let mut table = Table::default();
        for name in ["a", "b", "c"] {
            table.add_player(PlayerId::new(name), name).unwrap();
            table.set_ready(&PlayerId::new(name), true).unwrap();
        }
        table.start_hand().unwrap();
        let seat = table.current_seat().unwrap();
        let id = table.seat(seat).unwrap().id.clone();
        (table, id)
    }

    #[test]
    fn test_bot_only_picks_legal_actions() {
        let mut rng = StdRng::seed_from_u64(42);
        let (table, id) = dealt_table();
        let view = table.view(Some(&id));
        for aggression in [0.0, 0.5, 1.0] {
            let bot = Bot {
                id: id.clone(),
                name: "a".to_string(),
                aggression,
            };
            for _ in 0..200 {
                let action = bot.choose(&view, &mut rng).unwrap();
                assert!(
                    view.legal_actions.iter().any(|c| c.permits(&action)),
                    "{action:?} not in {:?}",
                    view.legal_actions
                );
                if let Action::Raise(amount) = action {
                    assert!(amount >= table.min_raise());
                }
            }
        }
    }

    #[test]
    fn test_bot_waits_for_its_turn() {
        let mut rng = StdRng::seed_from_u64(1);
        let (table, _) = dealt_table();
        let bot = Bot::new(0, 0, 0.5);
        assert_eq!(bot.choose(&table.view(None), &mut rng), None);
    }

    #[test]
    fn test_raise_size_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let size = raise_size(20, 500, 120, &mut rng);
            assert!((20..=120).contains(&size));
        }
        assert_eq!(raise_size(30, 30, 1000, &mut rng), 30);
        assert_eq!(raise_size(20, 980, 10, &mut rng), 20);
    }
}
