use std::collections::HashSet;

use engine::{Action, CardId, GameState, WeightedAction, DECK_SIZE};
use rand::Rng;
use rand_mt::Mt64;

/// Chooses one action with probability proportional to its `weight`. When
/// every candidate carries the default weight of `1.0` (every phase except
/// Defend) this degenerates to a uniform pick.
pub fn choose_weighted_action(actions: &[WeightedAction], rng: &mut Mt64) -> Action {
    let total: f64 = actions.iter().map(|a| a.weight).sum();
    let mut roll = rng.gen::<f64>() * total;
    for candidate in actions {
        if roll < candidate.weight {
            return candidate.action.clone();
        }
        roll -= candidate.weight;
    }
    actions.last().expect("allowed_plays never empty").action.clone()
}

/// Upper Confidence Bound for Trees: `W/N + c*sqrt(ln(parent.N))/sqrt(N)`.
pub fn uct_score(w: f64, n: u32, parent_n: u32, expl_const: f64) -> f64 {
    w / n as f64 + expl_const * (parent_n as f64).ln().sqrt() / (n as f64).sqrt()
}

/// Plays uniform-random legal actions from `state` until termination,
/// returning the losing seat. Shared by every search variant's simulation
/// phase.
pub fn random_playout_to_terminal(mut state: GameState, rng: &mut Mt64) -> usize {
    while !state.is_terminal {
        let allowed = state.allowed_plays();
        let action = choose_weighted_action(&allowed, rng);
        state.execute_action(action);
    }
    state.loser.expect("terminal state must have a loser")
}

/// A first-person snapshot: every Private card not held by `perspective`
/// is reset to Unknown, so the returned state carries no information the
/// real player could not see. Used identically by all three MCTS player
/// variants before they search.
pub fn perspective_view(state: &GameState, perspective: usize) -> GameState {
    let mut view = state.make_snapshot();
    let my_hand: HashSet<CardId> = view.seats[perspective].hand.iter().copied().collect();
    for id in 0..DECK_SIZE {
        if view.cards.is_private(id) && !my_hand.contains(&id) {
            view.cards.reset(id);
        }
    }
    view
}

/// A map from `Action` to `V` that iterates in insertion order instead of
/// `HashMap`'s per-process-randomized order. Every search variant expands
/// children from `allowed_plays()` and later re-selects among them by
/// "first unexplored, else best score" -- with a randomized iteration order
/// that selection is not a pure function of the random stream consumed, so
/// the same seed can return different actions between runs. Child counts
/// are bounded by one decision's legal-action count, so the linear lookup
/// costs nothing material; determinism is the only thing this buys over
/// `HashMap`.
#[derive(Debug, Clone)]
pub(crate) struct ActionMap<V> {
    entries: Vec<(Action, V)>,
}

impl<V> ActionMap<V> {
    pub(crate) fn new() -> Self {
        ActionMap { entries: Vec::new() }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entry_or_insert_with(&mut self, action: Action, default: impl FnOnce() -> V) -> &mut V {
        if let Some(idx) = self.entries.iter().position(|(a, _)| *a == action) {
            &mut self.entries[idx].1
        } else {
            self.entries.push((action, default()));
            let last = self.entries.len() - 1;
            &mut self.entries[last].1
        }
    }

    pub(crate) fn get_mut(&mut self, action: &Action) -> Option<&mut V> {
        self.entries.iter_mut().find(|(a, _)| a == action).map(|(_, v)| v)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Action, &V)> {
        self.entries.iter().map(|(a, v)| (a, v))
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &Action> {
        self.entries.iter().map(|(a, _)| a)
    }
}

impl<V> IntoIterator for ActionMap<V> {
    type Item = (Action, V);
    type IntoIter = std::vec::IntoIter<(Action, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, V> IntoIterator for &'a ActionMap<V> {
    type Item = (&'a Action, &'a V);
    type IntoIter = std::iter::Map<std::slice::Iter<'a, (Action, V)>, fn(&'a (Action, V)) -> (&'a Action, &'a V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter().map(|(a, v)| (a, v))
    }
}

impl<V> std::ops::Index<&Action> for ActionMap<V> {
    type Output = V;

    fn index(&self, action: &Action) -> &V {
        self.entries
            .iter()
            .find(|(a, _)| a == action)
            .map(|(_, v)| v)
            .expect("action not present in map")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{BottomCardSource, CurrentAction, Suit, Value};

    #[test]
    fn defend_enumeration_always_offers_take_with_half_weight() {
        let mut state = GameState::new(
            vec!["A".into(), "B".into()],
            BottomCardSource::Fixed((Suit::Hearts, Value::Seven)),
            "A",
            false,
            &mut Mt64::new(0x42),
        );
        state.cards.bind(state.seats[0].hand[0], (Suit::Spades, Value::Six));
        state.execute_action(Action::Attack((Suit::Spades, Value::Six)));
        assert_eq!(state.current_action, CurrentAction::Defend);

        let allowed = state.allowed_plays();
        assert!(!allowed.is_empty());
        // Every hand card contributes its defend/reflect weight split evenly
        // among its own options, so no single candidate can be non-positive;
        // `Take` is always offered at a flat 1/2.
        let takes: Vec<&WeightedAction> = allowed
            .iter()
            .filter(|wa| wa.action == Action::Take)
            .collect();
        assert_eq!(takes.len(), 1);
        assert!((takes[0].weight - 0.5).abs() < 1e-9);
        assert!(allowed.iter().all(|wa| wa.weight > 0.0));
    }

    #[test]
    fn choose_weighted_action_always_returns_an_allowed_action() {
        let mut state = GameState::new(
            vec!["A".into(), "B".into()],
            BottomCardSource::Fixed((Suit::Clubs, Value::King)),
            "A",
            false,
            &mut Mt64::new(0x1),
        );
        state.seats[0].make_cards_known(&mut state.cards, &mut Mt64::new(0x2));
        let allowed = state.allowed_plays();
        let mut rng = Mt64::new(0x3);
        for _ in 0..20 {
            let action = choose_weighted_action(&allowed, &mut rng);
            assert!(allowed.iter().any(|wa| wa.action == action));
        }
    }
}
