use engine::{Action, GameState};
use rand_mt::Mt64;

use super::player::{bind_own_hand, seat_index, Player};
use super::utils::choose_weighted_action;

/// Picks uniformly among legal actions, weighted the same way a random
/// rollout is.
pub struct RandomPlayer {
    name: String,
    seed: u64,
    rng: Mt64,
}

impl RandomPlayer {
    pub fn new(name: impl Into<String>, seed: u64) -> Self {
        RandomPlayer {
            name: name.into(),
            seed,
            rng: Mt64::new(seed),
        }
    }
}

impl Player for RandomPlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_action(&mut self, state: &mut GameState) -> Action {
        let seat = seat_index(state);
        bind_own_hand(state, seat, &mut self.rng);
        let allowed = state.allowed_plays();
        choose_weighted_action(&allowed, &mut self.rng)
    }

    fn make_copy(&self) -> Box<dyn Player> {
        Box::new(RandomPlayer::new(self.name.clone(), self.seed))
    }
}
