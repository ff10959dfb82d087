use engine::{Action, GameState};
use rand_mt::Mt64;

use super::{determinized_mcts, fpv_mcts, human, ismcts, random};

/// How a search variant scores a root action once rollouts are spent,
/// shared by all three MCTS players.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scoring {
    WinningPercentage,
    VisitCount,
}

/// The decision-making surface that varies per player variant. Hand
/// bookkeeping that is identical across variants (filling, binding,
/// discarding, `can_throw`) lives on `engine::Seat` instead -- this trait
/// only covers the two things that actually differ between variants:
/// `choose_action` and `make_copy`.
pub trait Player {
    fn name(&self) -> &str;

    /// Picks the action for `state.player_to_play`, which must be this
    /// player's own seat index. May bind Unknown cards in this player's own
    /// hand into `state` (the ground-truth state, not a copy) before
    /// deciding.
    fn choose_action(&mut self, state: &mut GameState) -> Action;

    fn make_copy(&self) -> Box<dyn Player>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerType {
    Random,
    Human,
    FpvMcts,
    DeterminizedMcts,
    Ismcts,
}

const PLAYER_TYPE_VARIANTS: [PlayerType; 5] = [
    PlayerType::Random,
    PlayerType::Human,
    PlayerType::FpvMcts,
    PlayerType::DeterminizedMcts,
    PlayerType::Ismcts,
];

impl clap::ArgEnum for PlayerType {
    fn value_variants<'a>() -> &'a [Self] {
        &PLAYER_TYPE_VARIANTS
    }

    fn to_possible_value<'a>(&self) -> Option<clap::PossibleValue<'a>> {
        let name = match self {
            PlayerType::Random => "random",
            PlayerType::Human => "human",
            PlayerType::FpvMcts => "fpv-mcts",
            PlayerType::DeterminizedMcts => "determinized-mcts",
            PlayerType::Ismcts => "ismcts",
        };
        Some(clap::PossibleValue::new(name))
    }
}

impl PlayerType {
    pub fn create_player(&self, name: impl Into<String>, seed: u64) -> Box<dyn Player> {
        let name = name.into();
        match self {
            PlayerType::Random => Box::new(random::RandomPlayer::new(name, seed)),
            PlayerType::Human => Box::new(human::HumanPlayer::new(name)),
            PlayerType::FpvMcts => Box::new(fpv_mcts::FpvMctsPlayer::new(name, seed)),
            PlayerType::DeterminizedMcts => {
                Box::new(determinized_mcts::DeterminizedMctsPlayer::new(name, seed))
            }
            PlayerType::Ismcts => Box::new(ismcts::IsmctsPlayer::new(name, seed)),
        }
    }
}

/// The seat this decision belongs to. Every variant looks this up before
/// binding its own hand or enumerating legal actions.
pub(crate) fn seat_index(state: &GameState) -> usize {
    state.player_to_play
}

pub(crate) fn bind_own_hand(state: &mut GameState, seat: usize, rng: &mut Mt64) {
    state.seats[seat].make_cards_known(&mut state.cards, rng);
}
