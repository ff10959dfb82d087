mod determinized_mcts;
mod fpv_mcts;
mod human;
mod ismcts;
mod player;
mod random;
mod utils;

pub use determinized_mcts::DeterminizedMctsPlayer;
pub use fpv_mcts::FpvMctsPlayer;
pub use human::HumanPlayer;
pub use ismcts::IsmctsPlayer;
pub use player::{Player, PlayerType, Scoring};
pub use random::RandomPlayer;
