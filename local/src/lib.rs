use log::*;
use rand_mt::Mt64;

use engine::{BottomCardSource, GameState};
use players::Player;

/// Plays one hand of Durak to completion between two seats, reporting the
/// losing seat index. The construction/determinization/trump-reveal work
/// all happens inside `GameState::new`; this loop only has to alternate
/// `choose_action`/`execute_action` until `is_terminal`, since Durak's
/// termination condition is intrinsic to the rules engine rather than
/// driven by the caller.
pub fn run(
    player_name: &str,
    opponent_name: &str,
    player: &mut dyn Player,
    opponent: &mut dyn Player,
    rng: &mut Mt64,
    print_info: bool,
) -> usize {
    let mut state = GameState::new(
        vec![player_name.to_string(), opponent_name.to_string()],
        BottomCardSource::ComputerShuffle,
        player_name,
        print_info,
        rng,
    );

    let mut seats: [&mut dyn Player; 2] = [player, opponent];
    while !state.is_terminal {
        let turn = state.player_to_play;
        let action = seats[turn].choose_action(&mut state);
        debug!("{} plays {}", seats[turn].name(), action);
        state.execute_action(action);
    }

    state.loser.expect("terminal state must have a loser")
}