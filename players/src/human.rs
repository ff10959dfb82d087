use std::io::{self, Write};

use engine::{Action, GameState};
use rand_mt::Mt64;

use super::player::{bind_own_hand, seat_index, Player};

/// Drives decisions from stdin: prints the hand and the legal actions, then
/// reads an index. Legal actions are presented as one flat numbered list
/// rather than grouped by action type, so the prompt/parse loop stays a
/// single step regardless of how many action kinds are currently legal.
pub struct HumanPlayer {
    name: String,
    rng: Mt64,
}

impl HumanPlayer {
    pub fn new(name: impl Into<String>) -> Self {
        HumanPlayer {
            name: name.into(),
            rng: Mt64::new(0x42),
        }
    }

    fn prompt_index(&self, allowed: &[Action]) -> usize {
        loop {
            print!("{}> choose action index: ", self.name);
            io::stdout().flush().ok();
            let mut line = String::new();
            if io::stdin().read_line(&mut line).is_err() {
                continue;
            }
            match line.trim().parse::<usize>() {
                Ok(idx) if idx < allowed.len() => return idx,
                _ => println!("not a valid choice, try again"),
            }
        }
    }
}

impl Player for HumanPlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_action(&mut self, state: &mut GameState) -> Action {
        let seat = seat_index(state);
        if state.computer_shuffle {
            bind_own_hand(state, seat, &mut self.rng);
        }
        let allowed = state.allowed_plays();

        println!(
            "\n{} hand: {:?}",
            self.name,
            state.seats[seat]
                .hand
                .iter()
                .map(|&id| state.cards.display(id))
                .collect::<Vec<_>>()
        );
        for (i, wa) in allowed.iter().enumerate() {
            println!("  [{}] {}", i, wa.action);
        }

        let actions: Vec<Action> = allowed.into_iter().map(|wa| wa.action).collect();
        if actions.len() == 1 {
            return actions.into_iter().next().unwrap();
        }
        let idx = self.prompt_index(&actions);
        actions[idx].clone()
    }

    fn make_copy(&self) -> Box<dyn Player> {
        Box::new(HumanPlayer::new(self.name.clone()))
    }
}
