use engine::{Action, GameState};
use rand_mt::Mt64;

use super::determinized_mcts::{select_action, TreeNode};
use super::player::{bind_own_hand, seat_index, Player, Scoring};
use super::utils::{choose_weighted_action, perspective_view, random_playout_to_terminal, uct_score};

const DEFAULT_ROLLOUTS: usize = 2000;
const DEFAULT_EXPL_CONST: f64 = 0.7;

/// Full information-set MCTS: re-determinizes the acting player's hand at
/// *every* descent step (not once per deal), and restricts selection and
/// lazily-grown children to whatever that step's sampled determinization
/// allows.
fn iterate(node: &mut TreeNode, state: &GameState, expl_const: f64, rng: &mut Mt64) -> usize {
    node.n += 1;
    if state.is_terminal {
        return state.loser.expect("terminal state must have a loser");
    }

    if !node.is_explored {
        node.is_explored = true;
        for wa in state.allowed_plays() {
            node.children.entry_or_insert_with(wa.action, TreeNode::new);
        }

        let mut det = state.make_snapshot();
        let acting = det.player_to_play;
        let non_public = det.cards.non_public_identities();
        det.seats[acting].determinize_hand(&mut det.cards, &non_public, rng);
        let allowed = det.allowed_plays();
        let first_action = choose_weighted_action(&allowed, rng);

        let mut game = state.make_snapshot();
        game.execute_action(first_action);
        return random_playout_to_terminal(game, rng);
    }

    let mut det = state.make_snapshot();
    let acting = det.player_to_play;
    let non_public = det.cards.non_public_identities();
    det.seats[acting].determinize_hand(&mut det.cards, &non_public, rng);
    let allowed_actions: Vec<Action> =
        det.allowed_plays().into_iter().map(|wa| wa.action).collect();

    for action in &allowed_actions {
        node.children.entry_or_insert_with(action.clone(), TreeNode::new);
    }

    let action = select_restricted(node, &allowed_actions, expl_const);

    let mut child_state = state.make_snapshot();
    child_state.execute_action(action.clone());
    let acting_player = state.player_to_play;

    let child = node.children.get_mut(&action).unwrap();
    let loser = iterate(child, &child_state, expl_const, rng);

    let child = node.children.get_mut(&action).unwrap();
    if loser != acting_player {
        child.w += 1.0;
    }
    loser
}

/// Same preference as plain UCT (unexplored first, else best score), but
/// restricted to the actions this determinization currently allows.
fn select_restricted(node: &TreeNode, allowed: &[Action], expl_const: f64) -> Action {
    let unexplored = allowed.iter().find(|a| !node.children[*a].is_explored).cloned();
    match unexplored {
        Some(a) => a,
        None => {
            let parent_n = node.n;
            let mut best: Option<(Action, f64)> = None;
            for a in allowed.iter().filter(|a| node.children[*a].n > 0) {
                let c = &node.children[a];
                let score = uct_score(c.w, c.n, parent_n, expl_const);
                if best.as_ref().map(|(_, s)| score > *s).unwrap_or(true) {
                    best = Some((a.clone(), score));
                }
            }
            best.map(|(a, _)| a).unwrap_or_else(|| select_action(node, expl_const))
        }
    }
}

pub struct IsmctsPlayer {
    name: String,
    seed: u64,
    rng: Mt64,
    rollouts: usize,
    expl_const: f64,
    scoring: Scoring,
}

impl IsmctsPlayer {
    pub fn new(name: impl Into<String>, seed: u64) -> Self {
        IsmctsPlayer {
            name: name.into(),
            seed,
            rng: Mt64::new(seed),
            rollouts: DEFAULT_ROLLOUTS,
            expl_const: DEFAULT_EXPL_CONST,
            scoring: Scoring::WinningPercentage,
        }
    }
}

impl Player for IsmctsPlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_action(&mut self, state: &mut GameState) -> Action {
        let seat = seat_index(state);
        bind_own_hand(state, seat, &mut self.rng);
        let allowed = state.allowed_plays();
        if allowed.len() == 1 {
            return allowed.into_iter().next().unwrap().action;
        }

        let observer_view = perspective_view(state, seat);
        let mut root = TreeNode::new();
        for _ in 0..self.rollouts {
            iterate(&mut root, &observer_view, self.expl_const, &mut self.rng);
        }

        match self.scoring {
            Scoring::VisitCount => {
                let mut best: Option<(Action, u32)> = None;
                for (a, c) in root.children.iter() {
                    if best.as_ref().map(|(_, bn)| c.n > *bn).unwrap_or(true) {
                        best = Some((a.clone(), c.n));
                    }
                }
                best.expect("at least one action rated").0
            }
            Scoring::WinningPercentage => {
                let mut best: Option<(Action, f64)> = None;
                for (a, c) in root.children.iter().filter(|(_, c)| c.n > 0) {
                    let rate = c.w / c.n as f64;
                    if best.as_ref().map(|(_, br)| rate > *br).unwrap_or(true) {
                        best = Some((a.clone(), rate));
                    }
                }
                best.expect("at least one action rated").0
            }
        }
    }

    fn make_copy(&self) -> Box<dyn Player> {
        Box::new(IsmctsPlayer::new(self.name.clone(), self.seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::BottomCardSource;

    #[test]
    fn choose_action_returns_a_legal_action() {
        let mut state = GameState::new(
            vec!["A".into(), "B".into()],
            BottomCardSource::ComputerShuffle,
            "A",
            false,
            &mut Mt64::new(0x42),
        );
        let mut player = IsmctsPlayer::new("A", 0x1);
        player.rollouts = 25;
        let legal: Vec<Action> = state
            .allowed_plays()
            .into_iter()
            .map(|wa| wa.action)
            .collect();
        let chosen = player.choose_action(&mut state);
        assert!(legal.contains(&chosen));
    }

    #[test]
    fn select_restricted_only_picks_among_allowed_actions() {
        let mut state = GameState::new(
            vec!["A".into(), "B".into()],
            BottomCardSource::ComputerShuffle,
            "A",
            false,
            &mut Mt64::new(0x9),
        );
        let seat = seat_index(&state);
        bind_own_hand(&mut state, seat, &mut Mt64::new(0x2));
        let allowed: Vec<Action> = state
            .allowed_plays()
            .into_iter()
            .map(|wa| wa.action)
            .collect();

        let mut node = TreeNode::new();
        for a in &allowed {
            node.children.entry_or_insert_with(a.clone(), TreeNode::new);
        }
        let picked = select_restricted(&node, &allowed, DEFAULT_EXPL_CONST);
        assert!(allowed.contains(&picked));
    }
}
