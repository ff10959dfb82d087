use std::collections::HashMap;

use engine::{Action, GameState};
use rand::Rng;
use rand_mt::Mt64;

use super::player::{bind_own_hand, seat_index, Player, Scoring};
use super::utils::{
    choose_weighted_action, perspective_view, random_playout_to_terminal, uct_score, ActionMap,
};

const DEFAULT_ROLLOUTS: usize = 500;
const DEFAULT_EXPL_CONST: f64 = 0.7;

struct EndNode {
    w: f64,
    n: u32,
    is_explored: bool,
}

impl EndNode {
    fn new() -> Self {
        EndNode {
            w: 0.0,
            n: 0,
            is_explored: false,
        }
    }
}

/// A decision point for the perspective player: a `GameState` plus one
/// `EndNode` per legal action, where the edge's transition absorbs every
/// intervening opponent move. Looked up by `history_hash` so two descents
/// landing on the same information set merge into one node.
struct ChooseNode {
    state: GameState,
    is_terminal: bool,
    is_explored: bool,
    w: f64,
    n: u32,
    children: ActionMap<EndNode>,
}

impl ChooseNode {
    fn new(state: GameState) -> Self {
        let is_terminal = state.is_terminal;
        ChooseNode {
            state,
            is_terminal,
            is_explored: false,
            w: 0.0,
            n: 0,
            children: ActionMap::new(),
        }
    }
}

enum PathStep {
    Choose(u64),
    End(u64, Action),
}

/// Player-view-only ISMCTS: nodes exist only at the perspective player's own
/// decision points, with opponent turns played out randomly in between.
pub struct FpvMctsPlayer {
    name: String,
    seed: u64,
    rng: Mt64,
    rollouts: usize,
    expl_const: f64,
    scoring: Scoring,
    nodes: HashMap<u64, ChooseNode>,
    root_hash: u64,
}

impl FpvMctsPlayer {
    pub fn new(name: impl Into<String>, seed: u64) -> Self {
        FpvMctsPlayer {
            name: name.into(),
            seed,
            rng: Mt64::new(seed),
            rollouts: DEFAULT_ROLLOUTS,
            expl_const: DEFAULT_EXPL_CONST,
            scoring: Scoring::WinningPercentage,
            nodes: HashMap::new(),
            root_hash: 0,
        }
    }

    fn select(&mut self) -> (Vec<PathStep>, u64) {
        let mut path = Vec::new();
        let mut current = self.root_hash;
        let perspective = self.nodes[&current].state.player_to_play;
        loop {
            path.push(PathStep::Choose(current));
            let stop = {
                let node = &self.nodes[&current];
                !node.is_explored || node.is_terminal
            };
            if stop {
                return (path, current);
            }

            let chosen_action = {
                let node = self.nodes.get_mut(&current).unwrap();
                let unexplored = node
                    .children
                    .iter()
                    .find(|(_, end)| !end.is_explored)
                    .map(|(a, _)| a.clone());
                match unexplored {
                    Some(action) => {
                        node.children.get_mut(&action).unwrap().is_explored = true;
                        action
                    }
                    None => {
                        let parent_n = node.n;
                        let mut best: Option<(Action, f64)> = None;
                        for (a, e) in node.children.iter().filter(|(_, e)| e.n > 0) {
                            let score = uct_score(e.w, e.n, parent_n, self.expl_const);
                            if best.as_ref().map(|(_, s)| score > *s).unwrap_or(true) {
                                best = Some((a.clone(), score));
                            }
                        }
                        best.map(|(a, _)| a).expect("at least one explored child")
                    }
                }
            };
            path.push(PathStep::End(current, chosen_action.clone()));

            let mut game = self.nodes[&current].state.make_snapshot();
            game.execute_action(chosen_action);
            while !game.is_terminal && game.player_to_play != perspective {
                let allowed = game.allowed_plays();
                let action = choose_weighted_action(&allowed, &mut self.rng);
                game.execute_action(action);
            }
            let next_hash = game.history_hash();
            if self.nodes.contains_key(&next_hash) {
                current = next_hash;
            } else {
                self.nodes.insert(next_hash, ChooseNode::new(game));
                path.push(PathStep::Choose(next_hash));
                return (path, next_hash);
            }
        }
    }

    fn expand(&mut self, hash: u64) {
        let node = self.nodes.get_mut(&hash).unwrap();
        if node.is_terminal {
            return;
        }
        for wa in node.state.allowed_plays() {
            node.children.entry_or_insert_with(wa.action, EndNode::new);
        }
        node.is_explored = true;
    }

    fn simulate(&mut self, hash: u64) -> usize {
        let node = &self.nodes[&hash];
        if node.is_terminal {
            return node.state.loser.expect("terminal node must have a loser");
        }
        let keys: Vec<Action> = node.children.keys().cloned().collect();
        let action = keys[self.rng.gen_range(0..keys.len())].clone();
        let mut game = node.state.make_snapshot();
        game.execute_action(action);
        random_playout_to_terminal(game, &mut self.rng)
    }

    /// Every node on the path -- Choose nodes and End nodes alike -- gets
    /// N+=1, and W+=1 iff the perspective player did not lose.
    fn backpropagate(&mut self, path: &[PathStep], loser: usize) {
        let perspective = self.nodes[&self.root_hash].state.player_to_play;
        for step in path.iter().rev() {
            match step {
                PathStep::Choose(hash) => {
                    let node = self.nodes.get_mut(hash).unwrap();
                    node.n += 1;
                    if loser != perspective {
                        node.w += 1.0;
                    }
                }
                PathStep::End(hash, action) => {
                    let node = self.nodes.get_mut(hash).unwrap();
                    let end = node.children.get_mut(action).unwrap();
                    end.n += 1;
                    if loser != perspective {
                        end.w += 1.0;
                    }
                }
            }
        }
    }
}

impl Player for FpvMctsPlayer {
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
        self.nodes.clear();
        self.root_hash = observer_view.history_hash();
        self.nodes
            .insert(self.root_hash, ChooseNode::new(observer_view));

        for _ in 0..self.rollouts {
            let (path, leaf_hash) = self.select();
            self.expand(leaf_hash);
            let loser = self.simulate(leaf_hash);
            self.backpropagate(&path, loser);
        }

        let root = &self.nodes[&self.root_hash];
        let mut best: Option<(Action, f64)> = None;
        for (action, end) in &root.children {
            if end.n == 0 {
                continue;
            }
            let score = match self.scoring {
                Scoring::WinningPercentage => end.w / end.n as f64,
                Scoring::VisitCount => end.n as f64,
            };
            if best.as_ref().map(|(_, s)| score > *s).unwrap_or(true) {
                best = Some((action.clone(), score));
            }
        }
        self.nodes.clear();
        best.expect("at least one root child visited").0
    }

    fn make_copy(&self) -> Box<dyn Player> {
        Box::new(FpvMctsPlayer::new(self.name.clone(), self.seed))
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
        let mut player = FpvMctsPlayer::new("A", 0x1);
        player.rollouts = 30;
        let legal: Vec<Action> = state
            .allowed_plays()
            .into_iter()
            .map(|wa| wa.action)
            .collect();
        let chosen = player.choose_action(&mut state);
        assert!(legal.contains(&chosen));
    }

    #[test]
    fn root_node_merges_transpositions_by_history_hash() {
        let state = GameState::new(
            vec!["A".into(), "B".into()],
            BottomCardSource::ComputerShuffle,
            "A",
            false,
            &mut Mt64::new(0x7),
        );
        let hash_a = state.history_hash();
        let hash_b = state.make_snapshot().history_hash();
        assert_eq!(hash_a, hash_b);
    }
}
