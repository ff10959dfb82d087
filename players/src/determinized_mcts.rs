use engine::{Action, CardCollection, DECK_SIZE};
use engine::{GameState, Identity};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_mt::Mt64;

use super::player::{bind_own_hand, seat_index, Player, Scoring};
use super::utils::{perspective_view, random_playout_to_terminal, uct_score, ActionMap};

const DEFAULT_DEALS: usize = 20;
const DEFAULT_ROLLOUTS: usize = 100;
const DEFAULT_EXPL_CONST: f64 = 0.7;

/// A node in a perfect-information game tree: owns its children directly
/// (no parent pointer, no shared arena), so backpropagation happens as the
/// recursive descent unwinds rather than by walking stored parent links.
pub(crate) struct TreeNode {
    pub(crate) is_explored: bool,
    pub(crate) w: f64,
    pub(crate) n: u32,
    pub(crate) children: ActionMap<TreeNode>,
}

impl TreeNode {
    pub(crate) fn new() -> Self {
        TreeNode {
            is_explored: false,
            w: 0.0,
            n: 0,
            children: ActionMap::new(),
        }
    }
}

/// One MCTS rollout from `node`/`state`. Every node visited (including
/// `node` itself) gets `n += 1`; the edge just descended gets `w += 1` iff
/// the loser is not the player who chose it. This bookkeeping is the same a
/// parent-pointer walk would apply, just folded into the call stack instead.
pub(crate) fn iterate(
    node: &mut TreeNode,
    state: &GameState,
    expl_const: f64,
    rng: &mut Mt64,
) -> usize {
    node.n += 1;
    if state.is_terminal {
        return state.loser.expect("terminal state must have a loser");
    }

    if !node.is_explored {
        node.is_explored = true;
        for wa in state.allowed_plays() {
            node.children.entry_or_insert_with(wa.action, TreeNode::new);
        }
        let keys: Vec<Action> = node.children.keys().cloned().collect();
        let action = keys[rng.gen_range(0..keys.len())].clone();
        let mut game = state.make_snapshot();
        game.execute_action(action);
        return random_playout_to_terminal(game, rng);
    }

    let action = select_action(node, expl_const);
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

pub(crate) fn select_action(node: &TreeNode, expl_const: f64) -> Action {
    let unexplored = node
        .children
        .iter()
        .find(|(_, c)| !c.is_explored)
        .map(|(a, _)| a.clone());
    match unexplored {
        Some(a) => a,
        None => {
            let parent_n = node.n;
            let mut best: Option<(Action, f64)> = None;
            for (a, c) in node.children.iter().filter(|(_, c)| c.n > 0) {
                let score = uct_score(c.w, c.n, parent_n, expl_const);
                if best.as_ref().map(|(_, s)| score > *s).unwrap_or(true) {
                    best = Some((a.clone(), score));
                }
            }
            best.map(|(a, _)| a)
                .expect("at least one explored child to uct-select")
        }
    }
}

/// Re-determinizes the perspective player's whole hidden hand once per
/// outer deal, then runs standard perfect-information MCTS against that
/// single sampled world.
pub struct DeterminizedMctsPlayer {
    name: String,
    seed: u64,
    rng: Mt64,
    deals: usize,
    rollouts: usize,
    expl_const: f64,
    scoring: Scoring,
}

impl DeterminizedMctsPlayer {
    pub fn new(name: impl Into<String>, seed: u64) -> Self {
        DeterminizedMctsPlayer {
            name: name.into(),
            seed,
            rng: Mt64::new(seed),
            deals: DEFAULT_DEALS,
            rollouts: DEFAULT_ROLLOUTS,
            expl_const: DEFAULT_EXPL_CONST,
            scoring: Scoring::WinningPercentage,
        }
    }
}

/// Samples one full determinization: this seat's own hand becomes Public
/// (it is already bound), and every remaining Unknown/Private card across
/// the whole arena -- other hands, the deck, whatever is left -- is bound
/// to a uniformly shuffled draw from the non-public pool and made Public
/// too.
pub(crate) fn random_deal(state: &mut GameState, seat: usize, rng: &mut Mt64) {
    let own_hand = state.seats[seat].hand.clone();
    for id in own_hand {
        state.cards.mark_public(id);
    }
    let mut pool: Vec<Identity> = state.cards.non_public_identities().into_iter().collect();
    pool.shuffle(rng);
    bind_remaining(&mut state.cards, &mut pool);
}

fn bind_remaining(cards: &mut CardCollection, pool: &mut Vec<Identity>) {
    for id in 0..DECK_SIZE {
        if cards.is_unknown(id) {
            let identity = pool.pop().expect("enough identities for every unbound card");
            cards.bind(id, identity);
            cards.mark_public(id);
        } else if cards.is_private(id) {
            let identity = pool.pop().expect("enough identities for every unbound card");
            cards.reset(id);
            cards.bind(id, identity);
            cards.mark_public(id);
        }
    }
}

impl Player for DeterminizedMctsPlayer {
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
        let mut totals: ActionMap<(f64, u32)> = ActionMap::new();
        for _ in 0..self.deals {
            let mut deal = observer_view.make_snapshot();
            random_deal(&mut deal, seat, &mut self.rng);

            let mut root = TreeNode::new();
            for _ in 0..self.rollouts {
                iterate(&mut root, &deal, self.expl_const, &mut self.rng);
            }
            for (action, child) in root.children {
                let entry = totals.entry_or_insert_with(action, || (0.0, 0));
                entry.0 += child.w;
                entry.1 += child.n;
            }
        }

        match self.scoring {
            Scoring::VisitCount => {
                let mut best: Option<(Action, u32)> = None;
                for (a, (_, n)) in totals.iter() {
                    if best.as_ref().map(|(_, bn)| n > bn).unwrap_or(true) {
                        best = Some((a.clone(), *n));
                    }
                }
                best.expect("at least one action rated").0
            }
            Scoring::WinningPercentage => {
                let mut best: Option<(Action, f64)> = None;
                for (a, (w, n)) in totals.iter().filter(|(_, (_, n))| *n > 0) {
                    let rate = w / *n as f64;
                    if best.as_ref().map(|(_, br)| rate > *br).unwrap_or(true) {
                        best = Some((a.clone(), rate));
                    }
                }
                best.expect("at least one action rated").0
            }
        }
    }

    fn make_copy(&self) -> Box<dyn Player> {
        Box::new(DeterminizedMctsPlayer::new(self.name.clone(), self.seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::BottomCardSource;

    fn new_state() -> GameState {
        GameState::new(
            vec!["A".into(), "B".into()],
            BottomCardSource::ComputerShuffle,
            "A",
            false,
            &mut Mt64::new(0x42),
        )
    }

    #[test]
    fn root_expands_every_legal_action_on_first_rollout() {
        let mut state = new_state();
        let seat = seat_index(&state);
        bind_own_hand(&mut state, seat, &mut Mt64::new(0x1));
        let legal_count = state.allowed_plays().len();

        let mut root = TreeNode::new();
        let mut rng = Mt64::new(0x7);
        iterate(&mut root, &state, DEFAULT_EXPL_CONST, &mut rng);
        assert!(root.is_explored);
        assert_eq!(root.children.len(), legal_count);
        assert_eq!(root.n, 1);

        // Further rollouts keep selecting among the same children, never
        // growing the root's child set.
        for _ in 0..20 {
            iterate(&mut root, &state, DEFAULT_EXPL_CONST, &mut rng);
        }
        assert_eq!(root.children.len(), legal_count);
        assert_eq!(root.n, 21);
    }

    #[test]
    fn choose_action_returns_a_legal_action() {
        let mut state = new_state();
        let mut player = DeterminizedMctsPlayer::new("A", 0x42);
        player.deals = 2;
        player.rollouts = 10;
        let legal: Vec<Action> = state
            .allowed_plays()
            .into_iter()
            .map(|wa| wa.action)
            .collect();
        let chosen = player.choose_action(&mut state);
        assert!(legal.contains(&chosen));
    }
}
