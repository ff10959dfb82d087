use std::collections::{HashSet, VecDeque};
use std::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;

use itertools::Itertools;
use log::info;
use more_asserts::{assert_ge, assert_le};
use rand::Rng;

use crate::action::{Action, WeightedAction};
use crate::card::{all_identities, CardCollection, CardId, Identity, Value, DECK_SIZE};
use crate::seat::Seat;

/// How the bottom (trump-revealing) card is chosen at construction.
/// `ComputerShuffle` samples it uniformly; `Fixed` is the hook an external
/// collaborator (a human dealer, a test) uses to pin the draw instead of
/// soliciting it interactively -- interactive solicitation is out of the
/// core's scope.
#[derive(Debug, Clone, Copy)]
pub enum BottomCardSource {
    ComputerShuffle,
    Fixed(Identity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentAction {
    Attack,
    Defend,
    ThrowCards,
}

/// The rules engine: deck, seating, the active trick, and history. Built
/// around stable card-arena indices (`CardId`) instead of object identity,
/// so a clone never has to chase pointers to stay consistent.
#[derive(Debug, Clone)]
pub struct GameState {
    pub cards: CardCollection,
    pub deck: VecDeque<CardId>,
    pub seats: Vec<Seat>,
    pub computer_shuffle: bool,
    pub print_info: bool,

    pub attackers: Vec<usize>,
    pub defender: Option<usize>,
    pub current_attacker: usize,
    pub player_to_play: usize,
    pub pairs_finished: Vec<(CardId, CardId)>,
    pub cards_to_defend: VecDeque<CardId>,
    pub draw_order: Vec<usize>,
    pub reflected_trumps: HashSet<Identity>,
    pub attacker_to_start_throwing: Option<usize>,
    pub last_played_attacker: Option<usize>,
    pub current_action: CurrentAction,
    pub history: Vec<Action>,
    pub is_terminal: bool,
    pub loser: Option<usize>,
}

impl GameState {
    pub fn new(
        seat_names: Vec<String>,
        bottom: BottomCardSource,
        main_attacker: &str,
        print_info: bool,
        rng: &mut impl Rng,
    ) -> Self {
        assert_ge!(seat_names.len(), 2, "durak needs at least 2 players");
        assert_le!(seat_names.len(), 6, "durak supports at most 6 players");

        loop {
            let mut cards = CardCollection::new();
            let mut deck: VecDeque<CardId> = (0..DECK_SIZE).collect();
            let bottom_id = *deck.back().unwrap();

            let identity = match bottom {
                BottomCardSource::ComputerShuffle => {
                    let mut pool: Vec<Identity> = all_identities().into_iter().collect();
                    pool.remove(rng.gen_range(0..pool.len()))
                }
                BottomCardSource::Fixed(identity) => identity,
            };
            cards.bind(bottom_id, identity);
            cards.mark_public(bottom_id);
            cards.set_trump_suit(identity.0);

            if identity.1 == Value::Ace {
                if print_info {
                    info!("There was an ace on the bottom, redealing...");
                }
                continue;
            }
            if print_info {
                info!("The bottom card is {}{}", identity.0, identity.1);
            }

            let mut seats: Vec<Seat> = seat_names.iter().map(Seat::new).collect();
            for seat in seats.iter_mut() {
                seat.fill_hand(&mut deck);
            }

            let main_idx = seats
                .iter()
                .position(|s| s.name == main_attacker)
                .expect("unknown player name at trick open");

            let mut state = GameState {
                cards,
                deck,
                seats,
                computer_shuffle: matches!(bottom, BottomCardSource::ComputerShuffle),
                print_info,
                attackers: Vec::new(),
                defender: None,
                current_attacker: 0,
                player_to_play: 0,
                pairs_finished: Vec::new(),
                cards_to_defend: VecDeque::new(),
                draw_order: Vec::new(),
                reflected_trumps: HashSet::new(),
                attacker_to_start_throwing: None,
                last_played_attacker: None,
                current_action: CurrentAction::Attack,
                history: Vec::new(),
                is_terminal: false,
                loser: None,
            };
            state.new_trick(main_idx);
            return state;
        }
    }

    /// A functionally independent copy. Because card identity here is a
    /// stable arena index rather than an object address, a snapshot is just
    /// a value clone -- no identity-remap table is needed.
    pub fn make_snapshot(&self) -> GameState {
        let mut snapshot = self.clone();
        snapshot.print_info = false;
        snapshot
    }

    /// Identifies this state via a stable hash of its action history, used
    /// by FPV-ISMCTS to recognize when two descent paths land on the same
    /// perspective-player decision point.
    pub fn history_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.history.hash(&mut hasher);
        hasher.finish()
    }

    fn new_trick(&mut self, main_attacker: usize) {
        let people = self.seats.len();
        let deck_nonempty = !self.deck.is_empty();
        let mut living: Vec<usize> = Vec::new();
        for i in 0..people {
            let idx = (main_attacker + i) % people;
            if deck_nonempty || !self.seats[idx].hand.is_empty() {
                living.push(idx);
            }
        }

        if living.is_empty() {
            self.is_terminal = true;
            self.loser = self.defender;
        } else if living.len() == 1 {
            self.is_terminal = true;
            self.loser = Some(living[0]);
        } else {
            let defender = living.remove(1);
            self.defender = Some(defender);
            self.current_attacker = 0;
            self.player_to_play = living[0];
            self.draw_order = living.clone();
            self.draw_order.push(defender);
            self.attackers = living;
            self.attacker_to_start_throwing = None;
            self.last_played_attacker = None;
            self.reflected_trumps.clear();
        }

        self.current_action = CurrentAction::Attack;
        self.pairs_finished.clear();
        self.cards_to_defend.clear();
    }

    /// Enumerates every legal action from `player_to_play`'s turn, tagged
    /// with the exploration weight random rollouts should use. Fatal if no
    /// action can be produced -- that is always a rules engine bug, never a
    /// reachable game state.
    pub fn allowed_plays(&self) -> Vec<WeightedAction> {
        assert!(!self.is_terminal, "allowed_plays called on a terminal state");
        let actions = match self.current_action {
            CurrentAction::Attack => self.allowed_attacks(),
            CurrentAction::Defend => self.allowed_defends(),
            CurrentAction::ThrowCards => self.allowed_throws(),
        };
        assert!(!actions.is_empty(), "No choice of actions");
        actions
    }

    fn allowed_attacks(&self) -> Vec<WeightedAction> {
        let attacker = self.attackers[self.current_attacker];
        assert_eq!(attacker, self.player_to_play);

        let non_public = self.cards.non_public_identities();
        let mut poss_plays = self.seats[attacker].possible_card_plays(&self.cards, &non_public);

        let mut actions = Vec::new();
        if !self.pairs_finished.is_empty() {
            actions.push(WeightedAction::unweighted(Action::PassAttack));
            let values_on_table = self.values_on_table_from_pairs();
            poss_plays.retain(|(_, v)| values_on_table.contains(v));
        }

        let defender = self.defender.expect("attack phase without a defender");
        if !self.seats[defender].hand.is_empty() {
            for identity in poss_plays {
                actions.push(WeightedAction::unweighted(Action::Attack(identity)));
            }
        }
        actions
    }

    fn values_on_table_from_pairs(&self) -> HashSet<Value> {
        let mut values = HashSet::new();
        for &(attack, defend) in &self.pairs_finished {
            if let Some((_, v)) = self.cards.identity(attack) {
                values.insert(v);
            }
            if let Some((_, v)) = self.cards.identity(defend) {
                values.insert(v);
            }
        }
        values
    }

    fn allowed_defends(&self) -> Vec<WeightedAction> {
        let to_defend = self.cards_to_defend[0];
        let (to_defend_suit, to_defend_value) =
            self.cards.identity(to_defend).expect("defended card must be bound");
        let to_defend_is_trump = self.cards.is_trump(to_defend);
        let trump_suit = self.cards.trump_suit();
        let non_public = self.cards.non_public_identities();

        let player = self.player_to_play;
        let mut play_options: std::collections::HashMap<Action, f64> = std::collections::HashMap::new();

        let known_identities: HashSet<Identity> = self.seats[player]
            .hand
            .iter()
            .filter(|&&id| !self.cards.is_unknown(id))
            .filter_map(|&id| self.cards.identity(id))
            .collect();

        for &card_id in &self.seats[player].hand {
            let identities: Vec<Identity> = if self.cards.is_unknown(card_id) {
                non_public.difference(&known_identities).copied().collect()
            } else {
                vec![self.cards.identity(card_id).expect("bound card")]
            };

            let mut reflect = Vec::new();
            let mut defend = Vec::new();
            for (s, v) in identities {
                if self.pairs_finished.is_empty() {
                    let new_defender = self.attackers[1 % self.attackers.len()];
                    let max_new_piles = self.seats[new_defender].hand.len() as i64
                        - self.cards_to_defend.len() as i64;
                    if max_new_piles >= 1 && v == to_defend_value {
                        reflect.push(Action::Reflect((s, v)));
                    }
                    if max_new_piles >= 0
                        && v == to_defend_value
                        && s == trump_suit
                        && !self.reflected_trumps.contains(&(s, v))
                    {
                        reflect.push(Action::ReflectTrump((s, v)));
                    }
                }

                if s == trump_suit && !to_defend_is_trump {
                    defend.push(Action::Defend((s, v)));
                }
                if s == to_defend_suit && v > to_defend_value {
                    defend.push(Action::Defend((s, v)));
                }
            }

            let n_defend = defend.len();
            for action in defend {
                *play_options.entry(action).or_insert(0.0) += 1.0 / n_defend as f64;
            }
            let n_reflect = reflect.len();
            for action in reflect {
                *play_options.entry(action).or_insert(0.0) += 1.0 / n_reflect as f64;
            }
        }

        let mut actions: Vec<WeightedAction> = play_options
            .into_iter()
            .map(|(action, weight)| WeightedAction::new(action, weight))
            .collect();
        actions.push(WeightedAction::new(Action::Take, 0.5));
        actions
    }

    fn allowed_throws(&self) -> Vec<WeightedAction> {
        let player = self.player_to_play;
        let non_public = self.cards.non_public_identities();
        let poss_throws_all = self.seats[player].possible_card_plays(&self.cards, &non_public);

        let mut values_on_table = self.values_on_table_from_pairs();
        for &id in &self.cards_to_defend {
            if let Some((_, v)) = self.cards.identity(id) {
                values_on_table.insert(v);
            }
        }
        let poss_throws: Vec<Identity> = poss_throws_all
            .into_iter()
            .filter(|(_, v)| values_on_table.contains(v))
            .collect();

        let defender = self.defender.expect("throw phase without a defender");
        let available_throws =
            self.seats[defender].hand.len() as i64 - self.cards_to_defend.len() as i64;

        let mut actions = vec![WeightedAction::unweighted(Action::ThrowCards(None))];

        let max_throws = available_throws
            .max(0)
            .min(poss_throws.len() as i64)
            .min(self.seats[player].hand.len() as i64) as usize;

        if max_throws > 0 {
            let fallback_identities = non_public;
            for size in 1..=max_throws {
                for combo in poss_throws.iter().copied().combinations(size) {
                    if self.seats[player].can_throw(&self.cards, &fallback_identities, &combo) {
                        actions.push(WeightedAction::unweighted(Action::ThrowCards(Some(combo))));
                    }
                }
            }
        }

        actions
    }

    /// Executes `action`, appending it to `history` and applying its state
    /// transition. Every discard routes through `Seat::discard_card`, which
    /// panics (fatal) if the hand cannot produce the requested identity.
    pub fn execute_action(&mut self, action: Action) {
        assert!(!self.is_terminal, "execute_action called on a terminal state");
        self.history.push(action.clone());

        match action {
            Action::Attack(identity) => {
                let non_public = self.cards.non_public_identities();
                let card = self.seats[self.player_to_play].discard_card(
                    &mut self.cards,
                    &non_public,
                    identity,
                    true,
                );
                self.last_played_attacker = Some(self.player_to_play);
                self.player_to_play = self.defender.expect("attack without defender");
                self.current_action = CurrentAction::Defend;
                self.cards_to_defend.push_back(card);
            }
            Action::Defend(identity) => {
                let card_defended = self.cards_to_defend.pop_front().expect("nothing to defend");
                let non_public = self.cards.non_public_identities();
                let card_played = self.seats[self.player_to_play].discard_card(
                    &mut self.cards,
                    &non_public,
                    identity,
                    true,
                );
                self.pairs_finished.push((card_defended, card_played));
                if self.cards_to_defend.is_empty() {
                    self.player_to_play = self.attackers[self.current_attacker];
                    self.current_action = CurrentAction::Attack;
                }
            }
            Action::Take => {
                self.current_action = CurrentAction::ThrowCards;
                self.player_to_play = self.attackers[self.current_attacker];
                self.attacker_to_start_throwing = Some(self.current_attacker);
            }
            Action::ThrowCards(thrown) => {
                if let Some(identities) = thrown {
                    let non_public = self.cards.non_public_identities();
                    for identity in identities {
                        let card = self.seats[self.player_to_play].discard_card(
                            &mut self.cards,
                            &non_public,
                            identity,
                            true,
                        );
                        self.cards_to_defend.push_back(card);
                    }
                }
                self.current_attacker = (self.current_attacker + 1) % self.attackers.len();
                self.player_to_play = self.attackers[self.current_attacker];

                let start = self
                    .attacker_to_start_throwing
                    .expect("throw phase without a start marker");
                if self.current_attacker == start {
                    let mut cards_on_table: Vec<CardId> = self
                        .pairs_finished
                        .iter()
                        .flat_map(|&(a, d)| [a, d])
                        .collect();
                    cards_on_table.extend(self.cards_to_defend.iter().copied());
                    let defender = self.defender.expect("throw phase without defender");
                    self.seats[defender].hand.extend(cards_on_table);

                    let draw_order = self.draw_order.clone();
                    for idx in draw_order {
                        self.seats[idx].fill_hand(&mut self.deck);
                    }
                    let next_main = self.attackers[1 % self.attackers.len()];
                    self.new_trick(next_main);
                }
            }
            Action::PassAttack => {
                self.current_attacker = (self.current_attacker + 1) % self.attackers.len();
                self.player_to_play = self.attackers[self.current_attacker];

                if Some(self.player_to_play) == self.last_played_attacker {
                    let draw_order = self.draw_order.clone();
                    for idx in draw_order {
                        self.seats[idx].fill_hand(&mut self.deck);
                    }
                    assert!(self.cards_to_defend.is_empty());
                    let defender = self.defender.expect("defense succeeded without a defender");
                    self.new_trick(defender);
                }
            }
            Action::Reflect(identity) => {
                let defender = self.defender.expect("reflect without a defender");
                let non_public = self.cards.non_public_identities();
                let card_played =
                    self.seats[defender].discard_card(&mut self.cards, &non_public, identity, true);
                self.reflect_seats(defender);
                self.cards_to_defend.push_back(card_played);
            }
            Action::ReflectTrump(identity) => {
                let defender = self.defender.expect("reflect trump without a defender");
                assert_eq!(self.player_to_play, defender);
                let non_public = self.cards.non_public_identities();
                self.seats[defender].discard_card(&mut self.cards, &non_public, identity, false);
                self.reflected_trumps.insert(identity);
                self.reflect_seats(defender);
            }
        }
    }

    /// The seat-rotation shared by Reflect and ReflectTrump: the attacker
    /// immediately clockwise of the current defender becomes the new
    /// defender, the old defender slots in as an attacker there, and
    /// priority pivots back to the (unchanged) current attacker. The
    /// legality precondition for this pivot is checked in `allowed_defends`,
    /// not here -- by the time `reflect_seats` runs the move is already
    /// known legal.
    fn reflect_seats(&mut self, old_defender: usize) {
        self.last_played_attacker = Some(self.player_to_play);
        let pivot = 1 % self.attackers.len();
        let new_defender = self.attackers.remove(pivot);
        self.attackers.insert(pivot, old_defender);
        self.defender = Some(new_defender);
        self.draw_order = self.attackers.clone();
        self.draw_order.push(new_defender);
        self.attackers.rotate_left(1);
        self.current_action = CurrentAction::Defend;
        self.player_to_play = new_defender;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Suit;
    use rand_mt::Mt64;

    fn seeded_rng() -> Mt64 {
        Mt64::new(0x42)
    }

    fn new_state(names: &[&str], bottom: Identity, main: &str) -> GameState {
        GameState::new(
            names.iter().map(|s| s.to_string()).collect(),
            BottomCardSource::Fixed(bottom),
            main,
            false,
            &mut seeded_rng(),
        )
    }

    #[test]
    fn constructed_state_never_has_ace_bottom() {
        let state = GameState::new(
            vec!["A".into(), "B".into()],
            BottomCardSource::ComputerShuffle,
            "A",
            false,
            &mut seeded_rng(),
        );
        let bottom_id = *state.deck.back().unwrap();
        assert_ne!(state.cards.identity(bottom_id).unwrap().1, Value::Ace);
    }

    #[test]
    fn thirty_six_cards_partition_deck_hands_and_table() {
        let state = new_state(&["A", "B"], (Suit::Hearts, Value::Seven), "A");
        let mut total = state.deck.len();
        for seat in &state.seats {
            total += seat.hand.len();
        }
        total += state.cards_to_defend.len();
        total += state.pairs_finished.len() * 2;
        assert_eq!(total, DECK_SIZE);
    }

    #[test]
    fn every_card_has_exactly_one_visibility() {
        let state = new_state(&["A", "B"], (Suit::Hearts, Value::Seven), "A");
        for id in 0..DECK_SIZE {
            let count = [
                state.cards.is_unknown(id),
                state.cards.is_private(id),
                state.cards.is_public(id),
            ]
            .into_iter()
            .filter(|b| *b)
            .count();
            assert_eq!(count, 1);
        }
    }

    #[test]
    fn simple_defense_moves_pair_to_finished_and_rotates_main_attacker() {
        let mut state = new_state(&["A", "B"], (Suit::Clubs, Value::King), "A");
        assert_eq!(state.seats[0].name, "A");

        state
            .cards
            .bind(state.seats[0].hand[0], (Suit::Spades, Value::Six));
        state
            .cards
            .bind(state.seats[1].hand[0], (Suit::Spades, Value::Seven));

        state.execute_action(Action::Attack((Suit::Spades, Value::Six)));
        assert_eq!(state.current_action, CurrentAction::Defend);
        state.execute_action(Action::Defend((Suit::Spades, Value::Seven)));
        assert_eq!(state.pairs_finished.len(), 1);
        assert_eq!(state.current_action, CurrentAction::Attack);

        state.execute_action(Action::PassAttack);
        assert_eq!(state.seats[0].hand.len(), 6);
        assert_eq!(state.seats[1].hand.len(), 6);
        assert_eq!(state.defender, Some(0));
    }

    #[test]
    fn reflect_trump_keeps_card_in_hand_and_marks_reflected() {
        let mut state = new_state(&["A", "B", "C"], (Suit::Diamonds, Value::Seven), "A");
        state
            .cards
            .bind(state.seats[0].hand[0], (Suit::Clubs, Value::Six));
        state.execute_action(Action::Attack((Suit::Clubs, Value::Six)));

        let defender = state.defender.unwrap();
        state
            .cards
            .bind(state.seats[defender].hand[0], (Suit::Diamonds, Value::Six));
        state.execute_action(Action::ReflectTrump((Suit::Diamonds, Value::Six)));

        assert!(state.reflected_trumps.contains(&(Suit::Diamonds, Value::Six)));
        assert!(state.cards.is_public(state.seats[defender].hand[0]));
        assert_eq!(state.current_action, CurrentAction::Defend);
    }

    #[test]
    fn allowed_plays_never_empty_through_a_short_random_game() {
        let mut state = new_state(&["A", "B"], (Suit::Hearts, Value::King), "A");
        let mut rng = seeded_rng();
        for _ in 0..40 {
            if state.is_terminal {
                break;
            }
            let cards_snapshot = state.cards.clone();
            state.seats[state.player_to_play].make_cards_known(&mut state.cards, &mut rng);
            let _ = cards_snapshot;
            let actions = state.allowed_plays();
            assert!(!actions.is_empty());
            let choice = actions[rng.gen_range(0..actions.len())].action.clone();
            state.execute_action(choice);
        }
    }

    #[test]
    fn snapshot_evolves_independently_of_original() {
        let mut state = new_state(&["A", "B"], (Suit::Hearts, Value::King), "A");
        let mut snapshot = state.make_snapshot();
        let original_history_len = state.history.len();

        snapshot
            .cards
            .bind(snapshot.seats[0].hand[0], (Suit::Spades, Value::Six));
        snapshot.execute_action(Action::Attack((Suit::Spades, Value::Six)));

        assert_eq!(state.history.len(), original_history_len);
        assert_ne!(snapshot.history.len(), state.history.len());
        let _ = &mut state;
    }
}
