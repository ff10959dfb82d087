use std::collections::{HashSet, VecDeque};

use rand::Rng;

use crate::card::{pop_random_identity, CardCollection, CardId, Identity, HAND_SIZE};

/// A seat at the table: a name and an ordered hand of card references. This
/// is the hand-manipulation capability surface that is identical across
/// every player variant. What differs per variant is *decision-making*
/// (`choose_action`), which lives on the `Player` trait in the `players`
/// crate.
#[derive(Debug, Clone)]
pub struct Seat {
    pub name: String,
    pub hand: Vec<CardId>,
}

impl Seat {
    pub fn new(name: impl Into<String>) -> Self {
        Seat {
            name: name.into(),
            hand: Vec::new(),
        }
    }

    /// Draws from the top of the deck until the hand holds `HAND_SIZE`
    /// cards or the deck empties. Drawn cards keep visibility Unknown; they
    /// are bound later by `make_cards_known`.
    pub fn fill_hand(&mut self, deck: &mut VecDeque<CardId>) {
        while self.hand.len() < HAND_SIZE {
            match deck.pop_front() {
                Some(card) => self.hand.push(card),
                None => return,
            }
        }
    }

    /// Binds every Unknown card in this seat's hand to a sampled identity
    /// and marks it Private. The sample pool excludes identities already
    /// pinned to this seat's own known cards.
    pub fn make_cards_known(&self, cards: &mut CardCollection, rng: &mut impl Rng) {
        for &id in &self.hand {
            if cards.is_unknown(id) {
                let mut pool: Vec<Identity> = cards.unknown_identities().into_iter().collect();
                let identity = pop_random_identity(&mut pool, rng);
                cards.bind(id, identity);
                cards.mark_private(id);
            }
        }
    }

    fn known_hand_identities(&self, cards: &CardCollection) -> HashSet<Identity> {
        self.hand
            .iter()
            .filter(|&&id| !cards.is_unknown(id))
            .filter_map(|&id| cards.identity(id))
            .collect()
    }

    /// For each card in hand, contributes either its concrete identity (if
    /// known) or the full non-public set (if Unknown). Constraints between
    /// distinct Unknown cards are only enforced at discard/throw time.
    pub fn possible_card_plays(
        &self,
        cards: &CardCollection,
        non_public: &HashSet<Identity>,
    ) -> HashSet<Identity> {
        let mut plays = HashSet::new();
        for &id in &self.hand {
            if cards.is_unknown(id) {
                plays.extend(non_public.iter().copied());
            } else if let Some(identity) = cards.identity(id) {
                plays.insert(identity);
            }
        }
        plays
    }

    /// Locates a hand card matching `identity`, binding it first if it is
    /// Unknown (subject to membership in `non_public` minus this seat's
    /// already-known identities), then marks it Public. If `remove` is
    /// false (ReflectTrump) the card stays in hand. Fatal if no hand card
    /// can produce `identity`.
    pub fn discard_card(
        &mut self,
        cards: &mut CardCollection,
        non_public: &HashSet<Identity>,
        identity: Identity,
        remove: bool,
    ) -> CardId {
        let known = self.known_hand_identities(cards);
        let idx = self
            .hand
            .iter()
            .position(|&id| {
                if cards.is_unknown(id) {
                    non_public.contains(&identity) && !known.contains(&identity)
                } else {
                    cards.identity(id) == Some(identity)
                }
            })
            .expect("card not possible to discard");

        let card_id = self.hand[idx];
        if cards.is_unknown(card_id) {
            cards.bind(card_id, identity);
        }
        cards.mark_public(card_id);

        if remove {
            self.hand.remove(idx);
        }
        card_id
    }

    /// Decides whether this hand can simultaneously produce every identity
    /// in `throws`. Builds one slot per known hand card (its singleton
    /// identity) plus one slot per Unknown hand card (capped at the number
    /// of throws) holding `fallback_identities`, then greedily assigns each
    /// throw to the first slot admitting it. The greedy assignment order can
    /// in principle reject a combination a full bipartite match would
    /// accept; that limitation is left in place rather than silently
    /// upgraded to an exact matcher.
    pub fn can_throw(
        &self,
        cards: &CardCollection,
        fallback_identities: &HashSet<Identity>,
        throws: &[Identity],
    ) -> bool {
        let throw_set: HashSet<Identity> = throws.iter().copied().collect();
        let mut slots: Vec<HashSet<Identity>> = Vec::new();
        let mut fallback_count = 0usize;
        for &id in &self.hand {
            if cards.is_unknown(id) {
                fallback_count += 1;
            } else if let Some(identity) = cards.identity(id) {
                if throw_set.contains(&identity) {
                    slots.push([identity].into_iter().collect());
                }
            }
        }
        if slots.len() + fallback_count < throws.len() {
            return false;
        }
        for _ in 0..fallback_count.min(throws.len()) {
            slots.push(fallback_identities.clone());
        }

        for &throw in throws {
            match slots.iter().position(|slot| slot.contains(&throw)) {
                Some(idx) => {
                    slots.remove(idx);
                }
                None => return false,
            }
        }
        true
    }

    /// Produces a perfect-information determinization of this hand: known
    /// cards are marked Public in place, Unknown cards are bound by
    /// sampling without replacement from `non_public` and marked Public.
    /// `non_public` is caller-computed and may still include this seat's own
    /// known identities (it hasn't marked them Public yet), so those are
    /// excluded from the sampling pool here to keep an Unknown card from
    /// being bound to an identity this hand already holds.
    pub fn determinize_hand(
        &self,
        cards: &mut CardCollection,
        non_public: &HashSet<Identity>,
        rng: &mut impl Rng,
    ) {
        let known = self.known_hand_identities(cards);
        let mut pool: Vec<Identity> = non_public.difference(&known).copied().collect();
        for &id in &self.hand {
            if cards.is_unknown(id) {
                let identity = pop_random_identity(&mut pool, rng);
                cards.bind(id, identity);
            }
            cards.mark_public(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{all_identities, CardCollection, Suit, Value};
    use rand_mt::Mt64;

    fn seeded_rng() -> Mt64 {
        Mt64::new(0x42)
    }

    #[test]
    fn fill_hand_stops_at_hand_size_or_empty_deck() {
        let mut seat = Seat::new("A");
        let mut deck: VecDeque<CardId> = (0..3).collect();
        seat.fill_hand(&mut deck);
        assert_eq!(seat.hand.len(), 3);
        assert!(deck.is_empty());

        let mut deck2: VecDeque<CardId> = (10..20).collect();
        seat.fill_hand(&mut deck2);
        assert_eq!(seat.hand.len(), HAND_SIZE);
        assert_eq!(deck2.len(), 10 - (HAND_SIZE - 3));
    }

    #[test]
    fn make_cards_known_binds_every_unknown_hand_card() {
        let mut cards = CardCollection::new();
        cards.set_trump_suit(Suit::Hearts);
        let mut seat = Seat::new("A");
        seat.hand = vec![0, 1, 2];
        seat.make_cards_known(&mut cards, &mut seeded_rng());
        for &id in &seat.hand {
            assert!(cards.is_private(id));
            assert!(cards.identity(id).is_some());
        }
    }

    #[test]
    fn discard_card_binds_unknown_and_marks_public() {
        let mut cards = CardCollection::new();
        cards.set_trump_suit(Suit::Spades);
        let mut seat = Seat::new("A");
        seat.hand = vec![0, 1];
        let non_public = all_identities();
        let played = seat.discard_card(&mut cards, &non_public, (Suit::Clubs, Value::Ace), true);
        assert!(cards.is_public(played));
        assert_eq!(cards.identity(played), Some((Suit::Clubs, Value::Ace)));
        assert_eq!(seat.hand.len(), 1);
    }

    #[test]
    fn discard_card_reflect_trump_keeps_card_in_hand() {
        let mut cards = CardCollection::new();
        cards.set_trump_suit(Suit::Spades);
        let mut seat = Seat::new("A");
        seat.hand = vec![0];
        let non_public = all_identities();
        seat.discard_card(&mut cards, &non_public, (Suit::Spades, Value::Six), false);
        assert_eq!(seat.hand.len(), 1);
        assert!(cards.is_public(seat.hand[0]));
    }

    #[test]
    fn can_throw_uses_fallback_slots_for_unknown_cards() {
        let mut cards = CardCollection::new();
        cards.set_trump_suit(Suit::Clubs);
        cards.bind(0, (Suit::Hearts, Value::Six));
        cards.mark_private(0);
        let mut seat = Seat::new("A");
        seat.hand = vec![0, 1]; // card 1 stays Unknown
        let fallback: HashSet<Identity> = [(Suit::Hearts, Value::Six), (Suit::Diamonds, Value::Six)]
            .into_iter()
            .collect();
        assert!(seat.can_throw(
            &cards,
            &fallback,
            &[(Suit::Hearts, Value::Six), (Suit::Diamonds, Value::Six)]
        ));
    }

    #[test]
    fn can_throw_fails_when_not_enough_slots() {
        let cards = CardCollection::new();
        let mut seat = Seat::new("A");
        seat.hand = vec![0];
        let fallback: HashSet<Identity> = [(Suit::Hearts, Value::Six)].into_iter().collect();
        assert!(!seat.can_throw(
            &cards,
            &fallback,
            &[(Suit::Hearts, Value::Six), (Suit::Diamonds, Value::Seven)]
        ));
    }
}
