use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

use rand::Rng;

/// Index into a [`CardCollection`]'s fixed 36-slot arena. Identity is the
/// index itself, never the bound suit/value -- this is what lets `reset`
/// preserve identity and a snapshot be a plain vector clone.
pub type CardId = usize;

pub const DECK_SIZE: usize = 36;
pub const HAND_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    Clubs,
    Spades,
    Hearts,
    Diamonds,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Spades, Suit::Hearts, Suit::Diamonds];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl Display for Suit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let ch = match self {
            Suit::Clubs => '♣',
            Suit::Spades => '♠',
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
        };
        write!(f, "{}", ch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Value {
    pub const ALL: [Value; 9] = [
        Value::Six,
        Value::Seven,
        Value::Eight,
        Value::Nine,
        Value::Ten,
        Value::Jack,
        Value::Queen,
        Value::King,
        Value::Ace,
    ];
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let ch = match self {
            Value::Six => '6',
            Value::Seven => '7',
            Value::Eight => '8',
            Value::Nine => '9',
            Value::Ten => '*',
            Value::Jack => 'J',
            Value::Queen => 'Q',
            Value::King => 'K',
            Value::Ace => 'A',
        };
        write!(f, "{}", ch)
    }
}

/// A bound (suit, value) pair, independent of any particular physical card.
pub type Identity = (Suit, Value);

pub fn all_identities() -> HashSet<Identity> {
    let mut set = HashSet::with_capacity(DECK_SIZE);
    for suit in Suit::ALL {
        for value in Value::ALL {
            set.insert((suit, value));
        }
    }
    set
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Unknown,
    Private,
    Public,
}

#[derive(Debug, Clone, Copy)]
struct CardSlot {
    identity: Option<Identity>,
    visibility: Visibility,
}

impl CardSlot {
    fn unknown() -> Self {
        CardSlot {
            identity: None,
            visibility: Visibility::Unknown,
        }
    }
}

/// The insertion-order-preserved arena of all 36 physical cards for a deal.
/// Nothing is ever added to or removed from it; hands, the deck and the
/// table reference cards here by [`CardId`].
#[derive(Debug, Clone)]
pub struct CardCollection {
    slots: Vec<CardSlot>,
    trump_suit: Option<Suit>,
}

impl CardCollection {
    pub fn new() -> Self {
        CardCollection {
            slots: vec![CardSlot::unknown(); DECK_SIZE],
            trump_suit: None,
        }
    }

    pub fn trump_suit(&self) -> Suit {
        self.trump_suit.expect("trump suit not yet set")
    }

    pub fn set_trump_suit(&mut self, suit: Suit) {
        self.trump_suit = Some(suit);
    }

    pub fn visibility(&self, id: CardId) -> Visibility {
        self.slots[id].visibility
    }

    pub fn identity(&self, id: CardId) -> Option<Identity> {
        self.slots[id].identity
    }

    pub fn is_unknown(&self, id: CardId) -> bool {
        self.slots[id].visibility == Visibility::Unknown
    }

    pub fn is_public(&self, id: CardId) -> bool {
        self.slots[id].visibility == Visibility::Public
    }

    pub fn is_private(&self, id: CardId) -> bool {
        self.slots[id].visibility == Visibility::Private
    }

    pub fn is_trump(&self, id: CardId) -> bool {
        self.identity(id).map(|(s, _)| s) == self.trump_suit
    }

    /// Binds an Unknown card to a concrete identity. Fatal if the card is
    /// already bound -- binding an already-bound card is a programming error.
    pub fn bind(&mut self, id: CardId, identity: Identity) {
        let slot = &mut self.slots[id];
        assert!(
            slot.identity.is_none(),
            "attempted to bind already-bound card {}",
            id
        );
        slot.identity = Some(identity);
    }

    pub fn mark_public(&mut self, id: CardId) {
        self.slots[id].visibility = Visibility::Public;
    }

    pub fn mark_private(&mut self, id: CardId) {
        self.slots[id].visibility = Visibility::Private;
    }

    /// Reverts a card to Unknown while preserving its identity (the slot
    /// index never changes) -- used when taking a first-person view that
    /// must forget another player's private cards.
    pub fn reset(&mut self, id: CardId) {
        self.slots[id] = CardSlot::unknown();
    }

    /// (suit, value) pairs not yet bound to any non-Unknown card.
    pub fn unknown_identities(&self) -> HashSet<Identity> {
        let bound: HashSet<Identity> = self
            .slots
            .iter()
            .filter(|s| s.visibility != Visibility::Unknown)
            .filter_map(|s| s.identity)
            .collect();
        all_identities().difference(&bound).copied().collect()
    }

    /// (suit, value) pairs not yet bound to any Public card -- the
    /// information-set view: Unknown and Private cards are still candidates.
    pub fn non_public_identities(&self) -> HashSet<Identity> {
        let bound: HashSet<Identity> = self
            .slots
            .iter()
            .filter(|s| s.visibility == Visibility::Public)
            .filter_map(|s| s.identity)
            .collect();
        all_identities().difference(&bound).copied().collect()
    }

    pub fn display(&self, id: CardId) -> String {
        match self.visibility(id) {
            Visibility::Unknown => "???".to_string(),
            vis => {
                let (s, v) = self.identity(id).expect("bound card missing identity");
                let tag = if vis == Visibility::Private { 'P' } else { 'A' };
                format!("{}{}{}", tag, s, v)
            }
        }
    }
}

impl Default for CardCollection {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniformly samples one identity from `pool`, removing it.
pub fn pop_random_identity(pool: &mut Vec<Identity>, rng: &mut impl Rng) -> Identity {
    let idx = rng.gen_range(0..pool.len());
    pool.remove(idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_collection_is_all_unknown() {
        let cards = CardCollection::new();
        assert_eq!(cards.unknown_identities().len(), DECK_SIZE);
        for id in 0..DECK_SIZE {
            assert!(cards.is_unknown(id));
        }
    }

    #[test]
    fn bind_then_mark_public_narrows_non_public_set() {
        let mut cards = CardCollection::new();
        cards.set_trump_suit(Suit::Hearts);
        cards.bind(0, (Suit::Spades, Value::Ace));
        cards.mark_public(0);
        assert!(!cards.non_public_identities().contains(&(Suit::Spades, Value::Ace)));
        assert_eq!(cards.non_public_identities().len(), DECK_SIZE - 1);
    }

    #[test]
    #[should_panic]
    fn double_bind_is_fatal() {
        let mut cards = CardCollection::new();
        cards.bind(0, (Suit::Clubs, Value::Six));
        cards.bind(0, (Suit::Clubs, Value::Seven));
    }

    #[test]
    fn reset_preserves_identity_slot_but_forgets_binding() {
        let mut cards = CardCollection::new();
        cards.bind(3, (Suit::Diamonds, Value::King));
        cards.mark_private(3);
        cards.reset(3);
        assert!(cards.is_unknown(3));
        assert_eq!(cards.identity(3), None);
    }

    #[test]
    fn is_trump_matches_collection_trump_suit() {
        let mut cards = CardCollection::new();
        cards.set_trump_suit(Suit::Clubs);
        cards.bind(5, (Suit::Clubs, Value::Nine));
        cards.mark_public(5);
        assert!(cards.is_trump(5));
    }
}
