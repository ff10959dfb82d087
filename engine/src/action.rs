use std::fmt::{self, Display, Formatter};

use crate::card::Identity;

/// A discriminated union over every move the rules engine can execute.
/// `ThrowCards(None)` is the distinguished throw-phase pass; a non-empty
/// subset is carried as `Some(..)`, never an empty vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    Attack(Identity),
    Defend(Identity),
    Reflect(Identity),
    ReflectTrump(Identity),
    Take,
    PassAttack,
    ThrowCards(Option<Vec<Identity>>),
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Action::Attack((s, v)) => write!(f, "Attack({}{})", s, v),
            Action::Defend((s, v)) => write!(f, "Defend({}{})", s, v),
            Action::Reflect((s, v)) => write!(f, "Reflect({}{})", s, v),
            Action::ReflectTrump((s, v)) => write!(f, "ReflectTrump({}{})", s, v),
            Action::Take => write!(f, "Take"),
            Action::PassAttack => write!(f, "PassAttack"),
            Action::ThrowCards(None) => write!(f, "ThrowCards(pass)"),
            Action::ThrowCards(Some(cards)) => {
                write!(f, "ThrowCards(")?;
                for (i, (s, v)) in cards.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}{}", s, v)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// An enumerated action paired with the exploration weight `allowed_plays`
/// assigns it. The weight only steers uniform-random rollout selection; it
/// plays no part in the search trees' own bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedAction {
    pub action: Action,
    pub weight: f64,
}

impl WeightedAction {
    pub fn new(action: Action, weight: f64) -> Self {
        WeightedAction { action, weight }
    }

    pub fn unweighted(action: Action) -> Self {
        WeightedAction { action, weight: 1.0 }
    }
}
