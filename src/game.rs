//! The coin-bag game as seen by the learner: states, actions and rewards

use std::{fmt, str::FromStr};

use crate::error::Error;

/// Whether the game is still running, and if not who won
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    InProgress,
    AgentWon,
    OpponentWon,
}

impl Outcome {
    /// Single-character marker used in trial files
    pub fn marker(self) -> char {
        match self {
            Outcome::InProgress => '-',
            Outcome::AgentWon => 'A',
            Outcome::OpponentWon => 'O',
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "-" => Some(Outcome::InProgress),
            "A" => Some(Outcome::AgentWon),
            "O" => Some(Outcome::OpponentWon),
            _ => None,
        }
    }
}

/// A snapshot of the game: coins left in the bag, coins held by each player,
/// and the outcome so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State {
    pub bag: u32,
    pub agent: u32,
    pub opponent: u32,
    pub outcome: Outcome,
}

impl State {
    pub const fn new(bag: u32, agent: u32, opponent: u32, outcome: Outcome) -> Self {
        Self {
            bag,
            agent,
            opponent,
            outcome,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome != Outcome::InProgress
    }

    /// Whether drawing `coins` is possible from this state
    pub fn permits(&self, coins: u32) -> bool {
        self.bag >= coins
    }

    /// The subset of `actions` that can be drawn from this state, in the given order
    pub fn legal_actions<'a>(&'a self, actions: &'a [u32]) -> impl Iterator<Item = Action> + 'a {
        actions
            .iter()
            .copied()
            .filter(|&a| self.permits(a))
            .map(Action::Draw)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.bag,
            self.agent,
            self.opponent,
            self.outcome.marker()
        )
    }
}

impl FromStr for State {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| Error::InvalidState {
            text: s.to_string(),
            reason,
        };

        let fields: Vec<&str> = s.trim().split('/').map(str::trim).collect();
        let [bag, agent, opponent, outcome] = fields[..] else {
            return Err(invalid(format!("expected 4 fields, found {}", fields.len())));
        };

        let count = |name: &str, field: &str| {
            field
                .parse::<u32>()
                .map_err(|e| invalid(format!("{name} count '{field}': {e}")))
        };

        Ok(Self {
            bag: count("bag", bag)?,
            agent: count("agent", agent)?,
            opponent: count("opponent", opponent)?,
            outcome: Outcome::from_marker(outcome)
                .ok_or_else(|| invalid(format!("unknown outcome marker '{outcome}'")))?,
        })
    }
}

/// A move recorded in a trial
///
/// `NoAction` is recorded at terminal states, where nothing can be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Draw(u32),
    NoAction,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Draw(n) => write!(f, "{n}"),
            Action::NoAction => f.write_str("-"),
        }
    }
}

impl FromStr for Action {
    type Err = Error;

    /// Integers become [`Action::Draw`]; any other token becomes [`Action::NoAction`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if let Ok(n) = token.parse::<u32>() {
            return Ok(Action::Draw(n));
        }

        let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAction {
                text: token.to_string(),
                reason: String::from("coin count must be a non-negative 32-bit integer"),
            });
        }

        Ok(Action::NoAction)
    }
}

/// Immediate reward of a state
///
/// A win pays the agent's coins, a loss costs the opponent's coins, and
/// anything still in progress is worth nothing.
pub fn reward(state: &State) -> f64 {
    match state.outcome {
        Outcome::AgentWon => f64::from(state.agent),
        Outcome::OpponentWon => -f64::from(state.opponent),
        Outcome::InProgress => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_follows_outcome() {
        assert_eq!(reward(&State::new(2, 3, 1, Outcome::AgentWon)), 3.0);
        assert_eq!(reward(&State::new(0, 3, 7, Outcome::OpponentWon)), -7.0);
        assert_eq!(reward(&State::new(4, 3, 7, Outcome::InProgress)), 0.0);
        assert_eq!(
            reward(&State::new(0, 0, 0, Outcome::AgentWon)),
            0.0,
            "winning with no coins pays nothing"
        );
    }

    #[test]
    fn state_text_form() {
        let state: State = "13/0/2/-".parse().unwrap();
        assert_eq!(state, State::new(13, 0, 2, Outcome::InProgress));
        assert_eq!(state.to_string(), "13/0/2/-");

        let state: State = " 2 / 3 / 0 / A ".parse().unwrap();
        assert_eq!(state, State::new(2, 3, 0, Outcome::AgentWon));
    }

    #[test]
    fn state_rejects_malformed_text() {
        for text in ["5/0/0", "5/0/0/-/1", "x/0/0/-", "5/-1/0/-", "5/0/0/Z", ""] {
            assert!(
                matches!(text.parse::<State>(), Err(Error::InvalidState { .. })),
                "'{text}' should not parse"
            );
        }
    }

    #[test]
    fn action_text_form() {
        assert_eq!("2".parse::<Action>().unwrap(), Action::Draw(2));
        assert_eq!(" 3 ".parse::<Action>().unwrap(), Action::Draw(3));
        assert_eq!("-".parse::<Action>().unwrap(), Action::NoAction);
        assert_eq!("stop".parse::<Action>().unwrap(), Action::NoAction);
        assert!("-1".parse::<Action>().is_err(), "negative draws are rejected");
        for token in ["4294967296", "99999999999999999999", "-99999999999999999999"] {
            assert!(
                matches!(token.parse::<Action>(), Err(Error::InvalidAction { .. })),
                "out-of-range integer '{token}' is rejected"
            );
        }
        assert_eq!(Action::Draw(1).to_string(), "1");
        assert_eq!(Action::NoAction.to_string(), "-");
    }

    #[test]
    fn legality_depends_on_bag() {
        let state = State::new(2, 0, 0, Outcome::InProgress);
        let legal: Vec<_> = state.legal_actions(&[1, 2, 3]).collect();
        assert_eq!(legal, [Action::Draw(1), Action::Draw(2)]);

        let empty = State::new(0, 4, 4, Outcome::InProgress);
        assert_eq!(empty.legal_actions(&[1, 2, 3]).count(), 0);
    }
}
