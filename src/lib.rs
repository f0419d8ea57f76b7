//! Batch Q-learning for the coin-bag game from a corpus of recorded trials
//!
//! ```no_run
//! use coinbag_td::{Learner, State};
//!
//! let learner = Learner::build("Trials")?;
//! let state: State = "13/0/0/-".parse()?;
//! println!("best action: {}", learner.policy(&state));
//! # Ok::<(), coinbag_td::Error>(())
//! ```

/// Implemented learning algorithms
pub mod algo;

/// Trial corpus loading
pub mod corpus;

/// Error types
pub mod error;

/// Game states, actions and rewards
pub mod game;

/// Construction and query interface
pub mod learner;

/// Greedy action selection
pub mod policy;

mod util;

pub use error::{Error, Result};
pub use game::{Action, Outcome, State};
pub use learner::{Learner, LearnerConfig};
