use std::path::Path;

use log::info;

use crate::{
    algo::tabular::{
        q_table::QTable,
        td::{TdConfig, TdEngine, TrainReport},
    },
    corpus::{self, Trial, DEFAULT_EXTENSION},
    error::Result,
    game::{Action, State},
    policy,
};

/// Configuration for the [`Learner`]
#[derive(Debug, Clone, PartialEq)]
pub struct LearnerConfig {
    /// Extension of trial files, without the leading dot
    ///
    /// **Default**: `"csv"`
    pub extension: String,
    /// Hyperparameters of the TD engine
    pub td: TdConfig,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            extension: String::from(DEFAULT_EXTENSION),
            td: TdConfig::default(),
        }
    }
}

/// A Q-function learned from a corpus of recorded trials, and the greedy
/// policy it induces
///
/// Training happens once, on construction. Afterwards the learner only answers
/// queries.
#[derive(Debug, Clone)]
pub struct Learner {
    engine: TdEngine,
    trials: Vec<Trial>,
    table: QTable,
    report: TrainReport,
}

impl Learner {
    /// Learn from every `.csv` trial under `root` with default hyperparameters
    pub fn build(root: impl AsRef<Path>) -> Result<Self> {
        Self::build_with(root, LearnerConfig::default())
    }

    pub fn build_with(root: impl AsRef<Path>, config: LearnerConfig) -> Result<Self> {
        let trials = corpus::load(root, &config.extension)?;
        Ok(Self::from_trials(trials, config.td))
    }

    /// Learn from trials that are already in memory
    ///
    /// **Panics** if `config` is invalid, see [`TdEngine::new`]
    pub fn from_trials(trials: Vec<Trial>, config: TdConfig) -> Self {
        let engine = TdEngine::new(config);
        let mut table = QTable::from_trials(&trials);
        info!(
            "training on {} trials, {} explored state-action pairs",
            trials.len(),
            table.len()
        );
        let report = engine.train(&mut table, &trials);

        Self {
            engine,
            trials,
            table,
            report,
        }
    }

    /// Learned value of taking `action` in `state`
    pub fn qvalue(&self, state: &State, action: Action) -> f64 {
        self.table.get(state, action)
    }

    /// Greedy action in `state`; ties go to the highest-numbered legal action
    pub fn policy(&self, state: &State) -> Action {
        policy::greedy(&self.table, state, self.engine.actions())
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    pub fn report(&self) -> TrainReport {
        self.report
    }

    /// Write the learned table as CSV, see [`QTable::write_csv`]
    pub fn save_table(&self, path: impl AsRef<Path>) -> Result<()> {
        self.table.write_csv(path)
    }
}
