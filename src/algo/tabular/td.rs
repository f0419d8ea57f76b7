use log::{debug, info, trace, warn};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::{
    assert_at_least, assert_interval,
    corpus::{Step, Trial},
    error::{Error, Result},
    game::{reward, Action},
    util::max_f64,
};

use super::q_table::QTable;

/// Which next-state actions feed the max in a backup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CandidateRule {
    /// Every legal action of the next state (standard Q-learning)
    #[default]
    AllLegal,
    /// Only the first legal action in action order, which reproduces tables
    /// learned by older versions of this learner
    FirstLegal,
}

/// Order in which trials are visited during a sweep
///
/// Steps within a trial are always visited in the order they were recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SweepOrder {
    /// The order the trials were loaded in, every sweep
    #[default]
    Discovery,
    /// A fresh permutation every sweep, drawn from an RNG seeded once per training run
    Shuffled { seed: u64 },
}

/// Configuration for the [`TdEngine`]
#[derive(Debug, Clone, PartialEq)]
pub struct TdConfig {
    /// Learning rate α
    ///
    /// **Default**: `0.1`
    pub alpha: f64,
    /// Discount factor γ
    ///
    /// **Default**: `0.9`
    pub gamma: f64,
    /// Coins a player may draw per turn
    ///
    /// **Default**: `[1, 2, 3]`
    pub actions: Vec<u32>,
    /// Training stops once a whole sweep changes no value by this much
    ///
    /// **Default**: `1e-10`
    pub epsilon: f64,
    /// Upper bound on the number of sweeps, `None` for unbounded
    ///
    /// With `epsilon == 0.0` or inconsistent trials an unbounded run may never end.
    ///
    /// **Default**: `Some(100_000)`
    pub max_sweeps: Option<u32>,
    /// **Default**: [`CandidateRule::AllLegal`]
    pub candidates: CandidateRule,
    /// **Default**: [`SweepOrder::Discovery`]
    pub order: SweepOrder,
}

impl Default for TdConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.9,
            actions: vec![1, 2, 3],
            epsilon: 1e-10,
            max_sweeps: Some(100_000),
            candidates: CandidateRule::AllLegal,
            order: SweepOrder::Discovery,
        }
    }
}

/// Outcome of a training run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainReport {
    /// Sweeps performed, including the final one that met the threshold
    pub sweeps: u32,
    /// Largest |TD error| seen during the last sweep
    pub max_error: f64,
    /// Whether `max_error` fell below the threshold before the sweep cap
    pub converged: bool,
}

impl TrainReport {
    /// Treat a run that hit the sweep cap as an error
    pub fn into_result(self) -> Result<Self> {
        if self.converged {
            Ok(self)
        } else {
            Err(Error::ConvergenceTimeout {
                sweeps: self.sweeps,
                max_error: self.max_error,
            })
        }
    }
}

/// Batch Q-learning over a fixed set of recorded trials
///
/// Each sweep applies the one-step backup
///
/// Q(s,a) ← Q(s,a) + α[r(s) + γ max<sub>a'</sub> Q(s',a') - Q(s,a)]
///
/// to every pair of adjacent steps, writing each update back before the next
/// one is read. Sweeps repeat until the largest |TD error| of a sweep drops
/// below ε.
///
/// Training is single threaded. Sweeping trials in parallel would need the
/// updates to shared entries serialized to keep these semantics.
#[derive(Debug, Clone)]
pub struct TdEngine {
    alpha: f64,
    gamma: f64,
    actions: Vec<u32>,
    epsilon: f64,
    max_sweeps: Option<u32>,
    candidates: CandidateRule,
    order: SweepOrder,
}

impl TdEngine {
    /// Initialize a new `TdEngine`
    ///
    /// The action set is sorted and deduplicated.
    ///
    /// **Panics** if `alpha` or `gamma` is not in the interval `[0,1]`, if
    /// `epsilon` is negative or not finite, or if `max_sweeps` is `Some(0)`
    pub fn new(config: TdConfig) -> Self {
        assert_interval!(config.alpha, 0.0, 1.0);
        assert_interval!(config.gamma, 0.0, 1.0);
        assert_at_least!(config.epsilon, 0.0);
        assert!(
            config.max_sweeps != Some(0),
            "Invalid value for `max_sweeps`. Must allow at least one sweep."
        );

        let mut actions = config.actions;
        actions.sort_unstable();
        actions.dedup();

        Self {
            alpha: config.alpha,
            gamma: config.gamma,
            actions,
            epsilon: config.epsilon,
            max_sweeps: config.max_sweeps,
            candidates: config.candidates,
            order: config.order,
        }
    }

    /// The action set, ascending
    pub fn actions(&self) -> &[u32] {
        &self.actions
    }

    /// Values the backup of `prev → next` maximizes over
    fn candidates(&self, table: &QTable, next: &Step) -> Vec<f64> {
        let state = &next.state;
        if state.is_terminal() {
            return vec![table.get(state, Action::NoAction)];
        }

        let legal = state.legal_actions(&self.actions);
        let take = match self.candidates {
            CandidateRule::AllLegal => usize::MAX,
            CandidateRule::FirstLegal => 1,
        };
        legal.take(take).map(|a| table.get(state, a)).collect()
    }

    /// Apply the one-step backup to `prev`'s entry
    ///
    /// **Returns** the |TD error| of the update, or `None` if the next state
    /// offers no action to bootstrap from
    pub fn backup(&self, table: &mut QTable, prev: &Step, next: &Step) -> Option<f64> {
        let max_next = max_f64(self.candidates(table, next))?;
        let Step { state, action } = prev;

        let q_value = table.get(state, *action);
        let target = reward(state) + self.gamma * max_next;
        let error = target - q_value;
        table.set(state, *action, q_value + self.alpha * error);

        Some(error.abs())
    }

    /// Back up every adjacent pair of steps in `trials`, in the given order
    ///
    /// **Returns** the largest |TD error| of the sweep, `0.0` if nothing was backed up
    pub fn sweep<'a>(&self, table: &mut QTable, trials: impl IntoIterator<Item = &'a Trial>) -> f64 {
        let mut max_error = 0.0_f64;
        for trial in trials {
            for (prev, next) in trial.transitions() {
                if let Some(error) = self.backup(table, prev, next) {
                    max_error = max_error.max(error);
                } else {
                    trace!("no action to bootstrap from at {}", next.state);
                }
            }
        }
        max_error
    }

    /// Sweep `trials` until convergence or until the sweep cap is reached
    ///
    /// `table` must already hold every pair the trials explore, see
    /// [`QTable::from_trials`].
    pub fn train(&self, table: &mut QTable, trials: &[Trial]) -> TrainReport {
        let mut rng = match self.order {
            SweepOrder::Discovery => None,
            SweepOrder::Shuffled { seed } => Some(StdRng::seed_from_u64(seed)),
        };
        let mut order: Vec<&Trial> = trials.iter().collect();

        let mut sweeps = 0;
        loop {
            if let Some(rng) = rng.as_mut() {
                order.shuffle(rng);
            }

            let max_error = self.sweep(table, order.iter().copied());
            sweeps += 1;
            debug!("sweep {sweeps}: max |error| = {max_error:e}");

            if max_error < self.epsilon {
                info!("converged after {sweeps} sweeps (max |error| = {max_error:e})");
                return TrainReport {
                    sweeps,
                    max_error,
                    converged: true,
                };
            }

            if self.max_sweeps.is_some_and(|cap| sweeps >= cap) {
                warn!(
                    "stopped after {sweeps} sweeps without converging (max |error| = {max_error:e}, epsilon = {:e})",
                    self.epsilon
                );
                return TrainReport {
                    sweeps,
                    max_error,
                    converged: false,
                };
            }
        }
    }
}

impl Default for TdEngine {
    fn default() -> Self {
        Self::new(TdConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use crate::game::{Outcome, State};

    use super::*;

    const S0: State = State::new(5, 0, 0, Outcome::InProgress);
    const S1: State = State::new(3, 2, 0, Outcome::InProgress);
    const WON: State = State::new(2, 3, 0, Outcome::AgentWon);

    fn example_trial() -> Trial {
        Trial::from_pairs([
            (S0, Action::Draw(2)),
            (S1, Action::Draw(1)),
            (WON, Action::NoAction),
        ])
    }

    fn trained(trials: &[Trial], config: TdConfig) -> (QTable, TrainReport) {
        let engine = TdEngine::new(config);
        let mut table = QTable::from_trials(trials);
        let report = engine.train(&mut table, trials);
        (table, report)
    }

    #[test]
    fn single_backup_moves_toward_target() {
        let engine = TdEngine::default();
        let trial = example_trial();
        let mut table = QTable::from_trials(std::slice::from_ref(&trial));
        let steps = trial.steps();

        let error = engine.backup(&mut table, &steps[1], &steps[2]);
        assert_eq!(error, Some(0.9 * 3.0), "target is γ·Q(terminal)");
        assert!((table.get(&S1, Action::Draw(1)) - 0.27).abs() < 1e-12);
    }

    #[test]
    fn example_converges() {
        let trials = [example_trial()];
        let (table, report) = trained(&trials, TdConfig::default());

        assert!(report.converged);
        assert_eq!(table.get(&WON, Action::NoAction), 3.0, "terminal value is its reward");
        assert!((table.get(&S1, Action::Draw(1)) - 2.7).abs() < 1e-8);
        assert!((table.get(&S0, Action::Draw(2)) - 0.9 * 2.7).abs() < 1e-8);
    }

    #[test]
    fn one_more_sweep_stays_below_epsilon() {
        let trials = [example_trial()];
        let config = TdConfig {
            epsilon: 1e-6,
            ..Default::default()
        };
        let (mut table, report) = trained(&trials, config.clone());
        assert!(report.converged);

        let engine = TdEngine::new(config);
        assert!(engine.sweep(&mut table, &trials) < 1e-6);
    }

    #[test]
    fn training_is_deterministic() {
        let trials = [
            example_trial(),
            Trial::from_pairs([
                (S0, Action::Draw(1)),
                (State::new(4, 1, 0, Outcome::InProgress), Action::Draw(3)),
                (State::new(1, 4, 3, Outcome::OpponentWon), Action::NoAction),
            ]),
        ];
        let (a, report_a) = trained(&trials, TdConfig::default());
        let (b, report_b) = trained(&trials, TdConfig::default());
        assert_eq!(a, b);
        assert_eq!(report_a, report_b);

        let shuffled = TdConfig {
            order: SweepOrder::Shuffled { seed: 7 },
            ..Default::default()
        };
        let (c, _) = trained(&trials, shuffled.clone());
        let (d, _) = trained(&trials, shuffled);
        assert_eq!(c, d, "a fixed seed reproduces the table");
    }

    #[test]
    fn single_step_trial_is_a_no_op() {
        let trials = [Trial::from_pairs([(WON, Action::NoAction)])];
        let (table, report) = trained(&trials, TdConfig::default());
        assert_eq!(report.sweeps, 1);
        assert_eq!(report.max_error, 0.0);
        assert_eq!(table.get(&WON, Action::NoAction), 3.0);
    }

    #[test]
    fn empty_next_state_skips_backup() {
        let stuck = State::new(0, 2, 2, Outcome::InProgress);
        let trial = Trial::from_pairs([(S1, Action::Draw(3)), (stuck, Action::NoAction)]);
        let mut table = QTable::from_trials(std::slice::from_ref(&trial));
        let engine = TdEngine::default();
        let steps = trial.steps();

        assert_eq!(engine.backup(&mut table, &steps[0], &steps[1]), None);
        assert_eq!(table.get(&S1, Action::Draw(3)), 0.0);
    }

    #[test]
    fn candidate_rule_changes_bootstrap() {
        // Q(S1, 1) stays at 0 while Q(S1, 3) is pinned to a terminal win.
        let trials = [
            Trial::from_pairs([(S0, Action::Draw(2)), (S1, Action::Draw(1))]),
            Trial::from_pairs([(S1, Action::Draw(3)), (WON, Action::NoAction)]),
        ];

        let (all, _) = trained(&trials, TdConfig::default());
        let (first, _) = trained(
            &trials,
            TdConfig {
                candidates: CandidateRule::FirstLegal,
                ..Default::default()
            },
        );

        assert!((all.get(&S0, Action::Draw(2)) - 0.9 * 2.7).abs() < 1e-8);
        assert!(first.get(&S0, Action::Draw(2)).abs() < 1e-8, "only Q(S1, 1) is seen");
    }

    #[test]
    fn sweep_cap_is_reported() {
        let trials = [example_trial()];
        let (_, report) = trained(
            &trials,
            TdConfig {
                epsilon: 0.0,
                max_sweeps: Some(5),
                ..Default::default()
            },
        );

        assert_eq!(report.sweeps, 5);
        assert!(!report.converged);
        assert!(matches!(
            report.into_result(),
            Err(Error::ConvergenceTimeout { sweeps: 5, .. })
        ));
    }

    #[test]
    #[should_panic(expected = "alpha")]
    fn rejects_bad_alpha() {
        TdEngine::new(TdConfig {
            alpha: 1.5,
            ..Default::default()
        });
    }

    #[test]
    fn actions_are_normalized() {
        let engine = TdEngine::new(TdConfig {
            actions: vec![3, 1, 2, 1],
            ..Default::default()
        });
        assert_eq!(engine.actions(), [1, 2, 3]);
    }
}
