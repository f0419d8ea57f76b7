use std::{collections::HashMap, path::Path};

use crate::{
    corpus::Trial,
    error::{Error, Result},
    game::{reward, Action, State},
};

/// Action values for every explored state-action pair
///
/// Only pairs that appear in some trial are stored. Looking up any other pair
/// yields the immediate [reward] of its state, which is also the value every
/// stored entry starts from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QTable {
    values: HashMap<(State, Action), f64>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table holding the initial value of every pair explored by `trials`
    pub fn from_trials(trials: &[Trial]) -> Self {
        let mut table = Self::new();
        table.initialize(trials.iter().flat_map(Trial::pairs));
        table
    }

    /// Reset each of `pairs` to the reward of its state, adding it if missing
    pub fn initialize(&mut self, pairs: impl IntoIterator<Item = (State, Action)>) {
        for (state, action) in pairs {
            self.values.insert((state, action), reward(&state));
        }
    }

    /// Value of a pair, falling back to the reward of `state` if it was never explored
    pub fn get(&self, state: &State, action: Action) -> f64 {
        self.values
            .get(&(*state, action))
            .copied()
            .unwrap_or_else(|| reward(state))
    }

    /// Overwrite the value of an explored pair
    ///
    /// Unexplored pairs are never stored; asking to do so is a logic error.
    pub fn set(&mut self, state: &State, action: Action, value: f64) {
        match self.values.get_mut(&(*state, action)) {
            Some(entry) => *entry = value,
            None => debug_assert!(false, "set called for unexplored pair ({state}, {action})"),
        }
    }

    pub fn is_explored(&self, state: &State, action: Action) -> bool {
        self.values.contains_key(&(*state, action))
    }

    /// Number of explored pairs
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(State, Action), &f64)> {
        self.values.iter()
    }

    /// Entries sorted by state then action
    pub fn sorted(&self) -> Vec<(State, Action, f64)> {
        let mut entries: Vec<_> = self.values.iter().map(|(&(s, a), &v)| (s, a, v)).collect();
        entries.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
        entries
    }

    /// Dump the table as `state,action,value` rows
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["state", "action", "value"])?;
        for (state, action, value) in self.sorted() {
            writer.write_record([state.to_string(), action.to_string(), value.to_string()])?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Reload a table written by [`QTable::write_csv`]
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut values = HashMap::new();
        for result in reader.records() {
            let record = result?;
            let parse_error = |reason: String| Error::Parse {
                path: path.to_path_buf(),
                line: record.position().map_or(0, |p| p.line()),
                content: record.iter().collect::<Vec<_>>().join(","),
                reason,
            };

            let [state, action, value] = [0, 1, 2].map(|i| record.get(i).unwrap_or_default());
            let state = state
                .parse::<State>()
                .map_err(|e| parse_error(e.to_string()))?;
            let action = action
                .parse::<Action>()
                .map_err(|e| parse_error(e.to_string()))?;
            let value = value
                .parse::<f64>()
                .map_err(|e| parse_error(format!("value '{value}': {e}")))?;
            values.insert((state, action), value);
        }

        Ok(Self { values })
    }
}
