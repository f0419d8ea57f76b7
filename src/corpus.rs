//! Loading recorded trials from a directory tree of trial files
//!
//! Every file with the recognized extension is one trial. Each non-blank line
//! holds one step, `bag/agent/opponent/outcome,action`, e.g. `5/0/0/-,2` or
//! `2/3/0/A,-`.

use std::{
    ffi::OsStr,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use log::{info, trace, warn};
use walkdir::WalkDir;

use crate::{
    error::{Error, Result},
    game::{Action, State},
};

/// Extension of trial files when none is configured
pub const DEFAULT_EXTENSION: &str = "csv";

/// A single recorded step of a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Step {
    /// The state the agent observed
    pub state: State,
    /// The action the agent took in that state
    pub action: Action,
}

/// One recorded playthrough, in the order the steps occurred
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    source: PathBuf,
    steps: Vec<Step>,
}

impl Trial {
    pub fn new(source: impl Into<PathBuf>, steps: Vec<Step>) -> Self {
        Self {
            source: source.into(),
            steps,
        }
    }

    /// Build an in-memory trial from `(state, action)` pairs
    pub fn from_pairs(pairs: impl IntoIterator<Item = (State, Action)>) -> Self {
        Self::new(
            PathBuf::new(),
            pairs
                .into_iter()
                .map(|(state, action)| Step { state, action })
                .collect(),
        )
    }

    /// File the trial was read from, empty for in-memory trials
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Adjacent `(previous, current)` steps in temporal order
    pub fn transitions(&self) -> impl Iterator<Item = (&Step, &Step)> {
        self.steps.windows(2).map(|w| (&w[0], &w[1]))
    }

    /// Every `(state, action)` pair this trial explores
    pub fn pairs(&self) -> impl Iterator<Item = (State, Action)> + '_ {
        self.steps.iter().map(|s| (s.state, s.action))
    }
}

/// 1-based line number and raw text of the first non-blank line at or after
/// byte `offset`
fn line_at(text: &[u8], offset: u64) -> (u64, String) {
    let offset = (offset as usize).min(text.len());
    let offset = text[offset..]
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map_or(text.len(), |i| offset + i);
    let start = text[..offset]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    let end = text[offset..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(text.len(), |i| offset + i);
    let line = text[..offset].iter().filter(|&&b| b == b'\n').count() as u64 + 1;
    (line, String::from_utf8_lossy(&text[start..end]).trim().to_string())
}

/// Parse one trial from `reader`; `path` is only used to label errors
///
/// Blank lines are skipped. Any malformed line aborts the whole trial.
pub fn parse_trial(path: &Path, mut reader: impl Read) -> Result<Trial> {
    let mut text = Vec::new();
    reader.read_to_end(&mut text).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let parse_error = |offset: u64, reason: String| {
        let (line, content) = line_at(&text, offset);
        Error::Parse {
            path: path.to_path_buf(),
            line,
            content,
            reason,
        }
    };

    let mut records = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_slice());

    let mut steps = Vec::new();
    for result in records.records() {
        let record = result.map_err(|e| match e.position().map(|p| p.byte()) {
            Some(offset) => parse_error(offset, e.to_string()),
            None => Error::Csv(e),
        })?;

        if record.len() == 1 && record[0].is_empty() {
            continue;
        }

        // Record positions start before any blank lines the reader skipped
        // and their line counts ignore them; line_at resolves both.
        let offset = record.position().map_or(0, |p| p.byte());

        if record.len() != 2 {
            return Err(parse_error(
                offset,
                format!("expected 2 comma-separated fields, found {}", record.len()),
            ));
        }

        let state = record[0]
            .parse::<State>()
            .map_err(|e| parse_error(offset, e.to_string()))?;
        let action = record[1]
            .parse::<Action>()
            .map_err(|e| parse_error(offset, e.to_string()))?;
        steps.push(Step { state, action });
    }

    Ok(Trial::new(path, steps))
}

/// Recursively load every trial file under `root` with the given extension
///
/// Files are visited in file-name order so the resulting trial order is
/// reproducible. Files without any steps are skipped.
pub fn load(root: impl AsRef<Path>, extension: &str) -> Result<Vec<Trial>> {
    let root = root.as_ref();
    let corpus_error = |reason: String| Error::Corpus {
        path: root.to_path_buf(),
        reason,
    };

    let metadata = std::fs::metadata(root).map_err(|e| corpus_error(e.to_string()))?;
    if !metadata.is_dir() {
        return Err(corpus_error(String::from("not a directory")));
    }

    let mut trials = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension() != Some(OsStr::new(extension)) {
            continue;
        }

        trace!("reading trial {}", path.display());
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let trial = parse_trial(path, file)?;
        if trial.is_empty() {
            warn!("skipping {}: no steps", path.display());
            continue;
        }
        trials.push(trial);
    }

    if trials.is_empty() {
        return Err(corpus_error(format!("no trials with extension '.{extension}'")));
    }

    info!(
        "loaded {} trials ({} steps) from {}",
        trials.len(),
        trials.iter().map(Trial::len).sum::<usize>(),
        root.display()
    );
    Ok(trials)
}
