pub mod q_table;
pub mod td;

pub use q_table::QTable;
pub use td::{CandidateRule, SweepOrder, TdConfig, TdEngine, TrainReport};
