/// Tabular value-based methods
pub mod tabular;
