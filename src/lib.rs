// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod config;
pub mod eval;
pub mod load;
pub mod report;
pub mod stats;
pub mod table;
