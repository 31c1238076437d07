// Stat derivation: rate-stat formulas and wOBA constants.

pub mod derive;
pub mod woba;

pub use derive::derive_stats;
pub use woba::{WobaTable, WobaWeights};
