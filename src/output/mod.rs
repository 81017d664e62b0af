//! Output and reporting helpers

mod stats;

pub use stats::{load_statistics, print_statistics, StoreStatistics};
