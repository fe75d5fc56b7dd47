//! Concrete background jobs.

pub mod monthly_resync;
pub mod search_counts_reset;

pub use monthly_resync::MonthlyResyncJob;
pub use search_counts_reset::SearchCountsResetJob;
