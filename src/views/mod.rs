//! Derived view models computed from a buffer snapshot
//!
//! Every function here is pure: the same entries, window and policy always
//! give the same output.

pub mod app_performance;
pub mod level_distribution;
pub mod service_status;
pub mod top_errors;

pub use app_performance::{application_performance, AppStats, StatusSummary};
pub use level_distribution::{LevelDistribution, LevelShare};
pub use service_status::{service_status, ServiceStatus};
pub use top_errors::{top_errors, ErrorMessageRank, ERROR_KEY_CHARS};
