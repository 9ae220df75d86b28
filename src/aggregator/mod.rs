/// Bounded log buffer and its thread-shared wrapper
pub mod log_buffer;

/// Time-window selection
pub mod window;

/// Grouping and per-group metrics
pub mod grouping;

pub use grouping::{group_by, percentage, GroupMetrics, RECENT_ACTIVITY_MINUTES};
pub use log_buffer::{LogBuffer, SharedLogBuffer, DEFAULT_CAPACITY};
pub use window::{select_window, ReferencePolicy, TimeWindow, WindowedEntry};
