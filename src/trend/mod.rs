/// Window partitioning shared by the trend charts
pub mod buckets;

/// Error-rate trend
pub mod error_trend;

/// Per-level volume timeline
pub mod volume;

pub use buckets::{BucketPartition, BucketSpan, TREND_BUCKET_COUNT};
pub use error_trend::{build_trend, ErrorTrend, TrendBucket};
pub use volume::{build_volume_timeline, VolumeBucket};
