/// Reconnecting TCP client for the log feed
pub mod client;

/// Wire format of feed lines
pub mod protocol;

pub use client::{FeedClient, FeedHandle, FeedSettings};
pub use protocol::{FeedEvent, FeedFrame, FeedMessage};
