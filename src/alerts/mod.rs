/// Alert manager and rate limiting
pub mod alert_manager;
pub mod rate_limiter;

pub use alert_manager::{AlertManager, AlertSink, LogAlertSink, ServiceAlert};
pub use rate_limiter::RateLimiter;
