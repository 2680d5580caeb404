//! Per-message-type rate limiting on top of shared counters.

mod backend;
mod limiter;
pub mod policy;
mod pool;

pub use backend::Limiter;
pub use limiter::TypeScopedLimiter;
pub use policy::{Policy, PolicyRule, TimeUnit};
pub use pool::LimiterPool;
