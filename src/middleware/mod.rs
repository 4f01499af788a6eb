pub mod rate_limit;
pub mod rate_limit_memory;

pub use rate_limit::{
    RateLimitConfig, RateLimitState, RateLimiter, account_key, client_key, rate_limit_middleware,
    too_many_requests,
};
pub use rate_limit_memory::MemoryRateLimiter;
