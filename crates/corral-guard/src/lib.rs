//! corral-guard — fault isolation for the control plane.
//!
//! Two primitives protect the process from a failing downstream and from
//! request floods:
//!
//! - [`CircuitBreaker`] — a three-state isolator wrapping runtime calls.
//!   After a burst of consecutive failures it short-circuits further calls
//!   until a reset timeout elapses, then probes with a single call.
//! - [`RateLimiter`] — a token bucket with lazy, monotonic-clock refill.
//!
//! Both guard their state with a local mutex; the protected operation
//! itself always runs outside the lock.

pub mod breaker;
pub mod limiter;

pub use breaker::{BreakerConfig, BreakerState, CircuitBreaker, GuardError};
pub use limiter::RateLimiter;
