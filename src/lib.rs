//! Herald - Rate-Limited User Notifications
//!
//! This crate sends users notifications whose frequency is capped per
//! message type. Hit counters live in a shared store (Redis in production),
//! so every instance of the service enforces the same limits without
//! coordinating with the others.

pub mod config;
pub mod error;
pub mod notify;
pub mod ratelimit;
pub mod store;
