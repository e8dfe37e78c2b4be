//! Outbound pacing
//!
//! - [`rate_limit`]: fixed delay between successful live sends

pub mod rate_limit;

pub use rate_limit::Pacer;
