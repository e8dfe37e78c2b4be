//! Utility modules
//!
//! - [`email`]: coarse email address validation

pub mod email;

pub use email::{is_valid_email, validate_email};
