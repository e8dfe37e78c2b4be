//! Outbound SMTP
//!
//! - [`transport`]: the [`Transport`] seam the delivery pipeline sends through
//! - [`client`]: [`SmtpMailer`], a STARTTLS relay client built on lettre

pub mod client;
pub mod transport;

pub use client::SmtpMailer;
pub use transport::{Transport, TransportError};
