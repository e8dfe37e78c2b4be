//! mail-dispatch: consent-aware transactional email dispatcher
//!
//! Sends a personalised plain text and HTML message to a single address or
//! to every row of a CSV list, over one authenticated STARTTLS session.
//!
//! # Features
//!
//! - **Recipients**: one `--to` address or a CSV list with arbitrary columns
//! - **Consent**: list rows need an affirmative consent marker by default
//! - **Templates**: `{name}`, `{email}` and any CSV column as placeholders
//! - **MIME**: alternative text/HTML bodies, inline images, attachments
//! - **Dry-run**: build and optionally save `.eml` files without sending
//! - **Pacing**: fixed delay between sends
//!
//! # Example
//!
//! ```no_run
//! use clap::Parser;
//! use mail_dispatch::{cli::Cli, config::Settings, dispatch};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cli = Cli::parse_from(["mail-dispatch", "--to", "ann@example.com", "--dry-run",
//!                                "--from-addr", "team@example.com"]);
//!     let settings = Settings::resolve(&cli)?;
//!     let tally = dispatch::run(&settings).await?;
//!     println!("{}", tally);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`cli`]: Command-line arguments
//! - [`config`]: Layered settings resolution
//! - [`recipients`]: Recipient sources
//! - [`templates`]: Body templates and rendering
//! - [`mime`]: Message assembly and resources
//! - [`pipeline`]: Per-recipient gates and tally
//! - [`smtp`]: Transport abstraction and SMTP client
//! - [`security`]: Send pacing
//! - [`dispatch`]: Complete runs
//! - [`utils`]: Address validation

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod mime;
pub mod pipeline;
pub mod recipients;
pub mod security;
pub mod smtp;
pub mod templates;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use error::{DispatchError, Result, SkipReason};
pub use pipeline::{DeliveryTally, Outcome};
