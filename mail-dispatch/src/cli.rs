//! Command-line interface

use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// Consent-aware transactional email dispatcher
///
/// Sends a personalised text/HTML message to one address or to every row of
/// a CSV file, honouring consent markers and a send rate limit.
#[derive(Parser, Debug, Clone)]
#[command(name = "mail-dispatch", version)]
#[command(group(ArgGroup::new("recipients").required(true).args(["to", "csv"])))]
pub struct Cli {
    /// Single recipient address
    #[arg(long, value_name = "ADDR")]
    pub to: Option<String>,

    /// CSV file with a header row (email, name, consent, ...)
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Display name of the single recipient
    #[arg(long)]
    pub name: Option<String>,

    /// CSV column holding the address
    #[arg(long, default_value = "email")]
    pub email_field: String,

    /// CSV column holding the display name
    #[arg(long, default_value = "name")]
    pub name_field: String,

    /// CSV column holding the consent marker
    #[arg(long, default_value = "consent")]
    pub consent_field: String,

    /// Only send to CSV rows with affirmative consent (default)
    #[arg(long, overrides_with = "no_require_consent")]
    pub require_consent: bool,

    /// Send to CSV rows regardless of their consent column
    #[arg(long, overrides_with = "require_consent")]
    pub no_require_consent: bool,

    /// Message subject
    #[arg(long, default_value = "Hello from Example")]
    pub subject: String,

    /// Sender address; defaults to the SMTP username, or a placeholder in a dry run
    #[arg(long, value_name = "ADDR")]
    pub from_addr: Option<String>,

    /// Sender display name; pass an empty string to omit it
    #[arg(long, default_value = "Example Team")]
    pub from_name: String,

    /// Reply-To address or comma-separated list of addresses
    #[arg(long, value_name = "ADDR")]
    pub reply_to: Option<String>,

    /// List-Unsubscribe header value, e.g. "<mailto:unsubscribe@example.com>"
    #[arg(long, value_name = "VALUE")]
    pub unsubscribe: Option<String>,

    /// Plain text template file; supports {name}, {email} and CSV columns
    #[arg(long, value_name = "PATH")]
    pub template_text: Option<PathBuf>,

    /// HTML template file; inline resources are referenced as cid:<filename>
    #[arg(long, value_name = "PATH")]
    pub template_html: Option<PathBuf>,

    /// Attachment file (repeatable)
    #[arg(long, value_name = "PATH")]
    pub attach: Vec<PathBuf>,

    /// Inline resource file, e.g. an image (repeatable)
    #[arg(long, value_name = "PATH")]
    pub inline: Vec<PathBuf>,

    /// Directory to save a .eml copy of every message into
    #[arg(long, value_name = "DIR")]
    pub save_eml_dir: Option<PathBuf>,

    /// SMTP server [env: MAIL_SERVER]
    #[arg(long)]
    pub server: Option<String>,

    /// SMTP port [env: MAIL_PORT, default: 587]
    #[arg(long)]
    pub port: Option<u16>,

    /// SMTP username [env: MAIL_USERNAME]
    #[arg(long)]
    pub username: Option<String>,

    /// SMTP password [env: MAIL_PASSWORD]
    #[arg(long)]
    pub password: Option<String>,

    /// TOML file with server, port, username and password keys
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum sends per minute; 0 or less disables pacing
    #[arg(long, value_name = "RATE", allow_negative_numbers = true)]
    pub rate_per_minute: Option<f64>,

    /// Build every message but do not send anything
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Whether CSV recipients must carry an affirmative consent marker
    pub fn consent_required(&self) -> bool {
        !self.no_require_consent
    }
}
