//! Run configuration
//!
//! All settings are resolved once, before any recipient is processed, into
//! an immutable [`Settings`]. Transport settings are layered, lowest
//! precedence first:
//!
//! 1. built-in defaults (`smtp.example.com`, port `587`)
//! 2. the optional `--config` TOML file
//! 3. `MAIL_SERVER`, `MAIL_PORT`, `MAIL_USERNAME`, `MAIL_PASSWORD`
//! 4. `--server`, `--port`, `--username`, `--password`

use crate::cli::Cli;
use crate::error::{DispatchError, Result};
use crate::pipeline::ConsentPolicy;
use crate::recipients::RecipientSource;
use crate::security::Pacer;
use crate::utils::validate_email;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

pub const DEFAULT_SMTP_SERVER: &str = "smtp.example.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Sender used by dry runs that have no `--from-addr` and no username
pub const DRY_RUN_SENDER: &str = "dry-run@example.invalid";

/// Environment variable prefix for transport settings
pub const ENV_PREFIX: &str = "MAIL";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SmtpSettings {
    /// Username and password, if both are present and non-empty
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().filter(|u| !u.is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.is_empty())?;
        Some((username, password))
    }
}

/// Sender side of every message
#[derive(Debug, Clone)]
pub struct MessageSettings {
    pub subject: String,
    pub from_name: Option<String>,
    pub from_addr: String,
    pub reply_to: Option<String>,
    pub unsubscribe: Option<String>,
}

/// Template and resource files
#[derive(Debug, Clone, Default)]
pub struct ContentSettings {
    pub template_text: Option<PathBuf>,
    pub template_html: Option<PathBuf>,
    pub attachments: Vec<PathBuf>,
    pub inline: Vec<PathBuf>,
}

/// Fully resolved configuration of one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub source: RecipientSource,
    pub consent: ConsentPolicy,
    pub message: MessageSettings,
    pub content: ContentSettings,
    pub save_eml_dir: Option<PathBuf>,
    pub dry_run: bool,
    pub pacer: Pacer,
    pub smtp: SmtpSettings,
}

impl Settings {
    /// Resolve settings from the command line and the process environment.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        Self::resolve_with_env(cli, None)
    }

    /// Resolve settings with an explicit environment map instead of the
    /// process environment. `None` reads the process environment.
    ///
    /// # Errors
    /// - [`DispatchError::Config`] for unreadable config files or bad values
    /// - [`DispatchError::MissingCredentials`] in live mode without username/password
    /// - [`DispatchError::InvalidSender`] when no usable sender address resolves
    /// - [`DispatchError::Config`] for an unparsable `--reply-to` or an unusable rate
    pub fn resolve_with_env(cli: &Cli, env: Option<config::Map<String, String>>) -> Result<Self> {
        let smtp = Self::resolve_smtp(cli, env)?;

        if !cli.dry_run && smtp.credentials().is_none() {
            return Err(DispatchError::MissingCredentials);
        }

        let from_addr = Self::resolve_sender(cli, &smtp)?;

        let reply_to = non_empty(&cli.reply_to);
        if let Some(reply_to) = &reply_to {
            reply_to
                .parse::<lettre::message::Mailboxes>()
                .map_err(|e| DispatchError::Config(format!("invalid --reply-to {:?}: {}", reply_to, e)))?;
        }

        let pacer = Pacer::try_per_minute(cli.rate_per_minute).map_err(DispatchError::Config)?;

        let source = match (&cli.csv, &cli.to) {
            (Some(path), _) => RecipientSource::Csv {
                path: path.clone(),
                email_field: cli.email_field.clone(),
                name_field: cli.name_field.clone(),
            },
            (None, Some(to)) => RecipientSource::Single {
                email: to.clone(),
                name: cli.name.clone().unwrap_or_default(),
            },
            (None, None) => {
                return Err(DispatchError::Config(
                    "either --to or --csv is required".to_string(),
                ))
            }
        };

        let settings = Settings {
            source,
            consent: ConsentPolicy {
                required: cli.consent_required(),
                field: cli.consent_field.clone(),
            },
            message: MessageSettings {
                subject: cli.subject.clone(),
                from_name: Some(cli.from_name.clone()).filter(|n| !n.is_empty()),
                from_addr,
                reply_to,
                unsubscribe: non_empty(&cli.unsubscribe),
            },
            content: ContentSettings {
                template_text: cli.template_text.clone(),
                template_html: cli.template_html.clone(),
                attachments: cli.attach.clone(),
                inline: cli.inline.clone(),
            },
            save_eml_dir: cli.save_eml_dir.clone(),
            dry_run: cli.dry_run,
            pacer,
            smtp,
        };

        debug!(
            "Resolved settings: server={}:{} dry_run={} consent_required={} send_delay={:?}",
            settings.smtp.server,
            settings.smtp.port,
            settings.dry_run,
            settings.consent.required,
            settings.pacer.delay()
        );

        Ok(settings)
    }

    /// `--from-addr`, else the SMTP username. A dry run without either
    /// builds messages from [`DRY_RUN_SENDER`]; an address that is given
    /// but unusable is always fatal.
    fn resolve_sender(cli: &Cli, smtp: &SmtpSettings) -> Result<String> {
        let configured = non_blank(&cli.from_addr).or_else(|| non_blank(&smtp.username));

        let from_addr = match configured {
            Some(addr) => addr.to_string(),
            None if cli.dry_run => {
                warn!("No sender address configured, using {} for the dry run", DRY_RUN_SENDER);
                DRY_RUN_SENDER.to_string()
            }
            None => {
                return Err(DispatchError::InvalidSender(
                    "no sender address: set --from-addr or MAIL_USERNAME".to_string(),
                ))
            }
        };

        validate_email(&from_addr).map_err(|_| DispatchError::InvalidSender(from_addr.clone()))?;
        from_addr
            .parse::<lettre::Address>()
            .map_err(|e| DispatchError::InvalidSender(format!("{}: {}", from_addr, e)))?;
        Ok(from_addr)
    }

    fn resolve_smtp(cli: &Cli, env: Option<config::Map<String, String>>) -> Result<SmtpSettings> {
        let mut builder = config::Config::builder()
            .set_default("server", DEFAULT_SMTP_SERVER)?
            .set_default("port", i64::from(DEFAULT_SMTP_PORT))?;

        if let Some(path) = &cli.config {
            builder = builder.add_source(
                config::File::from(path.as_path())
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let smtp = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).source(env))
            .set_override_option("server", cli.server.clone())?
            .set_override_option("port", cli.port.map(i64::from))?
            .set_override_option("username", cli.username.clone())?
            .set_override_option("password", cli.password.clone())?
            .build()?
            .try_deserialize::<SmtpSettings>()?;

        Ok(smtp)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
