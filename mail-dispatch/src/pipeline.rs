//! Per-recipient delivery pipeline
//!
//! Every record goes through the same gates, in order:
//!
//! 1. address validation
//! 2. de-duplication (first occurrence wins)
//! 3. consent, for list sources only
//! 4. template rendering
//! 5. resource loading and message assembly
//! 6. delivery (or nothing, in dry-run mode), then pacing
//!
//! A recipient that fails a gate is skipped and the run moves on. Only a
//! template referencing an unknown variable or an unreadable list aborts
//! the whole run.

use crate::config::Settings;
use crate::error::{Result, SkipReason};
use crate::mime::{
    Bodies, BuildOptions, ComposedMessage, Envelope, MessageBuilder, ResourceAttacher,
    ResourceKind, ResourcePart,
};
use crate::recipients::RecipientRecord;
use crate::security::Pacer;
use crate::smtp::Transport;
use crate::templates::{TemplateRenderer, TemplateVariables, Templates};
use crate::utils::is_valid_email;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Consent values accepted as affirmative, compared trimmed and lowercased
pub const AFFIRMATIVE_CONSENT: [&str; 4] = ["1", "true", "yes", "y"];

/// Consent gating rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentPolicy {
    pub required: bool,
    /// Column holding the consent marker
    pub field: String,
}

impl Default for ConsentPolicy {
    fn default() -> Self {
        Self {
            required: true,
            field: "consent".to_string(),
        }
    }
}

impl ConsentPolicy {
    pub fn is_affirmative(value: &str) -> bool {
        let value = value.trim().to_lowercase();
        AFFIRMATIVE_CONSENT.contains(&value.as_str())
    }

    /// Whether `record` may be contacted. Explicitly addressed recipients
    /// (`from_list == false`) are never gated.
    pub fn permits(&self, record: &RecipientRecord, from_list: bool) -> bool {
        if !self.required || !from_list {
            return true;
        }
        Self::is_affirmative(record.extra_fields.get_or_empty(&self.field))
    }
}

/// Result of processing one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Delivered, or fully built in dry-run mode
    Sent,
    Skipped(SkipReason),
}

/// Counters for one run. `total == sent + skipped` holds after every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryTally {
    pub total: usize,
    pub sent: usize,
    pub skipped: usize,
}

impl DeliveryTally {
    pub fn record(&mut self, outcome: &Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Sent => self.sent += 1,
            Outcome::Skipped(_) => self.skipped += 1,
        }
    }
}

impl fmt::Display for DeliveryTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} sent={} skipped={}",
            self.total, self.sent, self.skipped
        )
    }
}

/// Where built messages go
pub enum DeliveryMode<'t> {
    /// Build (and optionally save) every message, send nothing
    DryRun,
    /// Send through a connected transport
    Live(&'t mut dyn Transport),
}

/// Sender side shared by every message of a run
#[derive(Debug, Clone)]
pub struct Sender {
    pub from_name: Option<String>,
    pub from_addr: String,
    pub subject: String,
}

/// Processes recipient records one at a time.
///
/// Holds the only mutable state of a run: the set of addresses already
/// accepted and the tally.
pub struct DeliveryPipeline {
    templates: Templates,
    sender: Sender,
    options: BuildOptions,
    consent: ConsentPolicy,
    from_list: bool,
    inline: Vec<PathBuf>,
    attachments: Vec<PathBuf>,
    pacer: Pacer,
    seen: HashSet<String>,
    tally: DeliveryTally,
}

impl DeliveryPipeline {
    pub fn new(templates: Templates, sender: Sender, consent: ConsentPolicy, from_list: bool) -> Self {
        Self {
            templates,
            sender,
            options: BuildOptions::default(),
            consent,
            from_list,
            inline: Vec::new(),
            attachments: Vec::new(),
            pacer: Pacer::disabled(),
            seen: HashSet::new(),
            tally: DeliveryTally::default(),
        }
    }

    /// Pipeline configured from resolved run settings
    pub fn from_settings(settings: &Settings, templates: Templates) -> Self {
        Self::new(
            templates,
            Sender::from(settings),
            settings.consent.clone(),
            settings.source.is_csv(),
        )
        .with_options(BuildOptions {
            reply_to: settings.message.reply_to.clone(),
            unsubscribe: settings.message.unsubscribe.clone(),
            save_eml_dir: settings.save_eml_dir.clone(),
        })
        .with_resources(settings.content.inline.clone(), settings.content.attachments.clone())
        .with_pacer(settings.pacer)
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_resources(mut self, inline: Vec<PathBuf>, attachments: Vec<PathBuf>) -> Self {
        self.inline = inline;
        self.attachments = attachments;
        self
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn tally(&self) -> DeliveryTally {
        self.tally
    }

    /// Process every record and log the summary line.
    ///
    /// # Errors
    /// Stops at the first unreadable record or missing template variable.
    /// Recipients processed up to that point keep their outcome.
    pub async fn run<I>(&mut self, records: I, mut mode: DeliveryMode<'_>) -> Result<DeliveryTally>
    where
        I: IntoIterator<Item = Result<RecipientRecord>>,
    {
        for record in records {
            let record = record?;
            let outcome = self.process(&record, &mut mode).await?;
            self.tally.record(&outcome);
        }

        info!("Done: {}", self.tally);
        Ok(self.tally)
    }

    /// Take one record through every gate.
    pub async fn process(
        &mut self,
        record: &RecipientRecord,
        mode: &mut DeliveryMode<'_>,
    ) -> Result<Outcome> {
        let email = record.email.as_str();

        if !is_valid_email(email) {
            warn!("Skipping invalid address: {:?}", email);
            return Ok(Outcome::Skipped(SkipReason::InvalidAddress));
        }

        if !self.seen.insert(email.to_string()) {
            info!("Skipping duplicate: {}", email);
            return Ok(Outcome::Skipped(SkipReason::Duplicate));
        }

        if !self.consent.permits(record, self.from_list) {
            info!("Skipping (no consent): {}", email);
            return Ok(Outcome::Skipped(SkipReason::NoConsent));
        }

        let vars = TemplateVariables::for_recipient(record);
        let bodies = Bodies {
            text: TemplateRenderer::render(&self.templates.text, &vars)?,
            html: TemplateRenderer::render(&self.templates.html, &vars)?,
        };

        let resources = self.load_resources().await;
        let envelope = Envelope {
            from_name: self.sender.from_name.clone(),
            from_addr: self.sender.from_addr.clone(),
            to: email.to_string(),
            subject: self.sender.subject.clone(),
        };

        let message = match MessageBuilder::build(&envelope, bodies, &resources, &self.options).await {
            Ok(message) => message,
            Err(e) => {
                error!("Could not build message for {}: {}", email, e);
                return Ok(Outcome::Skipped(SkipReason::Build(e.to_string())));
            }
        };

        Ok(self.deliver(&message, mode).await)
    }

    async fn load_resources(&self) -> Vec<ResourcePart> {
        let mut parts = ResourceAttacher::attach_all(&self.inline, ResourceKind::Inline).await;
        parts.extend(ResourceAttacher::attach_all(&self.attachments, ResourceKind::Attachment).await);
        parts
    }

    async fn deliver(&self, message: &ComposedMessage, mode: &mut DeliveryMode<'_>) -> Outcome {
        let to = message.to_address();
        match mode {
            DeliveryMode::DryRun => {
                info!("[dry-run] Built message for {} ({})", to, message.message_id());
                Outcome::Sent
            }
            DeliveryMode::Live(transport) => match transport.send(message).await {
                Ok(()) => {
                    info!("Sent -> {}", to);
                    self.pacer.pause().await;
                    Outcome::Sent
                }
                Err(e) => {
                    error!("Send failed for {}: {}", to, e);
                    Outcome::Skipped(SkipReason::SendFailed(e.to_string()))
                }
            },
        }
    }
}

impl From<&Settings> for Sender {
    fn from(settings: &Settings) -> Self {
        Sender {
            from_name: settings.message.from_name.clone(),
            from_addr: settings.message.from_addr.clone(),
            subject: settings.message.subject.clone(),
        }
    }
}

/// Sorted, de-duplicated placeholder names used by either template
pub fn placeholders(templates: &Templates) -> Vec<String> {
    let mut names = TemplateRenderer::extract_variables(&templates.text);
    names.extend(TemplateRenderer::extract_variables(&templates.html));
    names.sort();
    names.dedup();
    names
}
