//! One complete dispatch run

use crate::config::Settings;
use crate::error::{DispatchError, Result};
use crate::pipeline::{placeholders, DeliveryMode, DeliveryPipeline, DeliveryTally};
use crate::smtp::{SmtpMailer, Transport};
use crate::templates::Templates;
use tracing::{debug, info};

/// Run with the SMTP relay from `settings`, or without any transport in
/// dry-run mode.
///
/// # Errors
/// Template, credential, connection and list errors abort before or
/// during the run. Per-recipient failures only show up in the tally.
pub async fn run(settings: &Settings) -> Result<DeliveryTally> {
    if settings.dry_run {
        return run_with_transport(settings, None).await;
    }

    let (username, password) = settings
        .smtp
        .credentials()
        .ok_or(DispatchError::MissingCredentials)?;
    let mut mailer = SmtpMailer::new(
        settings.smtp.server.clone(),
        settings.smtp.port,
        username,
        password,
    );
    run_with_transport(settings, Some(&mut mailer)).await
}

/// Run against a caller-supplied transport.
///
/// Without a transport, or in dry-run mode, messages are built but never
/// sent. Otherwise the transport is connected once before the first
/// recipient and closed after the last one, also when the run aborts.
pub async fn run_with_transport(
    settings: &Settings,
    transport: Option<&mut dyn Transport>,
) -> Result<DeliveryTally> {
    let templates = Templates::load(
        settings.content.template_text.as_deref(),
        settings.content.template_html.as_deref(),
    )
    .await?;
    debug!("Template placeholders: {:?}", placeholders(&templates));

    let mut pipeline = DeliveryPipeline::from_settings(settings, templates);

    match transport.filter(|_| !settings.dry_run) {
        None => {
            info!("Dry-run mode: messages are built but not sent");
            let records = settings.source.records()?;
            pipeline.run(records, DeliveryMode::DryRun).await
        }
        Some(transport) => {
            transport.connect().await?;
            info!(
                "Connected to {}:{}",
                settings.smtp.server, settings.smtp.port
            );

            let result = match settings.source.records() {
                Ok(records) => pipeline.run(records, DeliveryMode::Live(&mut *transport)).await,
                Err(e) => Err(e),
            };
            transport.close().await;
            result
        }
    }
}
