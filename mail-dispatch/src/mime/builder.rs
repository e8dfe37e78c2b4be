//! Message assembly and `.eml` persistence

use crate::mime::types::{
    Bodies, BuildError, BuildOptions, ComposedMessage, Envelope, ListUnsubscribe, ResourcePart,
};
use chrono::Utc;
use lettre::message::header::{self, ContentType};
use lettre::message::{Attachment, Mailbox, Mailboxes, MultiPart, SinglePart};
use lettre::{Address, Message};
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use uuid::Uuid;

/// Builds one [`ComposedMessage`] per recipient.
///
/// Layout:
///
/// ```text
/// multipart/mixed
/// ├── multipart/alternative (text/plain, text/html; whichever is non-empty)
/// ├── inline parts (Content-ID: <filename>)
/// └── attachments
/// ```
pub struct MessageBuilder;

impl MessageBuilder {
    /// Assemble a message and, when `options.save_eml_dir` is set, write a
    /// copy of it to disk.
    ///
    /// Persistence failures are logged and do not fail the build.
    ///
    /// # Errors
    /// Returns [`BuildError`] if an address or header cannot be encoded.
    pub async fn build(
        envelope: &Envelope,
        bodies: Bodies,
        resources: &[ResourcePart],
        options: &BuildOptions,
    ) -> Result<ComposedMessage, BuildError> {
        let composed = Self::compose(envelope, bodies, resources, options)?;

        if let Some(dir) = &options.save_eml_dir {
            match Self::save_eml(&composed, dir).await {
                Ok(path) => debug!("Saved EML: {}", path.display()),
                Err(e) => error!("Failed to save EML for {}: {}", envelope.to, e),
            }
        }

        Ok(composed)
    }

    fn compose(
        envelope: &Envelope,
        bodies: Bodies,
        resources: &[ResourcePart],
        options: &BuildOptions,
    ) -> Result<ComposedMessage, BuildError> {
        let from_addr: Address = envelope.from_addr.parse()?;
        let from_name = envelope.from_name.clone().filter(|name| !name.is_empty());
        let from = Mailbox::new(from_name, from_addr.clone());
        let to = Mailbox::new(None, envelope.to.parse::<Address>()?);
        let message_id = format!("<{}@{}>", Uuid::new_v4(), from_addr.domain());

        let mut headers = vec![
            ("From".to_string(), from.to_string()),
            ("To".to_string(), to.to_string()),
            ("Subject".to_string(), envelope.subject.clone()),
            ("Message-ID".to_string(), message_id.clone()),
        ];

        let mut builder = Message::builder()
            .from(from)
            .to(to)
            .subject(envelope.subject.clone())
            .message_id(Some(message_id))
            .date_now();

        if let Some(reply_to) = options.reply_to.as_deref().filter(|r| !r.is_empty()) {
            let mailboxes = reply_to
                .parse::<Mailboxes>()
                .map_err(|e| BuildError::ReplyTo {
                    value: reply_to.to_string(),
                    reason: e.to_string(),
                })?;
            builder = builder.header(header::ReplyTo::from(mailboxes));
            headers.push(("Reply-To".to_string(), reply_to.to_string()));
        }
        if let Some(unsubscribe) = options.unsubscribe.as_deref().filter(|u| !u.is_empty()) {
            builder = builder.header(ListUnsubscribe(unsubscribe.to_string()));
            headers.push(("List-Unsubscribe".to_string(), unsubscribe.to_string()));
        }

        let text_body = Some(bodies.text).filter(|text| !text.is_empty());
        let html_body = Some(bodies.html).filter(|html| !html.is_empty());

        let mut alternative = MultiPart::alternative().build();
        if let Some(text) = &text_body {
            alternative = alternative.singlepart(SinglePart::plain(text.clone()));
        }
        if let Some(html) = &html_body {
            alternative = alternative.singlepart(SinglePart::html(html.clone()));
        }

        // Inline parts go first, each group keeps the caller's order.
        let parts: Vec<ResourcePart> = resources
            .iter()
            .filter(|p| p.is_inline())
            .chain(resources.iter().filter(|p| !p.is_inline()))
            .cloned()
            .collect();

        let mut mixed = MultiPart::mixed().multipart(alternative);
        for part in &parts {
            mixed = mixed.singlepart(Self::resource_part(part)?);
        }

        let message = builder.multipart(mixed)?;

        Ok(ComposedMessage {
            headers,
            text_body,
            html_body,
            parts,
            message,
        })
    }

    fn resource_part(part: &ResourcePart) -> Result<SinglePart, BuildError> {
        let content_type =
            ContentType::parse(&part.content_type).map_err(|_| BuildError::ContentType {
                path: part.path.display().to_string(),
                value: part.content_type.clone(),
            })?;

        let attachment = match &part.content_id {
            Some(cid) if part.is_inline() => Attachment::new_inline(cid.clone()),
            _ => Attachment::new(part.filename.clone()),
        };
        Ok(attachment.body(part.body.clone(), content_type))
    }

    /// Write the serialized message to `dir`, creating the directory if needed.
    pub async fn save_eml(message: &ComposedMessage, dir: &Path) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(Self::eml_filename(message.to_address(), Utc::now().timestamp()));
        tokio::fs::write(&path, message.formatted()).await?;
        Ok(path)
    }

    /// `<to>_<timestamp>.eml` with every character outside `[A-Za-z0-9_.-]`
    /// replaced by `_`.
    pub fn eml_filename(to: &str, timestamp: i64) -> String {
        format!("{}_{}.eml", to, timestamp)
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}
