use lettre::message::header::{Header, HeaderName, HeaderValue};
use std::path::PathBuf;
use thiserror::Error;

/// How a resource file is embedded in a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Embedded and addressable from HTML via `cid:<filename>`
    Inline,
    /// Regular downloadable attachment
    Attachment,
}

/// A file read from disk, ready to become a MIME part
#[derive(Debug, Clone)]
pub struct ResourcePart {
    /// Path the content was read from
    pub path: PathBuf,
    /// Base name of `path`
    pub filename: String,
    pub kind: ResourceKind,
    /// Content-ID without angle brackets; set for inline parts only
    pub content_id: Option<String>,
    /// MIME type guessed from the file extension
    pub content_type: String,
    /// Raw file content
    pub body: Vec<u8>,
}

impl ResourcePart {
    pub fn is_inline(&self) -> bool {
        self.kind == ResourceKind::Inline
    }
}

/// Sender, recipient and subject of one message
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from_name: Option<String>,
    pub from_addr: String,
    pub to: String,
    pub subject: String,
}

/// Rendered bodies; an empty string means the variant is omitted
#[derive(Debug, Clone, Default)]
pub struct Bodies {
    pub text: String,
    pub html: String,
}

/// Optional headers and persistence settings
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub reply_to: Option<String>,
    pub unsubscribe: Option<String>,
    /// Directory to write a `.eml` copy of every built message into
    pub save_eml_dir: Option<PathBuf>,
}

/// A fully assembled message for exactly one recipient
#[derive(Debug, Clone)]
pub struct ComposedMessage {
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) text_body: Option<String>,
    pub(crate) html_body: Option<String>,
    pub(crate) parts: Vec<ResourcePart>,
    pub(crate) message: lettre::Message,
}

impl ComposedMessage {
    /// Top-level headers in the order they were set
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn message_id(&self) -> &str {
        self.header("Message-ID").unwrap_or_default()
    }

    pub fn to(&self) -> &str {
        self.header("To").unwrap_or_default()
    }

    /// Bare recipient address, without display-name decoration
    pub fn to_address(&self) -> &str {
        let to = self.to();
        match (to.rfind('<'), to.rfind('>')) {
            (Some(start), Some(end)) if start < end => &to[start + 1..end],
            _ => to,
        }
    }

    pub fn text_body(&self) -> Option<&str> {
        self.text_body.as_deref()
    }

    pub fn html_body(&self) -> Option<&str> {
        self.html_body.as_deref()
    }

    /// Resource parts, inline parts first
    pub fn parts(&self) -> &[ResourcePart] {
        &self.parts
    }

    /// Content-IDs of the inline parts that made it into the message
    pub fn content_ids(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|p| p.content_id.as_deref())
            .collect()
    }

    /// The lettre message handed to the transport
    pub fn message(&self) -> &lettre::Message {
        &self.message
    }

    /// RFC 5322 serialization of the whole message
    pub fn formatted(&self) -> Vec<u8> {
        self.message.formatted()
    }
}

/// Reasons a message cannot be assembled for a recipient
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("invalid Reply-To {value:?}: {reason}")]
    ReplyTo { value: String, reason: String },

    #[error("invalid content type for {path}: {value}")]
    ContentType { path: String, value: String },

    #[error("message assembly failed: {0}")]
    Message(#[from] lettre::error::Error),
}

/// `List-Unsubscribe` header (RFC 2369), passed through verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListUnsubscribe(pub String);

impl Header for ListUnsubscribe {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("List-Unsubscribe")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}
