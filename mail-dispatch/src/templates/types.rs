//! Template types and data structures

use crate::error::{DispatchError, Result};
use crate::recipients::RecipientRecord;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Plain text body used when no `--template-text` file is given
pub const DEFAULT_TEXT_TEMPLATE: &str = "Hi {name},\n\nThis is a friendly message.\n";

/// HTML body used when no `--template-html` file is given
pub const DEFAULT_HTML_TEMPLATE: &str =
    "<p>Hi <strong>{name}</strong>,</p><p>This is a friendly message.</p>";

/// Placeholder values for one recipient
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVariables {
    values: HashMap<String, String>,
}

impl TemplateVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the variables for a recipient.
    ///
    /// `name` falls back to the address when the display name is empty.
    /// Row columns are merged afterwards and never overwrite `name` or `email`.
    pub fn for_recipient(record: &RecipientRecord) -> Self {
        let mut vars = Self::new();
        let name = if record.display_name.is_empty() {
            &record.email
        } else {
            &record.display_name
        };
        vars.insert("name", name.clone());
        vars.insert("email", record.email.clone());

        for (key, value) in record.extra_fields.iter() {
            vars.values
                .entry(key.to_string())
                .or_insert_with(|| value.to_string());
        }
        vars
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TemplateVariables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = Self::new();
        for (k, v) in iter {
            vars.insert(k, v);
        }
        vars
    }
}

/// The text and HTML body templates of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    /// Plain text body; empty means no text part
    pub text: String,
    /// HTML body; empty means no HTML part
    pub html: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT_TEMPLATE.to_string(),
            html: DEFAULT_HTML_TEMPLATE.to_string(),
        }
    }
}

impl Templates {
    /// Load templates from disk, using the built-in defaults for any path not given.
    ///
    /// # Errors
    /// Returns [`DispatchError::TemplateRead`] if a given file cannot be read.
    pub async fn load(text_path: Option<&Path>, html_path: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();
        let text = match text_path {
            Some(path) => read_template(path).await?,
            None => defaults.text,
        };
        let html = match html_path {
            Some(path) => read_template(path).await?,
            None => defaults.html,
        };
        Ok(Self { text, html })
    }
}

async fn read_template(path: &Path) -> Result<String> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DispatchError::TemplateRead {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Loaded template {} ({} bytes)", path.display(), content.len());
    Ok(content)
}
