//! Reading attachment and inline resource files

use crate::mime::types::{ResourceKind, ResourcePart};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, error, warn};

/// Loads resource files as MIME parts.
///
/// Resources are best effort: a file that cannot be read is logged and
/// left out of the message, it never aborts message construction.
pub struct ResourceAttacher;

impl ResourceAttacher {
    /// Read `path` and wrap it as a part of the given kind.
    ///
    /// Inline parts use the file's base name as their Content-ID.
    /// Returns `None` when the file cannot be read.
    pub async fn attach(path: &Path, kind: ResourceKind) -> Option<ResourcePart> {
        let label = match kind {
            ResourceKind::Inline => "Inline resource",
            ResourceKind::Attachment => "Attachment",
        };

        let body = match tokio::fs::read(path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("{} not found, skipping: {}", label, path.display());
                return None;
            }
            Err(e) => {
                error!("{} could not be read {}: {}", label, path.display(), e);
                return None;
            }
        };

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content_type = Self::guess_content_type(path);
        let content_id = match kind {
            ResourceKind::Inline => Some(filename.clone()),
            ResourceKind::Attachment => None,
        };

        debug!(
            "{} loaded: {} ({}, {} bytes)",
            label,
            filename,
            content_type,
            body.len()
        );

        Some(ResourcePart {
            path: path.to_path_buf(),
            filename,
            kind,
            content_id,
            content_type,
            body,
        })
    }

    /// Load every path of one kind, keeping the given order and dropping
    /// the ones that could not be read.
    pub async fn attach_all<P: AsRef<Path>>(paths: &[P], kind: ResourceKind) -> Vec<ResourcePart> {
        let mut parts = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(part) = Self::attach(path.as_ref(), kind).await {
                parts.push(part);
            }
        }
        parts
    }

    /// MIME type from the file extension, `application/octet-stream` when unknown
    pub fn guess_content_type(path: &Path) -> String {
        mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}
