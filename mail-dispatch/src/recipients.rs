//! Recipient sources
//!
//! A run reads its recipients either from a single address given on the
//! command line or from a CSV file with a header row. Both yield
//! [`RecipientRecord`]s lazily, one at a time, in source order.

use crate::error::Result;
use csv::{StringRecord, StringRecordsIntoIter};
use std::fs::File;
use std::path::PathBuf;
use tracing::debug;

/// Ordered column → value mapping for one recipient.
///
/// Lookups of absent keys yield an empty string through [`Fields::get_or_empty`]
/// so that incomplete rows are caught by validation and consent gating
/// instead of aborting the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    entries: Vec<(String, String)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing the value of an existing key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

/// One recipient as produced by a [`RecipientSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientRecord {
    pub email: String,
    pub display_name: String,
    /// Every column of the source row, in column order. Empty for a
    /// single explicit recipient.
    pub extra_fields: Fields,
}

/// Where the recipients of a run come from.
#[derive(Debug, Clone)]
pub enum RecipientSource {
    /// One explicit recipient from the command line.
    Single { email: String, name: String },
    /// One recipient per data row of a CSV file.
    Csv {
        path: PathBuf,
        email_field: String,
        name_field: String,
    },
}

impl RecipientSource {
    /// True when recipients come from a list rather than an explicit address.
    pub fn is_csv(&self) -> bool {
        matches!(self, RecipientSource::Csv { .. })
    }

    /// Open the source and return a single-pass iterator over its records.
    pub fn records(&self) -> Result<Recipients> {
        match self {
            RecipientSource::Single { email, name } => Ok(Recipients {
                inner: RecipientsInner::Single(Some(RecipientRecord {
                    email: email.clone(),
                    display_name: name.clone(),
                    extra_fields: Fields::new(),
                })),
            }),
            RecipientSource::Csv {
                path,
                email_field,
                name_field,
            } => {
                let mut reader = csv::ReaderBuilder::new()
                    .has_headers(true)
                    .flexible(true)
                    .from_path(path)?;
                let headers = reader.headers()?.clone();
                debug!(
                    "Reading recipients from {} (columns: {})",
                    path.display(),
                    headers.iter().collect::<Vec<_>>().join(", ")
                );

                Ok(Recipients {
                    inner: RecipientsInner::Csv {
                        rows: reader.into_records(),
                        headers,
                        email_field: email_field.clone(),
                        name_field: name_field.clone(),
                    },
                })
            }
        }
    }
}

/// Lazy iterator returned by [`RecipientSource::records`].
pub struct Recipients {
    inner: RecipientsInner,
}

enum RecipientsInner {
    Single(Option<RecipientRecord>),
    Csv {
        rows: StringRecordsIntoIter<File>,
        headers: StringRecord,
        email_field: String,
        name_field: String,
    },
}

impl Iterator for Recipients {
    type Item = Result<RecipientRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            RecipientsInner::Single(record) => record.take().map(Ok),
            RecipientsInner::Csv {
                rows,
                headers,
                email_field,
                name_field,
            } => {
                let row = match rows.next()? {
                    Ok(row) => row,
                    Err(e) => return Some(Err(e.into())),
                };

                // Short rows leave trailing columns empty.
                let extra_fields: Fields = headers
                    .iter()
                    .enumerate()
                    .map(|(i, column)| (column, row.get(i).unwrap_or("")))
                    .collect();

                Some(Ok(RecipientRecord {
                    email: extra_fields.get_or_empty(email_field).trim().to_string(),
                    display_name: extra_fields.get_or_empty(name_field).trim().to_string(),
                    extra_fields,
                }))
            }
        }
    }
}
