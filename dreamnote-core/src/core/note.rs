//! Note records and the value types used to create or change them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{DreamError, Result};

/// A persisted journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub date: NaiveDate,
    pub created_at: i64,
    pub modified_at: i64,
    /// Attached tag labels, sorted.
    pub tags: Vec<String>,
    /// First attached note type, if any.
    pub note_type: Option<String>,
}

impl Note {
    /// Returns the fields of this note as a draft, ready to be edited and written back.
    pub fn to_draft(&self) -> NoteDraft {
        NoteDraft {
            title: self.title.clone(),
            date: self.date,
            body: self.body.clone(),
            tags: self.tags.clone(),
            note_type: self.note_type.clone(),
        }
    }
}

/// The writable fields of a note.
///
/// Drafts are validated at construction: the title must not be blank.
/// Tags and the note type are normalised the same way the database stores them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub date: NaiveDate,
    pub body: String,
    pub tags: Vec<String>,
    pub note_type: Option<String>,
}

impl NoteDraft {
    /// Creates a draft with an empty body, no tags and no type.
    ///
    /// # Errors
    ///
    /// Returns [`DreamError::Validation`] if `title` is blank.
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Result<Self> {
        let title = title.into().trim().to_string();
        validate_title(&title)?;
        Ok(Self {
            title,
            date,
            body: String::new(),
            tags: vec![],
            note_type: None,
        })
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = normalise_labels(tags);
        self
    }

    pub fn with_note_type(mut self, note_type: impl Into<String>) -> Self {
        self.note_type = normalise_label(note_type);
        self
    }

    /// Merges `changes` into this draft. Absent fields are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DreamError::Validation`] if the change set carries a blank title.
    pub fn apply(&mut self, changes: NoteChanges) -> Result<()> {
        if let Some(title) = changes.title {
            let title = title.trim().to_string();
            validate_title(&title)?;
            self.title = title;
        }
        if let Some(date) = changes.date {
            self.date = date;
        }
        if let Some(body) = changes.body {
            self.body = body;
        }
        if let Some(tags) = changes.tags {
            self.tags = normalise_labels(tags);
        }
        if let Some(note_type) = changes.note_type {
            self.note_type = note_type.and_then(normalise_label);
        }
        Ok(())
    }
}

/// A partial set of field edits, merged into an open buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub body: Option<String>,
    pub tags: Option<Vec<String>>,
    /// `Some(None)` clears the type.
    pub note_type: Option<Option<String>>,
}

impl NoteChanges {
    /// A change set that only replaces the body, as sent after the editor writes a file.
    pub fn body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.is_empty() {
        return Err(DreamError::Validation(
            "A dream needs a non-empty title".to_string(),
        ));
    }
    Ok(())
}

fn normalise_label(label: impl Into<String>) -> Option<String> {
    let label = label.into().trim().to_string();
    (!label.is_empty()).then_some(label)
}

/// Trims labels, drops blank ones and removes duplicates, keeping first-seen order.
pub(crate) fn normalise_labels<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for label in labels.into_iter().filter_map(normalise_label) {
        if !out.contains(&label) {
            out.push(label);
        }
    }
    out
}
