//! Mirror-side snapshot types.

use serde::{Deserialize, Serialize};
use weathernow_store::{DocumentPatch, SnapshotDocument, StoredDocument, Timestamp};

use crate::serialize::serialize_date;

/// One saved weather observation as held in the mirror.
///
/// `date` is already in display form; the store-native timestamp never
/// reaches the mirror.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub id: String,
    pub city: String,
    pub country: String,
    pub temp: f64,
    pub description: String,
    pub icon: String,
    pub date: String,
    pub note: String,
}

impl Snapshot {
    /// Build a mirror entry from a stored document. A missing note becomes "".
    pub fn from_document(doc: StoredDocument) -> Self {
        let StoredDocument { id, fields } = doc;
        let date = serialize_date(fields.date.as_ref());
        Self {
            id,
            city: fields.city,
            country: fields.country,
            temp: fields.temp,
            description: fields.description,
            icon: fields.icon,
            date,
            note: fields.note.unwrap_or_default(),
        }
    }
}

/// Fields supplied when saving a new snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSnapshot {
    pub city: String,
    pub country: String,
    pub temp: f64,
    pub description: String,
    pub icon: String,
}

impl NewSnapshot {
    /// Document to persist, stamped with `date` and an empty note.
    pub fn into_document(self, date: Timestamp) -> SnapshotDocument {
        SnapshotDocument {
            city: self.city,
            country: self.country,
            temp: self.temp,
            description: self.description,
            icon: self.icon,
            date: Some(date.into()),
            note: Some(String::new()),
        }
    }
}

/// Partial update to a saved snapshot. Only the note is editable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SnapshotPatch {
    pub fn note(note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
        }
    }

    pub fn apply_to(&self, snapshot: &mut Snapshot) {
        if let Some(note) = &self.note {
            snapshot.note = note.clone();
        }
    }

    pub fn into_document_patch(self) -> DocumentPatch {
        DocumentPatch { note: self.note }
    }
}
