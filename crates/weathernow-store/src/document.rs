//! Document model for the per-user snapshot collection.
//!
//! These are the store-side shapes: `date` is whatever the document holds
//! (normally a native [`Timestamp`]), and `note` may be missing on documents
//! written before notes existed.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Name of the per-user subcollection holding snapshots.
pub const SNAPSHOTS_COLLECTION: &str = "snapshots";

/// Store-native point in time (seconds + nanoseconds since the Unix epoch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl Timestamp {
    /// Current time as a store timestamp.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanoseconds: dt.timestamp_subsec_nanos(),
        }
    }

    /// Convert back to a chrono UTC datetime.
    ///
    /// Out-of-range values collapse to the Unix epoch.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.seconds, self.nanoseconds)
            .single()
            .unwrap_or_default()
    }
}

/// Raw value of a document's `date` field.
///
/// Documents written by this client always carry a [`Timestamp`], but older
/// or hand-edited documents may hold any scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Timestamp(Timestamp),
    Text(String),
    Number(f64),
    Bool(bool),
}

impl DateValue {
    // Cross-type ordering: bool < number < timestamp < string.
    fn type_rank(&self) -> u8 {
        match self {
            DateValue::Bool(_) => 0,
            DateValue::Number(_) => 1,
            DateValue::Timestamp(_) => 2,
            DateValue::Text(_) => 3,
        }
    }

    /// Total order used by ordered queries.
    pub fn store_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (DateValue::Bool(a), DateValue::Bool(b)) => a.cmp(b),
            (DateValue::Number(a), DateValue::Number(b)) => a.total_cmp(b),
            (DateValue::Timestamp(a), DateValue::Timestamp(b)) => a.cmp(b),
            (DateValue::Text(a), DateValue::Text(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl From<Timestamp> for DateValue {
    fn from(ts: Timestamp) -> Self {
        DateValue::Timestamp(ts)
    }
}

/// Fields of one snapshot document as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub city: String,
    pub country: String,
    pub temp: f64,
    pub description: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Partial update for a snapshot document; only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DocumentPatch {
    pub fn note(note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
        }
    }

    /// Merge this patch into a document.
    pub fn apply(&self, doc: &mut SnapshotDocument) {
        if let Some(note) = &self.note {
            doc.note = Some(note.clone());
        }
    }
}

/// A document together with its store-assigned identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub fields: SnapshotDocument,
}

/// The authenticated principal a collection belongs to.
///
/// Every store call is scoped to one user; the bearer token (if any) is what
/// remote backends authenticate the call with.
#[derive(Clone, PartialEq, Eq)]
pub struct UserScope {
    uid: String,
    bearer_token: Option<String>,
}

impl UserScope {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            bearer_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    /// Collection path, e.g. `users/u1/snapshots`.
    pub fn collection_path(&self) -> String {
        format!("users/{}/{}", self.uid, SNAPSHOTS_COLLECTION)
    }
}

impl fmt::Debug for UserScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserScope")
            .field("uid", &self.uid)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Range query over a whole collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Query {
    /// Documents that carry a date, most recent first
    #[default]
    NewestFirst,
}

impl Query {
    pub fn newest_first() -> Self {
        Query::NewestFirst
    }

    /// Value of `orderBy` on the wire.
    pub fn order_by_param(&self) -> &'static str {
        match self {
            Query::NewestFirst => "date desc",
        }
    }
}
