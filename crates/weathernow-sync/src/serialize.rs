//! Conversion of store-native field values into their display form.

use chrono::{DateTime, Local, Utc};
use weathernow_store::DateValue;

/// Display format for snapshot dates, e.g. `5/1/2024, 2:05:09 PM`.
pub const DISPLAY_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Turn a document's `date` field into the string kept in the mirror.
///
/// Timestamps are rendered in local time and other scalars are stringified
/// as-is. A missing or blank value (empty text, zero, NaN, `false`) falls
/// back to the current time.
pub fn serialize_date(value: Option<&DateValue>) -> String {
    match value {
        Some(DateValue::Timestamp(ts)) => format_local(ts.to_datetime()),
        Some(DateValue::Text(text)) if !text.is_empty() => text.clone(),
        Some(DateValue::Number(n)) if *n != 0.0 && !n.is_nan() => n.to_string(),
        Some(DateValue::Bool(true)) => true.to_string(),
        _ => format_local(Utc::now()),
    }
}

fn format_local(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format(DISPLAY_FORMAT).to_string()
}
