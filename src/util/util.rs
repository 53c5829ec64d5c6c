use chrono::{DateTime, NaiveDateTime, ParseError, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

/// File suffixes treated as images, lower case with the leading dot.
pub const IMAGE_SUFFIXES: [&str; 9] = [
    ".jpg", ".jpeg", ".jfif", ".png", ".bmp", ".gif", ".tiff", ".tif", ".webp",
];

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Length of `YYYYmmdd_HHMMSS`.
const TIMESTAMP_SECONDS_LEN: usize = 15;

/// Check if a suffix such as `.JPG` names an image format
pub fn is_image_extension(suffix: &str) -> bool {
    IMAGE_SUFFIXES.contains(&suffix.to_lowercase().as_str())
}

/// Human readable, sortable timestamp: `YYYYmmdd_HHMMSS`, plus `_mmm` milliseconds when `with_ms`.
///
/// Defaults to the current UTC time.
pub fn htimestamp(time: Option<DateTime<Utc>>, with_ms: bool) -> String {
    let time = time.unwrap_or_else(Utc::now);
    let seconds = time.format(TIMESTAMP_FORMAT).to_string();
    if with_ms {
        format!("{}_{:03}", seconds, time.timestamp_subsec_millis())
    } else {
        seconds
    }
}

/// Parse a timestamp written by [`htimestamp`].
///
/// The fractional part may be separated by `_` or `.`.
pub fn htimestamp_parse(value: &str) -> Result<DateTime<Utc>, ParseError> {
    let normalized = match (value.get(..TIMESTAMP_SECONDS_LEN), value.get(TIMESTAMP_SECONDS_LEN..)) {
        (Some(seconds), Some(fraction)) if fraction.starts_with('_') => {
            format!("{}.{}", seconds, &fraction[1..])
        }
        _ => value.to_string(),
    };

    NaiveDateTime::parse_from_str(&normalized, "%Y%m%d_%H%M%S%.f").map(|dt| dt.and_utc())
}

/// First 8 characters of a random v4 UUID
pub fn short_uuid4() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

/// Current timestamp followed by a short UUID, e.g. `20240301_120000_123_1a2b3c4d`.
pub fn htimestamp_uuid() -> String {
    format!("{}_{}", htimestamp(None, true), short_uuid4())
}

/// Remove duplicates by comparing canonical JSON encodings.
///
/// Object keys are serialized in sorted order, so maps with the same entries
/// compare equal. The output is ordered by encoding, not by input position.
pub fn dedup_by_serialization<T, I>(items: I) -> Result<Vec<T>, serde_json::Error>
where
    T: Serialize + DeserializeOwned,
    I: IntoIterator<Item = T>,
{
    let mut encoded = BTreeSet::new();
    for item in items {
        encoded.insert(serde_json::to_value(&item)?.to_string());
    }

    encoded.iter().map(|s| serde_json::from_str(s)).collect()
}
