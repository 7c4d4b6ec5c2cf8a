//! Staging name scheme: `<date>@@<id>@@<basename>[_uploaded]`.

use chrono::{DateTime, Datelike, Local, Timelike, Utc};

use crate::config::NameTimezone;
use crate::record::Record;

/// Separator between the three name components. Never expected inside `date` or `id`.
pub const DELIMITER: &str = "@@";

/// Appended to the whole name once the asset has been uploaded.
pub const TRANSFERRED_SUFFIX: &str = "_uploaded";

/// The basename component keeps only this many trailing characters.
const MAX_BASENAME_CHARS: usize = 150;

/// Used when the url has no usable last segment.
const DEFAULT_FILENAME: &str = "download.bin";

/// Components recovered from a staging name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub date: String,
    pub id: String,
    pub filename: String,
}

/// Render `ts` as `YYYY-MM-DD-HH-mm-ss-S`.
///
/// The month field is zero-based and milliseconds are unpadded so names match
/// staging directories populated by earlier tooling.
pub fn format_date(ts: &DateTime<Utc>, tz: NameTimezone) -> String {
    match tz {
        NameTimezone::Utc => render(&ts.naive_utc()),
        NameTimezone::Local => render(&ts.with_timezone(&Local).naive_local()),
    }
}

fn render<T: Datelike + Timelike>(t: &T) -> String {
    format!(
        "{}-{:02}-{:02}-{:02}-{:02}-{:02}-{}",
        t.year(),
        t.month0(),
        t.day(),
        t.hour(),
        t.minute(),
        t.second(),
        t.nanosecond() / 1_000_000 % 1000,
    )
}

/// Last path segment of a url string (trailing slashes ignored, query kept),
/// truncated to its last 150 characters.
pub fn url_basename(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let segment = trimmed.rsplit('/').next().unwrap_or("");
    if segment.is_empty() {
        return DEFAULT_FILENAME.to_string();
    }
    let count = segment.chars().count();
    segment
        .chars()
        .skip(count.saturating_sub(MAX_BASENAME_CHARS))
        .collect()
}

/// Join the three components.
pub fn format_name(date: &str, id: &str, filename: &str) -> String {
    format!("{date}{DELIMITER}{id}{DELIMITER}{filename}")
}

/// Canonical staged name for a record.
pub fn staged_name(record: &Record, tz: NameTimezone) -> String {
    format_name(
        &format_date(&record.created_at, tz),
        &record.id,
        &url_basename(&record.url),
    )
}

/// Staged name with the transferred marker.
pub fn transferred_name(staged: &str) -> String {
    format!("{staged}{TRANSFERRED_SUFFIX}")
}

pub fn is_transferred(name: &str) -> bool {
    name.ends_with(TRANSFERRED_SUFFIX)
}

/// Split a name into `(date, id, filename)`.
///
/// Anchored like `^(.+?)@@(.+?)@@(.+)$`: the first two components are the
/// shortest non-empty prefixes that still leave a non-empty remainder, so any
/// extra delimiters fold into `filename`.
pub fn parse_name(name: &str) -> Option<ParsedName> {
    let delims = delimiter_positions(name);
    for &first in delims.iter().filter(|&&i| i >= 1) {
        let id_start = first + DELIMITER.len();
        for &second in delims.iter().filter(|&&j| j > id_start) {
            let rest_start = second + DELIMITER.len();
            if rest_start < name.len() {
                return Some(ParsedName {
                    date: name[..first].to_string(),
                    id: name[id_start..second].to_string(),
                    filename: name[rest_start..].to_string(),
                });
            }
        }
    }
    None
}

/// Byte offsets of every (possibly overlapping) delimiter occurrence.
fn delimiter_positions(name: &str) -> Vec<usize> {
    let d = DELIMITER.as_bytes();
    name.as_bytes()
        .windows(d.len())
        .enumerate()
        .filter(|(_, w)| *w == d)
        .map(|(i, _)| i)
        .collect()
}
