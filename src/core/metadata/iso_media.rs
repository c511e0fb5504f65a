//! Capture dates for ISO base media files (MP4, MOV, M4V, 3GP).
//!
//! QuickTime and MPEG-4 share the same box structure, so every member of the
//! family goes through the same `mp4` reader.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use mp4::{MetaBox, MetadataKey, MoovBox};
use std::fs::File;
use std::path::Path;
use tracing::debug;

const ISO_MEDIA_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "3gp", "3g2"];

/// `mvhd` times count seconds from 1904-01-01 UTC
const SECONDS_FROM_1904_TO_1970: u64 = 2_082_844_800;

/// Whether the path belongs to the ISO base media family
pub(super) fn is_iso_media(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ISO_MEDIA_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Read the capture time of an ISO base media file
pub(super) fn capture_time(path: &Path) -> Option<NaiveDateTime> {
    if !is_iso_media(path) {
        return None;
    }

    let file = File::open(path).ok()?;
    match mp4::read_mp4(file) {
        Ok(reader) => day_tag(&reader.moov).or_else(|| movie_header_creation(&reader.moov)),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "unreadable container metadata, treating as no metadata");
            None
        }
    }
}

/// `©day` from the iTunes-style `udta/meta/ilst` list
fn day_tag(moov: &MoovBox) -> Option<NaiveDateTime> {
    let Some(MetaBox::Mdir { ilst: Some(ilst) }) = moov.udta.as_ref()?.meta.as_ref() else {
        return None;
    };
    let item = ilst.items.get(&MetadataKey::Year)?;
    let text = String::from_utf8_lossy(&item.data.data);
    parse_day_tag(text.trim_matches(|c: char| c == '\0' || c.is_whitespace()))
}

/// Creation time from the movie header; zero means "not set"
fn movie_header_creation(moov: &MoovBox) -> Option<NaiveDateTime> {
    let seconds = moov.mvhd.creation_time;
    if seconds == 0 {
        return None;
    }

    let unix = i64::try_from(seconds.saturating_sub(SECONDS_FROM_1904_TO_1970)).ok()?;
    DateTime::from_timestamp(unix, 0).map(|dt| dt.naive_utc())
}

/// Parse a `©day` value: RFC 3339, `YYYY-MM-DDTHH:MM:SS` with any suffix, or a bare date
pub(super) fn parse_day_tag(text: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_local());
    }

    if let Some(head) = text.get(..19) {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S") {
            return Some(parsed);
        }
    }

    text.get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
