//! EXIF capture dates for still images.

use chrono::{NaiveDateTime, Timelike};
use exif::{Field, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Date tags in order of preference, each paired with its sub-second tag
const DATE_TAGS: [(Tag, Tag); 3] = [
    (Tag::DateTimeOriginal, Tag::SubSecTimeOriginal),
    (Tag::DateTimeDigitized, Tag::SubSecTimeDigitized),
    (Tag::DateTime, Tag::SubSecTime),
];

/// Read the capture time from a file's EXIF block
pub(super) fn capture_time(path: &Path) -> Option<NaiveDateTime> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);

    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return None,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "unreadable EXIF data, treating as no metadata");
            return None;
        }
    };

    DATE_TAGS.iter().find_map(|(date_tag, subsec_tag)| {
        let taken = exif
            .get_field(*date_tag, In::PRIMARY)
            .and_then(ascii_value)
            .and_then(|s| parse_exif_datetime(&s))?;

        Some(
            match exif.get_field(*subsec_tag, In::PRIMARY).and_then(ascii_value) {
                Some(digits) => with_subseconds(taken, &digits),
                None => taken,
            },
        )
    })
}

/// Parse an EXIF timestamp.
///
/// The standard layout is `YYYY:MM:DD HH:MM:SS`; some writers use dashes in
/// the date part instead.
pub(super) fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim_matches(|c: char| c == '\0' || c == '"' || c.is_whitespace());

    NaiveDateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Apply an EXIF `SubSecTime*` value (decimal fraction digits) to a timestamp
fn with_subseconds(taken: NaiveDateTime, digits: &str) -> NaiveDateTime {
    let digits: String = digits
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .take(9)
        .collect();

    if digits.is_empty() {
        return taken;
    }

    let scale = 10u32.pow(9 - digits.len() as u32);
    digits
        .parse::<u32>()
        .ok()
        .and_then(|fraction| taken.with_nanosecond(fraction * scale))
        .unwrap_or(taken)
}

fn ascii_value(field: &Field) -> Option<String> {
    if let Value::Ascii(ref vec) = field.value {
        if let Some(bytes) = vec.first() {
            if let Ok(s) = std::str::from_utf8(bytes) {
                let trimmed = s.trim_end_matches('\0').trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn parses_standard_exif_layout() {
        assert_eq!(
            parse_exif_datetime("2023:06:15 12:00:00"),
            Some(at(2023, 6, 15, 12, 0, 0))
        );
    }

    #[test]
    fn parses_dashed_layout_and_quotes() {
        assert_eq!(
            parse_exif_datetime("\"2024-01-15 14:30:00\""),
            Some(at(2024, 1, 15, 14, 30, 0))
        );
    }

    #[test]
    fn rejects_zeroed_placeholder_dates() {
        assert_eq!(parse_exif_datetime("0000:00:00 00:00:00"), None);
        assert_eq!(parse_exif_datetime(""), None);
    }

    #[test]
    fn subseconds_are_scaled_to_nanoseconds() {
        let taken = at(2023, 6, 15, 12, 0, 0);
        assert_eq!(with_subseconds(taken, "5").nanosecond(), 500_000_000);
        assert_eq!(with_subseconds(taken, "123").nanosecond(), 123_000_000);
        assert_eq!(with_subseconds(taken, "0042").nanosecond(), 4_200_000);
    }

    #[test]
    fn blank_subseconds_leave_time_unchanged() {
        let taken = at(2023, 6, 15, 12, 0, 0);
        assert_eq!(with_subseconds(taken, "   "), taken);
        assert_eq!(with_subseconds(taken, "abc"), taken);
    }

    #[test]
    fn missing_file_yields_none() {
        assert!(capture_time(Path::new("/nonexistent/file.jpg")).is_none());
    }
}
