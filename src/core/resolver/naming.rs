//! Collision-free names inside a duplicates area.
//!
//! Preferred form is `yyyymmdd_hhmmss.ssss.ext` (four sub-second digits).
//! When that is unavailable or taken, a counter replaces the sub-seconds:
//! `yyyymmdd_hhmmss.0001.ext`, `.0002`, and so on. Files without a capture
//! time reuse a date stamp found in their name, or their plain stem.

use crate::core::classifier::date_stamp;
use chrono::{NaiveDateTime, Timelike};
use regex::Regex;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::sync::LazyLock;

static STAMP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{8}_\d{6})(?:\.\d{4})?").expect("date stamp pattern is valid")
});

/// Pick a name for `file_name` that does not exist yet in `folder`.
///
/// Non-UTF-8 stems and extensions are carried through byte for byte.
pub fn duplicate_name(folder: &Path, file_name: &OsStr, taken: Option<&NaiveDateTime>) -> OsString {
    let as_path = Path::new(file_name);
    let ext = as_path.extension();
    let stem = as_path.file_stem().unwrap_or_default();

    let base = match taken {
        Some(taken) => {
            let stamp = OsString::from(date_stamp(taken));
            let micros = taken.nanosecond() / 1_000;
            if micros > 0 {
                let name = with_suffix(&stamp, (micros / 100).min(9_999), ext);
                if !folder.join(&name).exists() {
                    return name;
                }
            }
            stamp
        }
        None => stem
            .to_str()
            .and_then(|stem| STAMP_PATTERN.captures(stem))
            .and_then(|caps| caps.get(1))
            .map(|m| OsString::from(m.as_str()))
            .unwrap_or_else(|| stem.to_os_string()),
    };

    (1u32..)
        .map(|counter| with_suffix(&base, counter, ext))
        .find(|name| !folder.join(name).exists())
        .unwrap_or_else(|| {
            let mut name = base.clone();
            if let Some(ext) = ext {
                name.push(".");
                name.push(ext);
            }
            name
        })
}

/// `{base}.{number:04}.{ext}`
fn with_suffix(base: &OsStr, number: u32, ext: Option<&OsStr>) -> OsString {
    let mut name = base.to_os_string();
    name.push(format!(".{:04}", number));
    if let Some(ext) = ext {
        name.push(".");
        name.push(ext);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn taken(nanos: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 6, 15)
            .unwrap()
            .and_hms_nano_opt(12, 0, 5, nanos)
            .unwrap()
    }

    #[test]
    fn subseconds_form_is_preferred() {
        let dir = TempDir::new().unwrap();
        let name = duplicate_name(dir.path(), OsStr::new("IMG_1.jpg"), Some(&taken(123_400_000)));
        assert_eq!(name, OsString::from("20230615_120005.1234.jpg"));
    }

    #[test]
    fn taken_subseconds_name_falls_back_to_counter() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("20230615_120005.1234.jpg"), b"x").unwrap();

        let name = duplicate_name(dir.path(), OsStr::new("IMG_1.jpg"), Some(&taken(123_400_000)));
        assert_eq!(name, OsString::from("20230615_120005.0001.jpg"));
    }

    #[test]
    fn whole_second_capture_uses_counter() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("20230615_120005.0001.jpg"), b"x").unwrap();

        let name = duplicate_name(dir.path(), OsStr::new("IMG_1.jpg"), Some(&taken(0)));
        assert_eq!(name, OsString::from("20230615_120005.0002.jpg"));
    }

    #[test]
    fn stamp_in_name_is_reused_without_capture_time() {
        let dir = TempDir::new().unwrap();
        let name = duplicate_name(dir.path(), OsStr::new("20200101_080000.0042.mov"), None);
        assert_eq!(name, OsString::from("20200101_080000.0001.mov"));
    }

    #[test]
    fn plain_stem_gets_a_counter() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("holiday.0001.png"), b"x").unwrap();

        let name = duplicate_name(dir.path(), OsStr::new("holiday.png"), None);
        assert_eq!(name, OsString::from("holiday.0002.png"));
    }

    #[test]
    fn extensionless_files_are_supported() {
        let dir = TempDir::new().unwrap();
        let name = duplicate_name(dir.path(), OsStr::new("README"), None);
        assert_eq!(name, OsString::from("README.0001"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_keep_their_bytes() {
        use std::os::unix::ffi::{OsStrExt, OsStringExt};

        let dir = TempDir::new().unwrap();
        let name = duplicate_name(dir.path(), OsStr::from_bytes(b"caf\xe9.jpg"), None);
        assert_eq!(name.into_vec(), b"caf\xe9.0001.jpg".to_vec());
    }
}
