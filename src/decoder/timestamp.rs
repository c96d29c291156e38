// Base timestamp of a dump, taken from a YYYYMMDD + HHMMSS stamp in its filename.

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where the base timestamp of a record stream came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimestampSource {
    Filename,
    /// No stamp in the filename; wall-clock time at decode. Absolute times are not trustworthy.
    WallClock,
}

impl TimestampSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TimestampSource::Filename => "filename",
            TimestampSource::WallClock => "wallClock",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseTime {
    /// Unix epoch milliseconds (UTC).
    pub millis: i64,
    pub source: TimestampSource,
}

impl BaseTime {
    pub fn from_filename(filename: &str) -> Self {
        match parse_filename_timestamp(filename) {
            Some(millis) => BaseTime {
                millis,
                source: TimestampSource::Filename,
            },
            None => {
                tracing::warn!(
                    filename,
                    operation = "base_time",
                    "no date/time stamp in filename; using wall clock"
                );
                BaseTime {
                    millis: Utc::now().timestamp_millis(),
                    source: TimestampSource::WallClock,
                }
            }
        }
    }
}

/// Epoch millis for the first valid `YYYYMMDDHHMMSS` stamp in the file name. The stamp may
/// sit inside a longer digit run, or be split into date and time by one of `_`, `-`, `T` or
/// a space, in which case the date is the tail of one run and the time the head of the next.
pub fn parse_filename_timestamp(filename: &str) -> Option<i64> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    let bytes = name.as_bytes();
    let runs = digit_runs(bytes);

    for (i, &(start, end)) in runs.iter().enumerate() {
        let run = &name[start..end];
        if run.len() >= 14 {
            for offset in 0..=run.len() - 14 {
                let window = &run[offset..offset + 14];
                if let Some(millis) = to_epoch_millis(&window[..8], &window[8..]) {
                    return Some(millis);
                }
            }
        }

        if run.len() < 8 {
            continue;
        }
        let Some(&(next_start, next_end)) = runs.get(i + 1) else {
            continue;
        };
        let separated =
            next_start == end + 1 && matches!(bytes[end], b'_' | b'-' | b'T' | b' ');
        if !separated || next_end - next_start < 6 {
            continue;
        }
        let date = &run[run.len() - 8..];
        let time = &name[next_start..next_start + 6];
        if let Some(millis) = to_epoch_millis(date, time) {
            return Some(millis);
        }
    }
    None
}

fn to_epoch_millis(date: &str, time: &str) -> Option<i64> {
    let date = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
    let time = NaiveTime::parse_from_str(time, "%H%M%S").ok()?;
    Some(date.and_time(time).and_utc().timestamp_millis())
}

/// Maximal runs of ASCII digits as byte ranges.
fn digit_runs(bytes: &[u8]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, b) in bytes.iter().enumerate() {
        match (b.is_ascii_digit(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, bytes.len()));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-15T14:30:22Z
    const EXPECTED: i64 = 1_710_513_022_000;

    #[test]
    fn parses_joined_and_separated_stamps() {
        assert_eq!(parse_filename_timestamp("MDG_20240315143022.bin"), Some(EXPECTED));
        assert_eq!(parse_filename_timestamp("mp-4411_20240315_143022.dat"), Some(EXPECTED));
        assert_eq!(parse_filename_timestamp("20240315T143022"), Some(EXPECTED));
        assert_eq!(
            parse_filename_timestamp("/uploads/2023/run_20240315-143022.bin"),
            Some(EXPECTED)
        );
    }

    #[test]
    fn finds_stamps_inside_longer_digit_runs() {
        assert_eq!(parse_filename_timestamp("MP_20240315143022001.bin"), Some(EXPECTED));
        assert_eq!(parse_filename_timestamp("run120240315_143022.bin"), Some(EXPECTED));
        assert_eq!(parse_filename_timestamp("MDG_20240315_14302299.bin"), Some(EXPECTED));
        // An invalid leading window is skipped for a valid later one.
        assert_eq!(parse_filename_timestamp("x920240315143022.bin"), Some(EXPECTED));
    }

    #[test]
    fn rejects_missing_or_invalid_stamps() {
        assert_eq!(parse_filename_timestamp("MDG_4411.bin"), None);
        assert_eq!(parse_filename_timestamp("MDG_20241345_143022.bin"), None);
        assert_eq!(parse_filename_timestamp("MDG_20240315_256022.bin"), None);
        assert_eq!(parse_filename_timestamp("MDG_20240315__143022.bin"), None);
    }

    #[test]
    fn wall_clock_fallback_is_flagged() {
        let base = BaseTime::from_filename("no_stamp_here.bin");
        assert_eq!(base.source, TimestampSource::WallClock);
        let base = BaseTime::from_filename("MP_20240315_143022.bin");
        assert_eq!(base.source, TimestampSource::Filename);
        assert_eq!(base.millis, EXPECTED);
    }

    #[test]
    fn digit_runs_are_maximal() {
        assert_eq!(digit_runs(b"a12b3"), vec![(1, 3), (4, 5)]);
        assert_eq!(digit_runs(b"123"), vec![(0, 3)]);
        assert!(digit_runs(b"abc").is_empty());
    }
}
