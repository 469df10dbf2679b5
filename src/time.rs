//! Time codec for the `HH:MM:SS:fff` stamps written by the benchmark workers.
//!
//! Values are milliseconds since midnight of a fixed reference day
//! (2000-01-01). Only differences between two values carry meaning.

use crate::error::{AnalysisError, InitTimestampUnavailable};

use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

pub const INIT_TIMESTAMP_FILE: &str = "init_timestamp.log";

// hours:minutes:seconds:fraction, the fraction being decimal digits of a second
static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{1,2}):(\d{1,2}):(\d{1,6})$").expect("static regex")
});

static NOT_TIME_CHAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9:]").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed timestamp {0:?}, expected HH:MM:SS:fff")]
pub struct TimeFormatError(pub String);

/// Parse `HH:MM:SS:fff` into milliseconds since the reference midnight.
///
/// The last group is a fraction of a second, so `:5` is 500 ms and `:1234`
/// is 123.4 ms.
pub fn parse_time_to_epoch_millis(text: &str) -> Result<f64, TimeFormatError> {
    let text = text.trim();
    let caps = TIME_RE
        .captures(text)
        .ok_or_else(|| TimeFormatError(text.to_string()))?;

    let field = |idx: usize| -> Result<u32, TimeFormatError> {
        caps[idx]
            .parse::<u32>()
            .map_err(|_| TimeFormatError(text.to_string()))
    };
    let (hours, minutes, seconds) = (field(1)?, field(2)?, field(3)?);
    if hours > 23 || minutes > 59 || seconds > 59 {
        return Err(TimeFormatError(text.to_string()));
    }

    let fraction = &caps[4];
    let micros: u32 = format!("{:0<6}", fraction)
        .parse()
        .map_err(|_| TimeFormatError(text.to_string()))?;

    let whole_ms = ((hours * 60 + minutes) * 60 + seconds) as f64 * 1000.0;
    Ok(whole_ms + micros as f64 / 1000.0)
}

/// Read a marker file and keep only digits and colons.
pub fn read_init_timestamp(path: &Path) -> Result<String, AnalysisError> {
    let text = fs::read_to_string(path).map_err(|e| AnalysisError::from_io(path, e))?;
    Ok(NOT_TIME_CHAR_RE.replace_all(&text, "").into_owned())
}

/// Read and decode the experiment's init marker in one step.
pub fn resolve_init_timestamp(path: &Path) -> Result<f64, InitTimestampUnavailable> {
    let unavailable = |reason: String| InitTimestampUnavailable {
        path: path.to_path_buf(),
        reason,
    };
    let stripped = read_init_timestamp(path).map_err(|e| unavailable(e.to_string()))?;
    parse_time_to_epoch_millis(&stripped).map_err(|e| unavailable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_reference_day_offsets() {
        assert_eq!(parse_time_to_epoch_millis("00:00:00:000").unwrap(), 0.0);
        assert_eq!(parse_time_to_epoch_millis("00:00:01:000").unwrap(), 1000.0);
        assert_eq!(
            parse_time_to_epoch_millis("10:00:01:250").unwrap(),
            36_001_250.0
        );
    }

    #[test]
    fn fraction_is_decimal_part_of_second() {
        assert_eq!(parse_time_to_epoch_millis("00:00:00:5").unwrap(), 500.0);
        assert_eq!(parse_time_to_epoch_millis("00:00:00:1234").unwrap(), 123.4);
    }

    #[test]
    fn ordering_is_preserved() {
        let stamps = [
            "00:00:00:000",
            "00:00:00:001",
            "00:00:59:999",
            "00:01:00:000",
            "09:59:59:999",
            "10:00:00:000",
            "23:59:59:999",
        ];
        let parsed: Vec<f64> = stamps
            .iter()
            .map(|s| parse_time_to_epoch_millis(s).unwrap())
            .collect();
        for pair in parsed.windows(2) {
            assert!(pair[0] < pair[1], "{:?}", pair);
        }
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "10:00:00", "10:00:00.000", "aa:00:00:000", "24:00:00:000", "10:61:00:000"] {
            assert_eq!(
                parse_time_to_epoch_millis(bad),
                Err(TimeFormatError(bad.to_string()))
            );
        }
    }

    #[test]
    fn init_marker_is_stripped_to_digits_and_colons() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(INIT_TIMESTAMP_FILE);
        fs::write(&path, "init at [10:00:00:000]\n").unwrap();

        assert_eq!(read_init_timestamp(&path).unwrap(), "10:00:00:000");
        assert_eq!(resolve_init_timestamp(&path).unwrap(), 36_000_000.0);
    }

    #[test]
    fn missing_init_marker_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(INIT_TIMESTAMP_FILE);

        assert!(read_init_timestamp(&path).unwrap_err().is_not_found());
        assert!(resolve_init_timestamp(&path).is_err());
    }
}
