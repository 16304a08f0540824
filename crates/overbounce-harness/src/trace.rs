//! Frametime trace files.
//!
//! One frametime in seconds per line. `#` starts a comment; blank lines are
//! skipped.
//!
//! ```text
//! # 125 fps with one hitch
//! 0.008
//! 0.008
//! 0.031  # shader compile
//! ```

use std::io::BufRead;

use crate::error::{HarnessError, Result};

/// Read every frametime from `reader`. Line numbers in errors are 1-based.
pub fn parse_trace(reader: impl BufRead) -> Result<Vec<f32>> {
    let mut frametimes = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let content = match line.split_once('#') {
            Some((before, _)) => before,
            None => line.as_str(),
        }
        .trim();
        if content.is_empty() {
            continue;
        }

        let seconds: f32 = content
            .parse()
            .map_err(|_| HarnessError::trace(index + 1, format!("not a number: {content:?}")))?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(HarnessError::trace(
                index + 1,
                format!("frametime must be a finite non-negative number, got {content}"),
            ));
        }
        frametimes.push(seconds);
    }
    Ok(frametimes)
}

/// Frametime in whole milliseconds, as the cumulative statistics expect.
#[must_use]
pub fn to_millis(seconds: f32) -> u32 {
    // Saturating cast; parse_trace already rejected negatives and NaN.
    (seconds * 1000.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_comments_and_blank_lines() {
        let input = "# header\n0.008\n\n  0.016  # hitch\n#0.5\n";
        assert_eq!(parse_trace(input.as_bytes()).unwrap(), vec![0.008, 0.016]);
    }

    #[test]
    fn reports_bad_line_number() {
        let err = parse_trace("0.008\n# ok\nfast\n".as_bytes()).unwrap_err();
        match err {
            HarnessError::Trace { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_negative_and_non_finite() {
        assert!(parse_trace("-0.01\n".as_bytes()).is_err());
        assert!(parse_trace("inf\n".as_bytes()).is_err());
        assert!(parse_trace("NaN\n".as_bytes()).is_err());
    }

    #[test]
    fn empty_trace_is_empty() {
        assert!(parse_trace("".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn millis_round_to_nearest() {
        assert_eq!(to_millis(0.0084), 8);
        assert_eq!(to_millis(0.0086), 9);
        assert_eq!(to_millis(0.0), 0);
    }
}
