//! Parsing of the free-text date columns.
//!
//! Accepted formats are tried in order and the first success wins. A value
//! that matches none of them is either malformed or names a day that does
//! not exist on the calendar (`32-Jul-2023`, `29-Feb-2023`).

use chrono::format::ParseErrorKind;
use chrono::NaiveDate;

/// `31-Jul-2023`
pub const DAY_MONTH_ABBR_YEAR: &str = "%d-%b-%Y";
/// `07-03-23`
pub const DAY_MONTH_SHORT_YEAR: &str = "%d-%m-%y";

/// Accepted date formats, in the order they are attempted.
pub const ACCEPTED_DATE_FORMATS: &[&str] = &[DAY_MONTH_ABBR_YEAR, DAY_MONTH_SHORT_YEAR];

/// Result of checking one date cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateCheck {
    Valid(NaiveDate),
    /// Matches none of the accepted formats.
    Malformed,
    /// Has the shape of an accepted format but no such calendar day exists.
    NotACalendarDate,
}

impl DateCheck {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Valid(d) => Some(*d),
            _ => None,
        }
    }

    /// Short reason used in violation messages.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Valid(_) => "valid",
            Self::Malformed => "unrecognised date format",
            Self::NotACalendarDate => "date does not exist",
        }
    }
}

/// Check `raw` against the default accepted formats.
pub fn check_date(raw: &str) -> DateCheck {
    check_date_with(raw, ACCEPTED_DATE_FORMATS)
}

/// chrono reads `%Y` as one to four digits; a full year is required here.
fn full_year_segments(raw: &str, format: &str) -> bool {
    let segments: Vec<&str> = raw.split('-').collect();
    let specs: Vec<&str> = format.split('-').collect();
    if segments.len() != specs.len() {
        return true;
    }
    specs
        .iter()
        .zip(&segments)
        .filter(|(spec, _)| **spec == "%Y")
        .all(|(_, seg)| seg.len() == 4 && seg.bytes().all(|b| b.is_ascii_digit()))
}

/// Check `raw` against `formats`, short-circuiting on the first that parses.
pub fn check_date_with(raw: &str, formats: &[&str]) -> DateCheck {
    let raw = raw.trim();
    let mut out_of_range = false;

    for format in formats {
        if !full_year_segments(raw, format) {
            continue;
        }
        match NaiveDate::parse_from_str(raw, format) {
            Ok(date) => return DateCheck::Valid(date),
            Err(e) => {
                if matches!(e.kind(), ParseErrorKind::OutOfRange | ParseErrorKind::Impossible) {
                    out_of_range = true;
                }
            }
        }
    }

    if out_of_range {
        DateCheck::NotACalendarDate
    } else {
        DateCheck::Malformed
    }
}
