use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use std::fmt::Display;

/// Milliseconds in one spreadsheet day.
const MILLISECONDS_PER_DAY: f64 = 86_400_000f64;

/// Largest serial number a workbook can hold (9999-12-31).
const MAX_SERIAL: f64 = 2_958_465f64;

/// A single scalar cell value, read post-calculation.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    /// Cached error result such as `#N/A`
    Error(String),
}

impl CellValue {
    /// True only for the absence marker.
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Truthiness used by blank-row skipping: empty, empty text, zero and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::Text(text) => !text.is_empty(),
            CellValue::Number(number) => *number != 0.0,
            CellValue::Bool(value) => *value,
            CellValue::DateTime(_) | CellValue::Error(_) => true,
        }
    }

    /// Returns the text of a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the number of a numeric cell.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(number) => Some(*number),
            _ => None,
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => write!(f, "{}", text),
            CellValue::Number(number) => write!(f, "{}", number),
            CellValue::Bool(value) => write!(f, "{}", value),
            CellValue::DateTime(value) if value.time() == NaiveTime::MIN => write!(f, "{}", value.format("%Y-%m-%d")),
            CellValue::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Error(code) => write!(f, "{}", code),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// A formula element carried through verbatim; it is never evaluated.
#[derive(Clone, Debug, PartialEq)]
pub struct Formula {
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) text: String,
}

impl Formula {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The shared-formula group index, if this formula belongs to one.
    pub(crate) fn shared_index(&self) -> Option<&str> {
        (self.attribute("t") == Some("shared")).then(|| self.attribute("si")).flatten()
    }

    /// Whether this cell holds the defining formula of a shared group.
    pub(crate) fn is_shared_anchor(&self) -> bool {
        self.shared_index().is_some() && self.attribute("ref").is_some()
    }
}

/// A cell: value plus the style and formula preserved from the source workbook.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub(crate) style: Option<String>,
    pub(crate) formula: Option<Formula>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Cell {
            value,
            style: None,
            formula: None,
        }
    }

    pub fn has_formula(&self) -> bool {
        self.formula.is_some()
    }
}

/// Workbook epoch used to interpret date serial numbers.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum DateSystem {
    #[default]
    Excel1900,
    Excel1904,
}

impl DateSystem {
    fn epoch(&self) -> NaiveDateTime {
        let date = match self {
            DateSystem::Excel1900 => NaiveDate::from_ymd_opt(1899, 12, 30),
            DateSystem::Excel1904 => NaiveDate::from_ymd_opt(1904, 1, 1),
        };
        date.unwrap_or_default().and_time(NaiveTime::MIN)
    }

    /// First real day after the phantom 1900-02-29 of the 1900 system.
    fn leap_bug_cutoff() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1900, 3, 1)
            .unwrap_or_default()
            .and_time(NaiveTime::MIN)
    }

    /// Converts a serial number to a date-time, `None` when out of range.
    pub fn to_datetime(&self, serial: f64) -> Option<NaiveDateTime> {
        if !serial.is_finite() || !(0f64..=MAX_SERIAL).contains(&serial) {
            return None;
        }
        // Handle Lotus 1-2-3 leap year bug
        let correction = match self {
            DateSystem::Excel1900 if serial < 60f64 => 1,
            _ => 0,
        };
        let milliseconds = (serial * MILLISECONDS_PER_DAY).round() as i64;
        Some(self.epoch() + Duration::days(correction) + Duration::milliseconds(milliseconds))
    }

    /// Converts a date-time to its serial number.
    pub fn to_serial(&self, datetime: &NaiveDateTime) -> f64 {
        let elapsed = (*datetime - self.epoch()).num_milliseconds() as f64 / MILLISECONDS_PER_DAY;
        match self {
            DateSystem::Excel1900 if *datetime < Self::leap_bug_cutoff() => elapsed - 1f64,
            _ => elapsed,
        }
    }
}

/// Classification of a cell number format, used only to recognise dates.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum NumberFormat {
    #[default]
    General,
    Date,
    Time,
    DateTime,
}

impl NumberFormat {
    /// Parses built-in number format IDs.
    pub(crate) fn parse_builtin_id(id: &str) -> Option<Self> {
        match id {
            "22" => Some(Self::DateTime),
            "14" | "15" | "16" | "17" => Some(Self::Date),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(Self::Time),
            _ => None,
        }
    }

    /// Parses custom format codes, skipping literals, escapes and bracketed sections.
    pub(crate) fn parse_custom(format: &str) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_bracket = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_literal => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time) {
            (true, true) => Self::DateTime,
            (true, false) => Self::Date,
            (false, true) => Self::Time,
            (false, false) => Self::General,
        }
    }

    pub(crate) fn is_temporal(&self) -> bool {
        !matches!(self, Self::General)
    }
}

/// Parses an ISO 8601 cell value (`t="d"` cells).
pub(crate) fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    if value.contains('T') {
        NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f").ok()
    } else {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .map(|date| date.and_time(NaiveTime::MIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid literal date")
    }

    #[test]
    fn serial_conversion_1900() {
        let system = DateSystem::Excel1900;
        assert_eq!(system.to_datetime(1.0), Some(datetime(1900, 1, 1, 0, 0)));
        assert_eq!(system.to_datetime(61.0), Some(datetime(1900, 3, 1, 0, 0)));
        assert_eq!(system.to_datetime(45_000.5), Some(datetime(2023, 3, 15, 12, 0)));
        assert_eq!(system.to_serial(&datetime(1900, 1, 1, 0, 0)), 1.0);
        assert_eq!(system.to_serial(&datetime(2023, 3, 15, 12, 0)), 45_000.5);
        assert_eq!(system.to_datetime(-1.0), None);
    }

    #[test]
    fn serial_conversion_1904() {
        let system = DateSystem::Excel1904;
        assert_eq!(system.to_datetime(0.0), Some(datetime(1904, 1, 1, 0, 0)));
        assert_eq!(system.to_serial(&datetime(1904, 1, 2, 6, 0)), 1.25);
    }

    #[test]
    fn number_formats() {
        assert_eq!(NumberFormat::parse_builtin_id("14"), Some(NumberFormat::Date));
        assert_eq!(NumberFormat::parse_builtin_id("2"), None);
        assert_eq!(NumberFormat::parse_custom("yyyy-mm-dd hh:mm"), NumberFormat::DateTime);
        assert_eq!(NumberFormat::parse_custom("[Red]0.00"), NumberFormat::General);
        assert_eq!(NumberFormat::parse_custom("0.0\"days\""), NumberFormat::General);
        assert_eq!(NumberFormat::parse_custom("h:mm"), NumberFormat::Time);
    }

    #[test]
    fn display_and_truthiness() {
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(CellValue::DateTime(datetime(2024, 5, 1, 0, 0)).to_string(), "2024-05-01");
        assert_eq!(CellValue::Empty.to_string(), "");
        assert!(!CellValue::Number(0.0).is_truthy());
        assert!(!CellValue::Text(String::new()).is_truthy());
        assert!(CellValue::Text(" ".to_owned()).is_truthy());
        assert!(!CellValue::Text(String::new()).is_empty());
    }

    #[test]
    fn iso_values() {
        assert_eq!(parse_iso_datetime("2024-05-01"), Some(datetime(2024, 5, 1, 0, 0)));
        assert_eq!(parse_iso_datetime("2024-05-01T08:30:00Z"), Some(datetime(2024, 5, 1, 8, 30)));
        assert_eq!(parse_iso_datetime("soon"), None);
    }
}
