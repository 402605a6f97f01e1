//! Display formatting and parsing of annotation values per annotation type.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use super::{AnnotationType, AnnotationValue};

const BYTE_UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

const MS_PER_SECOND: f64 = 1000.0;
const MS_PER_MINUTE: f64 = 60.0 * MS_PER_SECOND;
const MS_PER_HOUR: f64 = 60.0 * MS_PER_MINUTE;
const MS_PER_DAY: f64 = 24.0 * MS_PER_HOUR;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
  #[error("Cannot parse '{raw}' as {expected}")]
  Unparseable { raw: String, expected: &'static str },
}

impl FormatError {
  fn unparseable(raw: &str, expected: &'static str) -> Self {
    Self::Unparseable {
      raw: raw.to_string(),
      expected,
    }
  }
}

impl AnnotationType {
  /// Render a raw value the way it is shown to users.
  ///
  /// Values that do not fit the type (e.g. a non-date string on a Date annotation)
  /// are shown as-is rather than dropped.
  pub fn display_value(&self, value: &AnnotationValue, units: Option<&str>) -> String {
    match self {
      AnnotationType::Number => display_number(value, units),
      AnnotationType::Boolean => match value.as_bool() {
        Some(true) => "True".to_string(),
        Some(false) => "False".to_string(),
        None => value.to_string(),
      },
      AnnotationType::Date => parse_timestamp(value)
        .map(|ts| ts.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| value.to_string()),
      AnnotationType::DateTime => parse_timestamp(value)
        .map(|ts| ts.format(DATE_TIME_FORMAT).to_string())
        .unwrap_or_else(|| value.to_string()),
      AnnotationType::Duration => value.as_f64().map(display_duration).unwrap_or_else(|| value.to_string()),
      AnnotationType::Text | AnnotationType::Lookup | AnnotationType::Dropdown => value.to_string(),
    }
  }

  /// Parse a displayed (or user-entered) string back into a raw value.
  pub fn value_of(&self, raw: &str) -> Result<AnnotationValue, FormatError> {
    let trimmed = raw.trim();
    match self {
      AnnotationType::Number => trimmed
        .split_whitespace()
        .next()
        .and_then(|n| n.parse::<f64>().ok())
        .map(AnnotationValue::Number)
        .ok_or_else(|| FormatError::unparseable(raw, "number")),
      AnnotationType::Boolean => match trimmed.to_lowercase().as_str() {
        "true" | "yes" => Ok(AnnotationValue::Bool(true)),
        "false" | "no" => Ok(AnnotationValue::Bool(false)),
        _ => Err(FormatError::unparseable(raw, "boolean")),
      },
      AnnotationType::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| to_rfc3339(dt.and_utc()))
        .or_else(|| DateTime::parse_from_rfc3339(trimmed).ok().map(|dt| to_rfc3339(dt.with_timezone(&Utc))))
        .map(AnnotationValue::Text)
        .ok_or_else(|| FormatError::unparseable(raw, "date (YYYY-MM-DD)")),
      AnnotationType::DateTime => NaiveDateTime::parse_from_str(trimmed, DATE_TIME_FORMAT)
        .ok()
        .map(|dt| to_rfc3339(dt.and_utc()))
        .or_else(|| DateTime::parse_from_rfc3339(trimmed).ok().map(|dt| to_rfc3339(dt.with_timezone(&Utc))))
        .map(AnnotationValue::Text)
        .ok_or_else(|| FormatError::unparseable(raw, "date-time (YYYY-MM-DD HH:MM:SS)")),
      AnnotationType::Duration => parse_duration(trimmed)
        .map(AnnotationValue::Number)
        .ok_or_else(|| FormatError::unparseable(raw, "duration (e.g. 1D 2H 3M 4.5S)")),
      AnnotationType::Text | AnnotationType::Lookup | AnnotationType::Dropdown => {
        Ok(AnnotationValue::Text(trimmed.to_string()))
      }
    }
  }
}

fn display_number(value: &AnnotationValue, units: Option<&str>) -> String {
  let Some(number) = value.as_f64() else {
    return value.to_string();
  };

  match units {
    Some("bytes") => format_bytes(number),
    Some(units) if !units.is_empty() => format!("{} {}", number, units),
    _ => number.to_string(),
  }
}

/// Decimal (SI) file size, e.g. `1.5 KB`, `2 MB`.
pub(crate) fn format_bytes(bytes: f64) -> String {
  let mut size = bytes;
  let mut unit = 0;
  while size.abs() >= 1000.0 && unit < BYTE_UNITS.len() - 1 {
    size /= 1000.0;
    unit += 1;
  }

  if unit == 0 {
    return format!("{} {}", size, BYTE_UNITS[0]);
  }
  format!("{} {}", trim_decimals(size, 2), BYTE_UNITS[unit])
}

fn trim_decimals(value: f64, places: usize) -> String {
  let formatted = format!("{:.*}", places, value);
  if formatted.contains('.') {
    formatted.trim_end_matches('0').trim_end_matches('.').to_string()
  } else {
    formatted
  }
}

fn to_rfc3339(ts: DateTime<Utc>) -> String {
  ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(value: &AnnotationValue) -> Option<DateTime<Utc>> {
  let raw = value.as_str()?.trim();
  if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
    return Some(ts.with_timezone(&Utc));
  }
  if let Ok(dt) = NaiveDateTime::parse_from_str(raw, DATE_TIME_FORMAT) {
    return Some(dt.and_utc());
  }
  NaiveDate::parse_from_str(raw, DATE_FORMAT)
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|dt| dt.and_utc())
}

/// Milliseconds as `1D 2H 3M 4.5S`, omitting zero components.
fn display_duration(ms: f64) -> String {
  let mut remaining = ms.max(0.0);
  let days = (remaining / MS_PER_DAY).floor();
  remaining -= days * MS_PER_DAY;
  let hours = (remaining / MS_PER_HOUR).floor();
  remaining -= hours * MS_PER_HOUR;
  let minutes = (remaining / MS_PER_MINUTE).floor();
  remaining -= minutes * MS_PER_MINUTE;
  let seconds = remaining / MS_PER_SECOND;

  let mut parts = Vec::new();
  if days > 0.0 {
    parts.push(format!("{}D", days));
  }
  if hours > 0.0 {
    parts.push(format!("{}H", hours));
  }
  if minutes > 0.0 {
    parts.push(format!("{}M", minutes));
  }
  if seconds > 0.0 {
    parts.push(format!("{}S", trim_decimals(seconds, 3)));
  }

  if parts.is_empty() {
    "0S".to_string()
  } else {
    parts.join(" ")
  }
}

fn parse_duration(raw: &str) -> Option<f64> {
  if raw.is_empty() {
    return None;
  }

  let mut total = 0.0;
  for token in raw.split_whitespace() {
    let unit = token.chars().last()?;
    let amount: f64 = token[..token.len() - unit.len_utf8()].parse().ok()?;
    let scale = match unit.to_ascii_uppercase() {
      'D' => MS_PER_DAY,
      'H' => MS_PER_HOUR,
      'M' => MS_PER_MINUTE,
      'S' => MS_PER_SECOND,
      _ => return None,
    };
    total += amount * scale;
  }
  Some(total.round())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_bytes_formatting() {
    assert_eq!(format_bytes(512.0), "512 B");
    assert_eq!(format_bytes(1500.0), "1.5 KB");
    assert_eq!(format_bytes(2_000_000.0), "2 MB");
    assert_eq!(format_bytes(1_234_567_890.0), "1.23 GB");
  }

  #[test]
  fn test_number_with_units() {
    let ty = AnnotationType::Number;
    assert_eq!(ty.display_value(&5.0.into(), Some("µm")), "5 µm");
    assert_eq!(ty.display_value(&2.5.into(), None), "2.5");
    assert_eq!(ty.value_of("5 µm").unwrap(), AnnotationValue::Number(5.0));
    assert!(ty.value_of("five").is_err());
  }

  #[test]
  fn test_number_round_trip() {
    let ty = AnnotationType::Number;
    for n in [0.0, 3.0, 12.75, -4.5] {
      let value = AnnotationValue::Number(n);
      assert_eq!(ty.value_of(&ty.display_value(&value, None)).unwrap(), value);
    }
  }

  #[test]
  fn test_boolean_round_trip() {
    let ty = AnnotationType::Boolean;
    assert_eq!(ty.display_value(&true.into(), None), "True");
    assert_eq!(ty.display_value(&"false".into(), None), "False");
    for b in [true, false] {
      let value = AnnotationValue::Bool(b);
      assert_eq!(ty.value_of(&ty.display_value(&value, None)).unwrap(), value);
    }
    assert_eq!(ty.value_of("YES").unwrap(), AnnotationValue::Bool(true));
    assert!(ty.value_of("maybe").is_err());
  }

  #[test]
  fn test_date_round_trip() {
    let ty = AnnotationType::Date;
    let value: AnnotationValue = "2021-02-03T00:00:00Z".into();
    let shown = ty.display_value(&value, None);
    assert_eq!(shown, "2021-02-03");
    assert_eq!(ty.value_of(&shown).unwrap(), value);
  }

  #[test]
  fn test_date_normalizes_offsets_to_utc() {
    let ty = AnnotationType::Date;
    assert_eq!(ty.display_value(&"2021-02-03T23:30:00-02:00".into(), None), "2021-02-04");
  }

  #[test]
  fn test_datetime_round_trip() {
    let ty = AnnotationType::DateTime;
    let value: AnnotationValue = "2019-11-05T16:07:44Z".into();
    let shown = ty.display_value(&value, None);
    assert_eq!(shown, "2019-11-05 16:07:44");
    assert_eq!(ty.value_of(&shown).unwrap(), value);
  }

  #[test]
  fn test_unparseable_date_is_shown_verbatim() {
    assert_eq!(AnnotationType::Date.display_value(&"sometime".into(), None), "sometime");
  }

  #[test]
  fn test_duration_display() {
    let ty = AnnotationType::Duration;
    assert_eq!(ty.display_value(&0.0.into(), None), "0S");
    assert_eq!(ty.display_value(&4500.0.into(), None), "4.5S");
    assert_eq!(ty.display_value(&(MS_PER_DAY + 2.0 * MS_PER_HOUR).into(), None), "1D 2H");
    assert_eq!(
      ty.display_value(&(MS_PER_DAY + 2.0 * MS_PER_HOUR + 3.0 * MS_PER_MINUTE + 4500.0).into(), None),
      "1D 2H 3M 4.5S"
    );
  }

  #[test]
  fn test_duration_round_trip() {
    let ty = AnnotationType::Duration;
    for ms in [0.0, 1.0, 4500.0, 93_784_500.0, 3_600_000.0] {
      let value = AnnotationValue::Number(ms);
      assert_eq!(ty.value_of(&ty.display_value(&value, None)).unwrap(), value, "ms = {}", ms);
    }
    assert!(ty.value_of("3 days").is_err());
    assert!(ty.value_of("").is_err());
  }

  #[test]
  fn test_text_passthrough() {
    let ty = AnnotationType::Lookup;
    assert_eq!(ty.display_value(&"AICS-0".into(), None), "AICS-0");
    assert_eq!(ty.value_of("  AICS-0 ").unwrap(), "AICS-0".into());
  }
}
