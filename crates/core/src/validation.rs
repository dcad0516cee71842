//! Boundary validation: raw service records in, typed records out.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::PrayerTimesResponse;
use crate::error::DisplayError;
use crate::model::{ContentItem, PrayerSchedule, MAX_DWELL_SECS, MIN_DWELL_SECS};

/// Validation decision for a single record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Clean record.
    Accept,
    /// Kept, with warnings.
    Warn,
    /// Dropped.
    Reject,
}

/// Result of validating one record (or one prayer response).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Overall verdict.
    pub decision: Decision,
    /// Problems that did not drop the record.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Problems that did.
    #[serde(default)]
    pub violations: Vec<String>,
}

impl ValidationOutcome {
    /// Clean outcome to build on.
    pub fn accept() -> Self {
        Self {
            decision: Decision::Accept,
            warnings: vec![],
            violations: vec![],
        }
    }

    /// Add a warning; never lifts a rejection.
    pub fn warn(mut self, msg: impl Into<String>) -> Self {
        if self.decision != Decision::Reject {
            self.decision = Decision::Warn;
        }
        self.warnings.push(msg.into());
        self
    }

    /// Add a violation and reject.
    pub fn reject(mut self, msg: impl Into<String>) -> Self {
        self.decision = Decision::Reject;
        self.violations.push(msg.into());
        self
    }

    /// No warnings and no violations.
    pub fn is_clean(&self) -> bool {
        self.decision == Decision::Accept
    }
}

/// Items that survived validation, plus the outcome of every record that did
/// not pass cleanly (keyed by its position in the response).
#[derive(Debug, Clone, Default)]
pub struct ContentBatch {
    /// Accepted items, in response order.
    pub items: Vec<ContentItem>,
    /// Non-clean outcomes by record index.
    pub outcomes: Vec<(usize, ValidationOutcome)>,
}

impl ContentBatch {
    /// Outcomes of the dropped records.
    pub fn rejected(&self) -> impl Iterator<Item = &(usize, ValidationOutcome)> {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.decision == Decision::Reject)
    }
}

/// Validate a batch of raw content records.
///
/// Records failing shape checks are dropped, never fatal:
/// - `id` must be a non-empty string (numbers are accepted with a warning)
/// - `title` must be a string
/// - `is_active` must be a boolean; when absent, `status == "active"` decides
/// - `display_order` must be an integer when present (defaults to 0)
/// - `sponsorship_amount` must be a non-negative number when present
pub fn validate_content_batch(records: &[Value]) -> ContentBatch {
    let mut batch = ContentBatch::default();
    for (index, record) in records.iter().enumerate() {
        let (item, outcome) = validate_content_record(index, record);
        if let Some(item) = item {
            batch.items.push(item);
        }
        if !outcome.is_clean() {
            batch.outcomes.push((index, outcome));
        }
    }
    batch
}

/// Validate a single raw content record.
pub fn validate_content_record(
    index: usize,
    record: &Value,
) -> (Option<ContentItem>, ValidationOutcome) {
    let out = ValidationOutcome::accept();

    let Some(obj) = record.as_object() else {
        return (None, out.reject(format!("record[{index}]: not a JSON object")));
    };

    let (id, mut out) = match obj.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => (s.clone(), out),
        Some(Value::Number(n)) => {
            let id = n.to_string();
            let out = out.warn(format!("record[{index}]: numeric id {id} coerced to string"));
            (id, out)
        }
        _ => return (None, out.reject(format!("record[{index}]: missing id"))),
    };

    let title = match obj.get("title") {
        Some(Value::String(s)) => s.clone(),
        _ => return (None, out.reject(format!("record[{index}] ({id}): missing title"))),
    };

    let is_active = match (obj.get("is_active"), obj.get("status")) {
        (Some(Value::Bool(b)), _) => *b,
        (Some(Value::Null) | None, Some(Value::String(status))) => status == "active",
        (Some(other), _) if !other.is_null() => {
            let msg = format!("record[{index}] ({id}): is_active must be a boolean, got {other}");
            return (None, out.reject(msg));
        }
        _ => return (None, out.reject(format!("record[{index}] ({id}): missing is_active"))),
    };

    let display_order = match obj.get("display_order") {
        Some(Value::Number(n)) => match n.as_i64() {
            Some(v) => v,
            None => {
                return (
                    None,
                    out.reject(format!("record[{index}] ({id}): display_order must be an integer")),
                )
            }
        },
        None | Some(Value::Null) => {
            out = out.warn(format!("record[{index}] ({id}): missing display_order, using 0"));
            0
        }
        Some(other) => {
            return (
                None,
                out.reject(format!(
                    "record[{index}] ({id}): display_order must be an integer, got {other}"
                )),
            );
        }
    };

    let sponsorship_amount = match parse_amount(obj.get("sponsorship_amount")) {
        Ok(amount) => amount,
        Err(msg) => return (None, out.reject(format!("record[{index}] ({id}): {msg}"))),
    };

    let media_ref = match string_field(obj, "media_ref").or_else(|| string_field(obj, "url")) {
        Some(s) => s,
        None => String::new(),
    };

    let dwell_secs = match obj.get("carousel_duration") {
        None | Some(Value::Null) => None,
        Some(v) => match v.as_u64() {
            Some(secs) => {
                let clamped = secs.clamp(MIN_DWELL_SECS, MAX_DWELL_SECS);
                if clamped != secs {
                    out = out.warn(format!(
                        "record[{index}] ({id}): carousel_duration {secs}s clamped to {clamped}s"
                    ));
                }
                Some(clamped)
            }
            None => {
                out = out.warn(format!("record[{index}] ({id}): ignoring carousel_duration {v}"));
                None
            }
        },
    };

    let date_field = |key: &str, out: ValidationOutcome| -> (Option<NaiveDate>, ValidationOutcome) {
        match string_field(obj, key) {
            None => (None, out),
            Some(raw) => match parse_day(&raw) {
                Some(day) => (Some(day), out),
                None => {
                    let msg = format!("record[{index}] ({id}): ignoring unparseable {key} '{raw}'");
                    (None, out.warn(msg))
                }
            },
        }
    };
    let (start_date, out) = date_field("start_date", out);
    let (end_date, out) = date_field("end_date", out);

    let item = ContentItem {
        id,
        title,
        media_ref,
        sponsorship_amount,
        is_active,
        display_order,
        dwell_secs,
        start_date,
        end_date,
    };
    (Some(item), out)
}

/// Validate a prayer-time response into a schedule.
///
/// Individual unparseable times are dropped with a warning. A missing zone, a
/// bad date or a response without a single usable time is a
/// [`DisplayError::Validation`].
pub fn validate_prayer_response(
    resp: &PrayerTimesResponse,
) -> Result<(PrayerSchedule, ValidationOutcome), DisplayError> {
    let mut out = ValidationOutcome::accept();

    let zone_id = resp.zone.trim();
    if zone_id.is_empty() {
        return Err(DisplayError::validation("prayer schedule has no zone"));
    }

    let date = parse_day(&resp.date).ok_or_else(|| {
        DisplayError::validation(format!("prayer schedule date '{}' is not YYYY-MM-DD", resp.date))
    })?;

    let mut times = std::collections::BTreeMap::new();
    for (name, value) in &resp.times {
        match value.as_str().and_then(parse_time_of_day) {
            Some(t) => {
                times.insert(name.to_lowercase(), t);
            }
            None => out = out.warn(format!("{zone_id}/{date}: dropping {name}={value}")),
        }
    }

    if times.is_empty() {
        return Err(DisplayError::validation(format!(
            "prayer schedule for {zone_id}/{date} has no usable times"
        )));
    }

    let schedule = PrayerSchedule {
        zone_id: zone_id.to_string(),
        date,
        times,
    };
    Ok((schedule, out))
}

/// Parses `HH:MM:SS` or `HH:MM`.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Parses `YYYY-MM-DD`, tolerating a trailing ISO time part.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

// Postgres numerics often arrive as strings.
fn parse_amount(value: Option<&Value>) -> Result<f64, String> {
    let amount = match value {
        None | Some(Value::Null) => return Ok(0.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match amount {
        Some(a) if a.is_finite() && a >= 0.0 => Ok(a),
        Some(a) => Err(format!("sponsorship_amount {a} must be a non-negative number")),
        None => {
            let raw = value.map_or(Value::Null, Clone::clone);
            Err(format!("sponsorship_amount {raw} is not a number"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_time_formats() {
        assert_eq!(parse_time_of_day("05:45"), NaiveTime::from_hms_opt(5, 45, 0));
        assert_eq!(parse_time_of_day("13:15:30"), NaiveTime::from_hms_opt(13, 15, 30));
        assert_eq!(parse_time_of_day("25:00"), None);
        assert_eq!(parse_time_of_day("noon"), None);
    }

    #[test]
    fn parses_day_with_time_suffix() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 1);
        assert_eq!(parse_day("2025-03-01"), expected);
        assert_eq!(parse_day("2025-03-01T08:00:00Z"), expected);
        assert_eq!(parse_day("01/03/2025"), None);
    }

    #[test]
    fn amount_accepts_numeric_strings() {
        assert_eq!(parse_amount(Some(&Value::String("150.50".into()))), Ok(150.5));
        assert_eq!(parse_amount(None), Ok(0.0));
        assert!(parse_amount(Some(&serde_json::json!(-1))).is_err());
        assert!(parse_amount(Some(&serde_json::json!(true))).is_err());
    }
}
