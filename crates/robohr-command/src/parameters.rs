//! Declared, typed action parameters.
//!
//! The interpreter hands back a free-form JSON object. Before a handler runs,
//! the dispatcher coerces it against the action's [`ParamSpec`]s: undeclared
//! keys are dropped, `null` and empty strings count as absent, and values of
//! the wrong shape are rejected.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Positive integer employee id.
    EmployeeId,
    Integer,
    /// Calendar date (`YYYY-MM-DD`, `YYYY/MM/DD`, `MM/DD/YYYY`, `MM-DD-YYYY`,
    /// or `today` / `tomorrow` / `yesterday`).
    Date,
    /// Month number 1-12 or an English month name.
    Month,
    Text,
}

impl ParamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamKind::EmployeeId => "employee_id",
            ParamKind::Integer => "integer",
            ParamKind::Date => "date",
            ParamKind::Month => "month",
            ParamKind::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

/// A coerced parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Integer(i64),
    Date(NaiveDate),
    Text(String),
}

impl ParamValue {
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Integer(i) => Value::from(*i),
            ParamValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            ParamValue::Text(s) => Value::String(s.clone()),
        }
    }
}

/// A parameter that could not be coerced to its declared kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamError {
    pub name: String,
    pub reason: String,
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parameter '{}' is invalid: {}", self.name, self.reason)
    }
}

impl std::error::Error for ParamError {}

/// Validated parameters handed to a handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    values: BTreeMap<String, ParamValue>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coerce `raw` against `specs`. Relative dates resolve against `today`.
    pub fn coerce(
        specs: &[ParamSpec],
        raw: &Map<String, Value>,
        today: NaiveDate,
    ) -> Result<Self, ParamError> {
        let mut values = BTreeMap::new();
        for spec in specs {
            let Some(value) = raw.get(&spec.name) else {
                continue;
            };
            if is_absent(value) {
                continue;
            }
            let coerced = coerce_value(spec.kind, value, today).map_err(|reason| ParamError {
                name: spec.name.clone(),
                reason,
            })?;
            values.insert(spec.name.clone(), coerced);
        }
        Ok(Self { values })
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ParamValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        match self.values.get(name) {
            Some(ParamValue::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ParamValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn employee_id(&self) -> Option<i64> {
        self.integer("employee_id")
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> Map<String, Value> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }
}

fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn coerce_value(kind: ParamKind, value: &Value, today: NaiveDate) -> Result<ParamValue, String> {
    match kind {
        ParamKind::EmployeeId => {
            let id = integer_of(value)?;
            if id <= 0 {
                return Err(format!("employee id must be positive, got {}", id));
            }
            Ok(ParamValue::Integer(id))
        }
        ParamKind::Integer => integer_of(value).map(ParamValue::Integer),
        ParamKind::Month => month_of(value).map(ParamValue::Integer),
        ParamKind::Date => match value {
            Value::String(s) => parse_date(s, today)
                .map(ParamValue::Date)
                .ok_or_else(|| format!("'{}' is not a recognized date", s.trim())),
            other => Err(format!("expected a date, got {}", other)),
        },
        ParamKind::Text => match value {
            Value::String(s) => Ok(ParamValue::Text(s.trim().to_string())),
            Value::Number(n) => Ok(ParamValue::Text(n.to_string())),
            other => Err(format!("expected text, got {}", other)),
        },
    }
}

fn integer_of(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
                _ => Err(format!("expected an integer, got {}", n)),
            }
        }
        Value::String(s) => s
            .trim()
            .trim_start_matches('#')
            .parse::<i64>()
            .map_err(|_| format!("expected an integer, got '{}'", s.trim())),
        other => Err(format!("expected an integer, got {}", other)),
    }
}

const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

/// Month number for an English month name or its abbreviation (`mar`, `sept`).
pub fn month_number(name: &str) -> Option<i64> {
    let name = name.trim().to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == name || (name.len() >= 3 && m.starts_with(name.as_str())))
        .map(|pos| pos as i64 + 1)
}

fn month_of(value: &Value) -> Result<i64, String> {
    if let Value::String(s) = value {
        if let Some(month) = month_number(s) {
            return Ok(month);
        }
    }
    let month = integer_of(value)?;
    if (1..=12).contains(&month) {
        Ok(month)
    } else {
        Err(format!("month must be between 1 and 12, got {}", month))
    }
}

/// Parse the date formats the interpreter emits.
pub fn parse_date(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = input.trim();
    match s.to_lowercase().as_str() {
        "today" => return Some(today),
        "tomorrow" => return today.succ_opt(),
        "yesterday" => return today.pred_opt(),
        _ => {}
    }
    // Interpreters sometimes send full timestamps; only the date part matters.
    let s = s.split(['T', ' ']).next().unwrap_or(s);
    ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("employee_id", ParamKind::EmployeeId),
            ParamSpec::optional("start_date", ParamKind::Date),
            ParamSpec::optional("month", ParamKind::Month),
            ParamSpec::optional("reason", ParamKind::Text),
        ]
    }

    fn raw(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_coerces_strings_and_drops_undeclared() {
        let params = Parameters::coerce(
            &specs(),
            &raw(json!({
                "employee_id": "7",
                "start_date": "11/02/2026",
                "month": "March",
                "reason": "  family trip ",
                "timestamp": "2026-10-19T09:00:00"
            })),
            today(),
        )
        .unwrap();

        assert_eq!(params.employee_id(), Some(7));
        assert_eq!(params.date("start_date"), NaiveDate::from_ymd_opt(2026, 11, 2));
        assert_eq!(params.integer("month"), Some(3));
        assert_eq!(params.text("reason"), Some("family trip"));
        assert!(!params.contains("timestamp"));
    }

    #[test]
    fn test_null_and_empty_are_absent() {
        let params = Parameters::coerce(
            &specs(),
            &raw(json!({"employee_id": null, "reason": "  "})),
            today(),
        )
        .unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        let err = Parameters::coerce(&specs(), &raw(json!({"employee_id": "seven"})), today())
            .unwrap_err();
        assert_eq!(err.name, "employee_id");

        let err = Parameters::coerce(&specs(), &raw(json!({"employee_id": -3})), today())
            .unwrap_err();
        assert!(err.reason.contains("positive"));

        let err = Parameters::coerce(&specs(), &raw(json!({"month": 13})), today()).unwrap_err();
        assert_eq!(err.name, "month");

        assert!(Parameters::coerce(&specs(), &raw(json!({"start_date": "someday"})), today()).is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 12, 24);
        assert_eq!(parse_date("2026-12-24", today()), expected);
        assert_eq!(parse_date("2026/12/24", today()), expected);
        assert_eq!(parse_date("12/24/2026", today()), expected);
        assert_eq!(parse_date("12-24-2026", today()), expected);
        assert_eq!(parse_date("2026-12-24T08:30:00", today()), expected);
        assert_eq!(parse_date("Tomorrow", today()), NaiveDate::from_ymd_opt(2026, 10, 20));
        assert_eq!(parse_date("24.12.2026", today()), None);
    }

    #[test]
    fn test_float_ids_with_no_fraction() {
        let params =
            Parameters::coerce(&specs(), &raw(json!({"employee_id": 7.0})), today()).unwrap();
        assert_eq!(params.employee_id(), Some(7));
        assert!(Parameters::coerce(&specs(), &raw(json!({"employee_id": 7.5})), today()).is_err());
    }

    #[test]
    fn test_to_json() {
        let mut params = Parameters::new();
        params.insert("employee_id", ParamValue::Integer(7));
        params.insert("start_date", ParamValue::Date(today()));
        assert_eq!(
            Value::Object(params.to_json()),
            json!({"employee_id": 7, "start_date": "2026-10-19"})
        );
    }
}
