use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{GatewayError, Result};

/// Kind of a single JSON field in a response descriptor
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Bool,
    Integer,
    Number,
    Text,
    /// Object with arbitrary keys whose values all have the given kind
    MapOf(&'static FieldKind),
    /// Object with a fixed set of required fields
    Record(&'static [Field]),
}

impl FieldKind {
    fn describe(&self) -> &'static str {
        match self {
            FieldKind::Bool => "a boolean",
            FieldKind::Integer => "an integer",
            FieldKind::Number => "a number",
            FieldKind::Text => "a string",
            FieldKind::MapOf(_) | FieldKind::Record(_) => "an object",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> Field {
    Field { name, kind }
}

const RATE_MAP: FieldKind = FieldKind::MapOf(&FieldKind::Number);

const SYMBOLS_FIELDS: &[Field] = &[
    field("success", FieldKind::Bool),
    field("symbols", FieldKind::MapOf(&FieldKind::Text)),
];

const LATEST_FIELDS: &[Field] = &[
    field("success", FieldKind::Bool),
    field("timestamp", FieldKind::Integer),
    field("base", FieldKind::Text),
    field("date", FieldKind::Text),
    field("rates", RATE_MAP),
];

const CONVERT_QUERY_FIELDS: &[Field] = &[
    field("from", FieldKind::Text),
    field("to", FieldKind::Text),
    field("amount", FieldKind::Number),
];

const CONVERT_INFO_FIELDS: &[Field] = &[
    field("rate", FieldKind::Number),
    field("timestamp", FieldKind::Integer),
];

const CONVERT_FIELDS: &[Field] = &[
    field("success", FieldKind::Bool),
    field("query", FieldKind::Record(CONVERT_QUERY_FIELDS)),
    field("info", FieldKind::Record(CONVERT_INFO_FIELDS)),
    field("result", FieldKind::Number),
];

const HISTORICAL_FIELDS: &[Field] = &[
    field("success", FieldKind::Bool),
    field("historical", FieldKind::Bool),
    field("date", FieldKind::Text),
    field("timestamp", FieldKind::Integer),
    field("base", FieldKind::Text),
    field("rates", RATE_MAP),
];

const TIME_SERIES_FIELDS: &[Field] = &[
    field("success", FieldKind::Bool),
    field("timeseries", FieldKind::Bool),
    field("start_date", FieldKind::Text),
    field("end_date", FieldKind::Text),
    field("base", FieldKind::Text),
    field("rates", FieldKind::MapOf(&RATE_MAP)),
];

const FLUCTUATION_ENTRY_FIELDS: &[Field] = &[
    field("start_rate", FieldKind::Number),
    field("end_rate", FieldKind::Number),
    field("change", FieldKind::Number),
    field("change_pct", FieldKind::Number),
];

const FLUCTUATION_FIELDS: &[Field] = &[
    field("success", FieldKind::Bool),
    field("fluctuation", FieldKind::Bool),
    field("start_date", FieldKind::Text),
    field("end_date", FieldKind::Text),
    field("base", FieldKind::Text),
    field(
        "rates",
        FieldKind::MapOf(&FieldKind::Record(FLUCTUATION_ENTRY_FIELDS)),
    ),
];

/// The six response shapes the provider can return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Symbols,
    LatestRates,
    Convert,
    Historical,
    TimeSeries,
    Fluctuation,
}

impl Shape {
    pub fn fields(&self) -> &'static [Field] {
        match self {
            Shape::Symbols => SYMBOLS_FIELDS,
            Shape::LatestRates => LATEST_FIELDS,
            Shape::Convert => CONVERT_FIELDS,
            Shape::Historical => HISTORICAL_FIELDS,
            Shape::TimeSeries => TIME_SERIES_FIELDS,
            Shape::Fluctuation => FLUCTUATION_FIELDS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Shape::Symbols => "Symbols",
            Shape::LatestRates => "LatestRates",
            Shape::Convert => "Convert",
            Shape::Historical => "Historical",
            Shape::TimeSeries => "TimeSeries",
            Shape::Fluctuation => "Fluctuation",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of validating a structurally sound body
#[derive(Debug, Clone, PartialEq)]
pub enum Validated<T> {
    /// `success` was true and every required field checked out
    Accepted(T),
    /// `success` was false; `reason` is whatever explanation the provider gave
    Rejected { reason: Option<String> },
}

/// Checks `raw` against `shape` without converting it.
pub fn check(raw: &Value, shape: Shape) -> Result<Validated<()>> {
    let object = raw.as_object().ok_or_else(|| {
        GatewayError::Schema(format!(
            "{} response must be an object, got {}",
            shape,
            json_kind(raw)
        ))
    })?;

    let success = match object.get("success") {
        Some(Value::Bool(flag)) => *flag,
        Some(other) => {
            return Err(GatewayError::Schema(format!(
                "{} response field `success` must be a boolean, got {}",
                shape,
                json_kind(other)
            )))
        }
        None => {
            return Err(GatewayError::Schema(format!(
                "{} response is missing required field `success`",
                shape
            )))
        }
    };

    if !success {
        return Ok(Validated::Rejected {
            reason: rejection_reason(object),
        });
    }

    check_fields(object, shape.fields(), "")
        .map_err(|message| GatewayError::Schema(format!("{} response {}", shape, message)))?;

    Ok(Validated::Accepted(()))
}

/// Validates `raw` against `shape` and converts an accepted body into `T`.
pub fn validate<T: DeserializeOwned>(raw: &Value, shape: Shape) -> Result<Validated<T>> {
    match check(raw, shape)? {
        Validated::Rejected { reason } => Ok(Validated::Rejected { reason }),
        Validated::Accepted(()) => T::deserialize(raw)
            .map(Validated::Accepted)
            .map_err(|e| GatewayError::Schema(format!("{} response: {}", shape, e))),
    }
}

fn check_fields(
    object: &Map<String, Value>,
    fields: &[Field],
    prefix: &str,
) -> std::result::Result<(), String> {
    for field in fields {
        let path = join_path(prefix, field.name);
        match object.get(field.name) {
            Some(value) => check_value(value, &field.kind, &path)?,
            None => return Err(format!("is missing required field `{}`", path)),
        }
    }
    Ok(())
}

fn check_value(value: &Value, kind: &FieldKind, path: &str) -> std::result::Result<(), String> {
    let matches = match kind {
        FieldKind::Bool => value.is_boolean(),
        FieldKind::Integer => value.is_i64() || value.is_u64(),
        FieldKind::Number => value.is_number(),
        FieldKind::Text => value.is_string(),
        FieldKind::MapOf(inner) => {
            let Some(entries) = value.as_object() else {
                return Err(mismatch(path, kind, value));
            };
            for (key, entry) in entries {
                check_value(entry, inner, &join_path(path, key))?;
            }
            true
        }
        FieldKind::Record(fields) => {
            let Some(entries) = value.as_object() else {
                return Err(mismatch(path, kind, value));
            };
            check_fields(entries, fields, path)?;
            true
        }
    };

    if matches {
        Ok(())
    } else {
        Err(mismatch(path, kind, value))
    }
}

fn mismatch(path: &str, kind: &FieldKind, value: &Value) -> String {
    format!(
        "field `{}` must be {}, got {}",
        path,
        kind.describe(),
        json_kind(value)
    )
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Pulls a human-readable explanation out of a `success: false` body.
fn rejection_reason(object: &Map<String, Value>) -> Option<String> {
    let text = |value: Option<&Value>| {
        value
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let from_error = match object.get("error") {
        Some(Value::Object(error)) => text(error.get("info"))
            .or_else(|| text(error.get("message")))
            .or_else(|| text(error.get("type"))),
        Some(value @ Value::String(_)) => text(Some(value)),
        _ => None,
    };

    from_error.or_else(|| text(object.get("message")))
}

/// `/symbols`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolsResponse {
    pub success: bool,
    pub symbols: BTreeMap<String, String>,
}

/// `/latest`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestRatesResponse {
    pub success: bool,
    pub timestamp: i64,
    pub base: String,
    pub date: String,
    pub rates: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertQuery {
    pub from: String,
    pub to: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertInfo {
    pub rate: f64,
    pub timestamp: i64,
}

/// `/convert`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub success: bool,
    pub query: ConvertQuery,
    pub info: ConvertInfo,
    pub result: f64,
    #[serde(default)]
    pub date: Option<String>,
}

/// `/{date}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalResponse {
    pub success: bool,
    pub historical: bool,
    pub date: String,
    pub timestamp: i64,
    pub base: String,
    pub rates: BTreeMap<String, f64>,
}

/// `/timeseries`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesResponse {
    pub success: bool,
    pub timeseries: bool,
    pub start_date: String,
    pub end_date: String,
    pub base: String,
    pub rates: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluctuationRate {
    pub start_rate: f64,
    pub end_rate: f64,
    pub change: f64,
    pub change_pct: f64,
}

/// `/fluctuation`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluctuationResponse {
    pub success: bool,
    pub fluctuation: bool,
    pub start_date: String,
    pub end_date: String,
    pub base: String,
    pub rates: BTreeMap<String, FluctuationRate>,
}
