use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{convert::Infallible, fmt, str::FromStr};

use super::error::StoreError;
use super::time::{TimeError, TimeOfDay};

/// One entry in the route list, as persisted in the JSON file.
/// Keys that are missing or `null` load as empty values; a field of an
/// unexpected JSON type is kept rather than rejected.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Route {
    #[serde(deserialize_with = "text_or_empty")]
    pub destination: String,
    pub number: Option<RouteNumber>,
    /// Normally an `HH:MM` string. Anything else is only reported when a
    /// comparison needs it.
    pub time: Value,
}

impl Route {
    pub fn new(destination: String, number: Option<RouteNumber>, time: TimeOfDay) -> Self {
        Route {
            destination,
            number,
            time: Value::String(time.to_string()),
        }
    }

    /// The stored time as shown in a table.
    pub fn time_text(&self) -> String {
        value_text(&self.time)
    }

    /// Parses the stored departure time.
    pub fn departure(&self) -> Result<TimeOfDay, StoreError> {
        match &self.time {
            Value::String(s) => {
                TimeOfDay::parse_hhmm(s).map_err(|e| StoreError::invalid_time(s, e))
            }
            other => Err(StoreError::invalid_time(
                &value_text(other),
                TimeError::new("expected an HH:MM string"),
            )),
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn text_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        other => value_text(&other),
    })
}

/// A route number. Some lists hold plain integers, others free text such as "12A",
/// so the value is kept as whichever JSON type it arrived as.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RouteNumber {
    Integer(i64),
    Text(String),
    Other(Value),
}

impl FromStr for RouteNumber {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i64>() {
            Ok(n) => Ok(RouteNumber::Integer(n)),
            Err(_) => Ok(RouteNumber::Text(s.to_string())),
        }
    }
}

impl fmt::Display for RouteNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteNumber::Integer(n) => write!(f, "{n}"),
            RouteNumber::Text(s) => write!(f, "{s}"),
            RouteNumber::Other(value) => write!(f, "{}", value_text(value)),
        }
    }
}
