use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ConnectorError;

pub type Bag = Map<String, Value>;

// Zero, `false` and the empty string read as "not set" inside override
// collections; `is_unset` reports that sentinel so cascades can skip it.
pub trait ParamValue: Sized {
    fn parse(value: &Value) -> Result<Self, String>;

    fn is_unset(&self) -> bool;
}

impl ParamValue for f64 {
    fn parse(value: &Value) -> Result<Self, String> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("{n} is not a finite number")),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("`{s}` is not a number")),
            other => Err(format!("expected a number, got {other}")),
        }
    }

    fn is_unset(&self) -> bool {
        *self == 0.0
    }
}

impl ParamValue for u32 {
    fn parse(value: &Value) -> Result<Self, String> {
        let raw = <f64 as ParamValue>::parse(value)?;
        if raw < 0.0 || raw.fract() != 0.0 || raw > f64::from(u32::MAX) {
            return Err(format!("expected a whole non-negative number, got {raw}"));
        }
        Ok(raw as u32)
    }

    fn is_unset(&self) -> bool {
        *self == 0
    }
}

impl ParamValue for bool {
    fn parse(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" | "" => Ok(false),
                _ => Err(format!("`{s}` is not a boolean")),
            },
            other => Err(format!("expected a boolean, got {other}")),
        }
    }

    fn is_unset(&self) -> bool {
        !*self
    }
}

impl ParamValue for String {
    fn parse(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(s) => Ok(s.trim().to_string()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(format!("expected a string, got {other}")),
        }
    }

    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

/// First set value across an ordered list of `(bag, key)` lookups. Absent
/// bags, missing keys, `null`, sentinels and malformed values are skipped.
pub fn first_set<T: ParamValue>(lookups: &[(Option<&Bag>, &str)]) -> Option<T> {
    lookups.iter().find_map(|(bag, key)| {
        let value = bag.and_then(|b| b.get(*key))?;
        if value.is_null() {
            return None;
        }
        match T::parse(value) {
            Ok(v) if !v.is_unset() => Some(v),
            Ok(_) => None,
            Err(reason) => {
                warn!(key = *key, %reason, "ignoring malformed optional parameter");
                None
            }
        }
    })
}

pub fn cascade<T: ParamValue>(lookups: &[(Option<&Bag>, &str)], fallback: T) -> T {
    first_set(lookups).unwrap_or(fallback)
}

#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    pub index: usize,
    pub params: &'a Bag,
}

impl<'a> Row<'a> {
    pub fn new(index: usize, params: &'a Bag) -> Self {
        Self { index, params }
    }

    fn present(&self, key: &str) -> Option<&'a Value> {
        self.params.get(key).filter(|v| !v.is_null())
    }

    pub fn required<T: ParamValue>(&self, key: &str) -> Result<T, ConnectorError> {
        let value = self
            .present(key)
            .ok_or_else(|| ConnectorError::MissingParameter {
                row: self.index,
                name: key.to_string(),
            })?;
        T::parse(value).map_err(|reason| ConnectorError::InvalidParameter {
            row: self.index,
            name: key.to_string(),
            reason,
        })
    }

    // Presence-based: an explicit zero is returned as is.
    pub fn optional<T: ParamValue>(&self, key: &str) -> Result<Option<T>, ConnectorError> {
        self.present(key)
            .map(|value| {
                T::parse(value).map_err(|reason| ConnectorError::InvalidParameter {
                    row: self.index,
                    name: key.to_string(),
                    reason,
                })
            })
            .transpose()
    }

    pub fn bag(&self, key: &str) -> Option<&'a Bag> {
        self.params.get(key).and_then(Value::as_object)
    }
}
