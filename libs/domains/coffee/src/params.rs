//! Typed access to JSON-RPC `params`; every failure names the offending field.

use jsonrpc::RpcError;
use serde_json::{Map, Value};
use uuid::Uuid;

fn invalid(key: &str, detail: impl std::fmt::Display) -> RpcError {
    RpcError::InvalidParams(format!("{}: {}", key, detail))
}

pub struct ParamReader {
    params: Map<String, Value>,
}

impl ParamReader {
    pub fn new(params: Option<Map<String, Value>>) -> Self {
        Self {
            params: params.unwrap_or_default(),
        }
    }

    /// `null` counts as absent.
    fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key).filter(|v| !v.is_null())
    }

    /// Required, non-empty array of non-blank strings. Order is preserved.
    pub fn string_list(&self, key: &str) -> Result<Vec<String>, RpcError> {
        let value = self.get(key).ok_or_else(|| invalid(key, "is required"))?;
        let Value::Array(items) = value else {
            return Err(invalid(key, "must be an array of strings"));
        };
        if items.is_empty() {
            return Err(invalid(key, "must not be empty"));
        }

        items
            .iter()
            .map(|item| match item.as_str().map(str::trim) {
                Some(s) if !s.is_empty() => Ok(s.to_string()),
                Some(_) => Err(invalid(key, "must not contain blank entries")),
                None => Err(invalid(key, "must be an array of strings")),
            })
            .collect()
    }

    /// Optional string; blank strings are treated as absent.
    pub fn optional_string(&self, key: &str) -> Result<Option<String>, RpcError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
            Some(_) => Err(invalid(key, "must be a string")),
        }
    }

    pub fn optional_bool(&self, key: &str) -> Result<Option<bool>, RpcError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(invalid(key, "must be a boolean")),
        }
    }

    /// Optional integer within `min..=max`.
    pub fn optional_count(&self, key: &str, min: usize, max: usize) -> Result<Option<usize>, RpcError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let n = value.as_u64().ok_or_else(|| range_error(key, min, max))?;
        let n = usize::try_from(n).map_err(|_| range_error(key, min, max))?;
        if n < min || n > max {
            return Err(range_error(key, min, max));
        }
        Ok(Some(n))
    }

    pub fn optional_number(&self, key: &str) -> Result<Option<f64>, RpcError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .filter(|n| n.is_finite())
                .map(Some)
                .ok_or_else(|| invalid(key, "must be a number")),
        }
    }

    pub fn number(&self, key: &str) -> Result<f64, RpcError> {
        self.optional_number(key)?
            .ok_or_else(|| invalid(key, "is required"))
    }

    pub fn optional_uuid(&self, key: &str) -> Result<Option<Uuid>, RpcError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Uuid::parse_str(s.trim())
                .map(Some)
                .map_err(|_| invalid(key, "must be a UUID")),
            Some(_) => Err(invalid(key, "must be a UUID string")),
        }
    }

    pub fn uuid(&self, key: &str) -> Result<Uuid, RpcError> {
        self.optional_uuid(key)?
            .ok_or_else(|| invalid(key, "is required"))
    }
}

fn range_error(key: &str, min: usize, max: usize) -> RpcError {
    if min == 0 {
        invalid(key, format!("must be a non-negative integer no greater than {}", max))
    } else {
        invalid(key, format!("must be an integer between {} and {}", min, max))
    }
}

/// Numeric range check that names the field.
pub fn ensure_range(key: &str, value: f64, min: f64, max: f64) -> Result<f64, RpcError> {
    if value < min || value > max {
        return Err(invalid(key, format!("must be between {} and {}", min, max)));
    }
    Ok(value)
}
