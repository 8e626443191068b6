// params.rs

use crate::utils::API_SIGNATURE;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A single call argument as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<ParamValue>),
    /// No value. Encodes to the empty string.
    Null,
    /// Nested mapping. Has no scalar form and encodes to the empty string.
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// String form of a scalar, or `None` for lists, maps and null.
    pub fn as_scalar_string(&self) -> Option<String> {
        match self {
            ParamValue::Str(s) => Some(s.clone()),
            ParamValue::Int(i) => Some(i.to_string()),
            ParamValue::Float(f) => Some(f.to_string()),
            ParamValue::Bool(true) => Some("1".to_string()),
            ParamValue::Bool(false) => Some(String::new()),
            ParamValue::List(_) | ParamValue::Null | ParamValue::Map(_) => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ParamValue::Null)
    }
}

pub type ParameterSet = HashMap<String, ParamValue>;

/// A value after RFC 3986 encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedValue {
    Scalar(String),
    List(Vec<EncodedValue>),
}

impl EncodedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            EncodedValue::Scalar(s) => Some(s),
            EncodedValue::List(_) => None,
        }
    }
}

// Lists render comma-joined in the signature base string.
impl fmt::Display for EncodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodedValue::Scalar(s) => f.write_str(s),
            EncodedValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

/// Encoded parameters in canonical (byte-wise) key order.
pub type EncodedParams = BTreeMap<String, EncodedValue>;

/// Encoded parameters together with the signature computed over them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedParams {
    pub params: EncodedParams,
    pub signature: String,
}

impl SignedParams {
    pub fn get(&self, key: &str) -> Option<&EncodedValue> {
        self.params.get(key)
    }

    /// All pairs in transmission order: signed keys sorted, `api_signature` last.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, EncodedValue)> + '_ {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .chain(std::iter::once((
                API_SIGNATURE,
                EncodedValue::Scalar(self.signature.clone()),
            )))
    }
}
