//! Calculation parameters and the key-value token formatter.
//!
//! Parameters are an insertion-ordered mapping from option names to tagged
//! values. Nested mappings become named `>block ... end` sections in the
//! input file, and the distinguished keys listed in [`DISTINGUISHED_KEYS`]
//! get special placement in the writer.
//!
//! ```
//! use amesp::params::{ParamValue, Parameters};
//!
//! let mut scf = Parameters::new();
//! scf.insert("maxcyc", ParamValue::Integer(200));
//! scf.insert("diis", ParamValue::Boolean(true));
//!
//! let mut params = Parameters::new();
//! params.insert("keywords", ParamValue::from(vec!["b3lyp", "def2-svp"]));
//! params.insert("scf", ParamValue::Block(scf));
//! assert_eq!(params.len(), 2);
//! ```

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// Parameter names with writer-defined placement.
pub const DISTINGUISHED_KEYS: [&str; 5] = ["npara", "maxcore", "keywords", "charge", "mult"];

/// A single parameter value.
///
/// Deserializes from JSON untagged: booleans, integral numbers, other numbers,
/// strings, arrays of strings and objects, in that order of preference.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// `on` / `off` switch
    Boolean(bool),
    /// Integer option
    Integer(i64),
    /// Real option, rendered with six decimals
    Real(f64),
    /// Free text option
    Text(String),
    /// Ordered list of tokens, used for `keywords`
    List(Vec<String>),
    /// Named block of nested options
    Block(Parameters),
}

impl ParamValue {
    /// Integer view of a numeric value; reals are truncated toward zero.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(v) => Some(*v),
            ParamValue::Real(v) => Some(v.trunc() as i64),
            _ => None,
        }
    }

    /// Whether the value can appear inside a block.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            ParamValue::Boolean(_) | ParamValue::Integer(_) | ParamValue::Real(_) | ParamValue::Text(_)
        )
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Real(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Integer(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Boolean(v)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(v: Vec<&str>) -> Self {
        ParamValue::List(v.into_iter().map(str::to_string).collect())
    }
}

impl From<Parameters> for ParamValue {
    fn from(v: Parameters) -> Self {
        ParamValue::Block(v)
    }
}

/// Insertion-ordered parameter mapping.
///
/// Inserting an existing key replaces its value in place, so iteration order
/// is always the order in which keys were first supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    entries: Vec<(String, ParamValue)>,
}

impl Parameters {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Removes `key` and returns its value.
    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses parameters from a JSON object, keeping document order.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl Serialize for Parameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct ParametersVisitor;

impl<'de> Visitor<'de> for ParametersVisitor {
    type Value = Parameters;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of parameter names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut params = Parameters::new();
        while let Some((key, value)) = access.next_entry::<String, ParamValue>()? {
            params.insert(key, value);
        }
        Ok(params)
    }
}

impl<'de> Deserialize<'de> for Parameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ParametersVisitor)
    }
}

/// Renders one `key value` line of a parameter block.
///
/// Returns `None` for lists and nested blocks, which have no block syntax;
/// the caller drops such keys silently.
///
/// ```
/// use amesp::params::{format_value, ParamValue};
///
/// assert_eq!(format_value("eda", &ParamValue::from("mayer")).as_deref(), Some(" eda mayer"));
/// assert_eq!(format_value("conv", &ParamValue::Real(1e-3)).as_deref(), Some(" conv 0.001000"));
/// assert_eq!(format_value("diis", &ParamValue::Boolean(false)).as_deref(), Some(" diis off"));
/// assert_eq!(format_value("out", &ParamValue::Integer(2)).as_deref(), Some(" out 2"));
/// ```
pub fn format_value(key: &str, value: &ParamValue) -> Option<String> {
    match value {
        ParamValue::Text(v) => Some(format!(" {} {}", key, v)),
        ParamValue::Real(v) => Some(format!(" {} {:.6}", key, v)),
        ParamValue::Boolean(v) => Some(format!(" {} {}", key, if *v { "on" } else { "off" })),
        ParamValue::Integer(v) => Some(format!(" {} {}", key, v)),
        ParamValue::List(_) | ParamValue::Block(_) => None,
    }
}
