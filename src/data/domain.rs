//! Record, identifier and cohort definitions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::error::{GuardError, GuardResult};
use crate::common::ids;

/// Stable, high-cardinality attributes hashed into a [`PseudoId`], in order.
pub const STABLE_ATTRIBUTES: [&str; 6] = ["age", "job", "education", "balance", "day", "month"];

/// Joins the stable attribute values before hashing.
pub const ID_DELIMITER: &str = "_";

/// One attribute value of a customer record.
///
/// Values render the way the upstream data tooling prints them: floats keep
/// a fractional part (`1000.0`), booleans read `True`/`False`, and a null
/// renders empty so it hashes like an absent attribute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => Ok(()),
            AttrValue::Bool(true) => f.write_str("True"),
            AttrValue::Bool(false) => f.write_str("False"),
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Float(v) => write_float(f, *v),
            AttrValue::Text(v) => f.write_str(v),
        }
    }
}

/// Shortest round-trip digits; exponent form outside `[1e-4, 1e16)`.
fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        return f.write_str("nan");
    }
    if v.is_infinite() {
        return f.write_str(if v > 0.0 { "inf" } else { "-inf" });
    }
    let abs = v.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let sci = format!("{v:e}");
        let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
        let exp: i32 = exp.parse().unwrap_or(0);
        let sign = if exp < 0 { '-' } else { '+' };
        return write!(f, "{mantissa}e{sign}{:02}", exp.unsigned_abs());
    }
    if v.fract() == 0.0 {
        write!(f, "{v:.1}")
    } else {
        write!(f, "{v}")
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(i64::from(value))
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

/// Immutable mapping of named attributes for one customer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    attrs: BTreeMap<String, AttrValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert used when assembling records.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<AttrValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            attrs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Hex digest standing in for a direct customer identifier.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PseudoId(String);

impl PseudoId {
    /// Validate an externally supplied identifier (64 lowercase hex chars).
    pub fn parse(value: impl Into<String>) -> GuardResult<Self> {
        let value = value.into();
        if ids::is_digest_hex(&value) {
            Ok(Self(value))
        } else {
            Err(GuardError::invalid(format!(
                "pseudo id must be {} lowercase hex characters",
                ids::DIGEST_HEX_LEN
            )))
        }
    }

    pub(crate) fn from_digest(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last two hex characters read as an integer in 0..=255.
    pub fn suffix_value(&self) -> u8 {
        let tail = &self.0[self.0.len() - 2..];
        // parse() guarantees hex digits, so this cannot fail.
        u8::from_str_radix(tail, 16).unwrap_or_default()
    }
}

impl fmt::Display for PseudoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PseudoId {
    type Error = GuardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PseudoId::parse(value)
    }
}

impl From<PseudoId> for String {
    fn from(value: PseudoId) -> Self {
        value.0
    }
}

/// Percentage of buckets (0..=100) routed to the control cohort.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ControlPct(u8);

impl ControlPct {
    pub fn new(pct: u8) -> GuardResult<Self> {
        if pct <= 100 {
            Ok(Self(pct))
        } else {
            Err(GuardError::config(format!(
                "control percentage must be within 0..=100, got {pct}"
            )))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for ControlPct {
    fn default() -> Self {
        Self(20)
    }
}

/// Permanent experiment label of a record.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cohort {
    Control,
    Train,
}

impl Cohort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cohort::Control => "control",
            Cohort::Train => "train",
        }
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which attributes feed the identifier and how they are joined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityScheme {
    pub attributes: Vec<String>,
    pub delimiter: String,
}

impl Default for IdentityScheme {
    fn default() -> Self {
        Self {
            attributes: STABLE_ATTRIBUTES.iter().map(|s| s.to_string()).collect(),
            delimiter: ID_DELIMITER.to_string(),
        }
    }
}

impl IdentityScheme {
    /// Delimiter-joined stable attributes; missing ones contribute "".
    pub fn canonical(&self, record: &Record) -> String {
        self.attributes
            .iter()
            .map(|name| record.get(name).map(|v| v.to_string()).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(self.delimiter.as_str())
    }

    pub fn identify(&self, record: &Record) -> PseudoId {
        PseudoId::from_digest(ids::sha256_hex(&self.canonical(record)))
    }
}
