//! Normalized request parameters and deterministic cache keys.
//!
//! [`QueryParams`] is what goes on the wire and what [`make_key`] hashes, so a
//! cache key always describes exactly the request that would be sent upstream.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::hash::Hasher;

use fnv::FnvHasher;

use crate::{Currency, Symbol, TimeBound};

/// A parameter value in any of its accepted presentations.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    List(Vec<String>),
    Absent,
}

impl ParamValue {
    /// Canonical wire form, or `None` when the value is absent or empty.
    fn normalize(self) -> Option<String> {
        let normalized = match self {
            Self::Text(text) => text.trim().to_owned(),
            Self::Integer(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Bool(value) => value.to_string(),
            Self::List(items) => items
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .collect::<Vec<_>>()
                .join(","),
            Self::Absent => return None,
        };

        if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<&[Symbol]> for ParamValue {
    fn from(value: &[Symbol]) -> Self {
        Self::List(value.iter().map(|symbol| symbol.as_str().to_owned()).collect())
    }
}

impl From<&[u64]> for ParamValue {
    fn from(value: &[u64]) -> Self {
        Self::List(value.iter().map(u64::to_string).collect())
    }
}

impl From<&Currency> for ParamValue {
    fn from(value: &Currency) -> Self {
        Self::Text(value.as_str().to_owned())
    }
}

impl From<&TimeBound> for ParamValue {
    fn from(value: &TimeBound) -> Self {
        Self::Text(value.as_str().to_owned())
    }
}

impl<T> From<Option<T>> for ParamValue
where
    T: Into<ParamValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

/// Name-ordered set of normalized query parameters.
///
/// Absent and empty values are dropped on insert, so an omitted optional
/// parameter and an explicitly absent one are indistinguishable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<String, String>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        match value.into().normalize() {
            Some(normalized) => {
                self.values.insert(name, normalized);
            }
            None => {
                self.values.remove(&name);
            }
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Percent-encoded `a=1&b=2` form in name order.
    pub fn to_query_string(&self) -> String {
        self.values
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Unambiguous length-prefixed serialization used for hashing.
    fn canonical_form(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.values {
            let _ = write!(out, "{}:{}={}:{};", name.len(), name, value.len(), value);
        }
        out
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

/// Derive the cache key for `operation` called with `params`.
///
/// The key is `"{operation}:{16 hex digits}"`, so keys of one operation share
/// a prefix usable with [`crate::ResponseCache::invalidate_by_prefix`].
pub fn make_key(operation: &str, params: &QueryParams) -> String {
    format!("{operation}:{:016x}", digest(params.canonical_form().as_bytes()))
}

/// 64-bit FNV-1a; stable across processes and Rust releases.
fn digest(bytes: &[u8]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(bytes);
    hasher.finish()
}
