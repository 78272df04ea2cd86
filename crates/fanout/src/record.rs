//! Worker records as handed out by the job registry.
//!
//! A [`WorkerRecord`] is an opaque bag of attributes describing one worker
//! slot. The only attributes this crate reads are the process descriptor
//! (to decide liveness) and the `url`/`token` pair (to connect). Keys may be
//! given either as plain text (`"url"`) or as symbols (`":url"` in serialized
//! form); lookups accept both, preferring the text form.

use core::fmt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};

/// Attribute holding the process bound to a worker slot.
pub const PROCESS_DESCRIPTOR_KEY: &str = "proc";

/// Prefix marking a symbol key in serialized records.
const SYMBOL_PREFIX: char = ':';

/// A record attribute name in either text or symbol form.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeKey {
    Text(String),
    Symbol(String),
}

impl AttributeKey {
    pub fn text(name: impl Into<String>) -> Self {
        Self::Text(name.into())
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    /// Parses the serialized form: a leading `:` denotes a symbol.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(SYMBOL_PREFIX) {
            Some(name) if !name.is_empty() => Self::symbol(name),
            _ => Self::text(raw),
        }
    }

    /// The attribute name without any symbol marker.
    pub fn name(&self) -> &str {
        match self {
            Self::Text(name) | Self::Symbol(name) => name,
        }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(name) => write!(f, "{name}"),
            Self::Symbol(name) => write!(f, "{SYMBOL_PREFIX}{name}"),
        }
    }
}

impl From<&str> for AttributeKey {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl Serialize for AttributeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AttributeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Attribute map shared by worker records and mapping-style connection
/// arguments.
pub type Attributes = BTreeMap<AttributeKey, Value>;

/// Looks up `name` under its text key, falling back to its symbol key.
pub fn lookup<'a>(attributes: &'a Attributes, name: &str) -> Option<&'a Value> {
    attributes
        .get(&AttributeKey::text(name))
        .filter(|value| !value.is_null())
        .or_else(|| attributes.get(&AttributeKey::symbol(name)))
}

/// One discovered worker slot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerRecord {
    attributes: Attributes,
}

impl WorkerRecord {
    pub fn new(attributes: Attributes) -> Self {
        Self { attributes }
    }

    /// Adds or replaces an attribute, builder style.
    pub fn with(mut self, key: impl Into<AttributeKey>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        lookup(&self.attributes, name)
    }

    pub fn process_descriptor(&self) -> Option<&Value> {
        self.get(PROCESS_DESCRIPTOR_KEY)
    }

    /// A record is live when a non-empty process descriptor is bound to it.
    pub fn is_live(&self) -> bool {
        self.process_descriptor().is_some_and(|proc| !is_empty(proc))
    }
}

impl From<Attributes> for WorkerRecord {
    fn from(attributes: Attributes) -> Self {
        Self::new(attributes)
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Keeps only live records, preserving their relative order.
pub fn live_records<I>(records: I) -> Vec<WorkerRecord>
where
    I: IntoIterator<Item = WorkerRecord>,
{
    records.into_iter().filter(WorkerRecord::is_live).collect()
}

/// Source of the current set of known worker records.
///
/// The registry owns record lifecycle; callers only ever read the snapshot it
/// returns.
pub trait JobRegistry {
    fn worker_records(&self) -> Vec<WorkerRecord>;
}

impl JobRegistry for Vec<WorkerRecord> {
    fn worker_records(&self) -> Vec<WorkerRecord> {
        self.clone()
    }
}

impl<R: JobRegistry + ?Sized> JobRegistry for Arc<R> {
    fn worker_records(&self) -> Vec<WorkerRecord> {
        (**self).worker_records()
    }
}

impl<F> JobRegistry for F
where
    F: Fn() -> Vec<WorkerRecord>,
{
    fn worker_records(&self) -> Vec<WorkerRecord> {
        self()
    }
}
