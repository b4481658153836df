//! Parameter bags: arbitrary serializable objects reflected into external variables.

use crate::error::InvokeError;
use serde::Serialize;
use serde_json::Value;
use xqweb_core::{ExpandedName, ItemFactory, XdmAtomicValue, XdmItem, XdmSequence};

/// Name/value pairs bound as external variables, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    pairs: Vec<(String, Value)>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reflect any value that serializes to a map. `()` and `None` give an empty bag.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, InvokeError> {
        match serde_json::to_value(value).map_err(|e| InvokeError::Parameters(e.to_string()))? {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => Ok(Self { pairs: map.into_iter().collect() }),
            other => Err(InvokeError::Parameters(kind_of(&other).to_string())),
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((name, value)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// External variable bindings keyed by the no-namespace name of each key.
    pub(crate) fn to_bindings(&self, factory: &dyn ItemFactory) -> Result<Vec<(ExpandedName, XdmSequence)>, InvokeError> {
        self.pairs
            .iter()
            .map(|(name, value)| Ok((ExpandedName::local(name.as_str()), to_sequence(value, factory)?)))
            .collect()
    }
}

fn to_sequence(value: &Value, factory: &dyn ItemFactory) -> Result<XdmSequence, InvokeError> {
    let mut out = Vec::new();
    push_items(value, factory, &mut out)?;
    Ok(out)
}

fn push_items(value: &Value, factory: &dyn ItemFactory, out: &mut XdmSequence) -> Result<(), InvokeError> {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push(XdmItem::Atomic(XdmAtomicValue::Boolean(*b))),
        Value::Number(n) => out.push(XdmItem::Atomic(match n.as_i64() {
            Some(i) => XdmAtomicValue::Integer(i),
            None => XdmAtomicValue::Double(n.as_f64().unwrap_or(f64::NAN)),
        })),
        Value::String(s) => out.push(XdmItem::Atomic(XdmAtomicValue::String(s.clone()))),
        Value::Array(items) => {
            for item in items {
                push_items(item, factory, out)?;
            }
        }
        Value::Object(_) => out.push(XdmItem::Node(factory.create_document(value)?)),
    }
    Ok(())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
