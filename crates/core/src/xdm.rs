use core::fmt;
use std::any::Any;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpandedName {
    pub ns_uri: Option<String>,
    pub local: String,
}

impl ExpandedName {
    pub fn new(ns_uri: Option<String>, local: impl Into<String>) -> Self {
        Self { ns_uri, local: local.into() }
    }

    /// Name without a namespace, as used for external variables bound from plain keys.
    pub fn local(local: impl Into<String>) -> Self {
        Self { ns_uri: None, local: local.into() }
    }

    pub fn ns(ns_uri: &str, local: impl Into<String>) -> Self {
        Self { ns_uri: Some(ns_uri.to_string()), local: local.into() }
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns_uri {
            Some(ns) => write!(f, "Q{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum XdmAtomicValue {
    Boolean(bool),
    String(String),
    Integer(i64),
    Double(f64),
    AnyUri(String),
    UntypedAtomic(String),
}

impl XdmAtomicValue {
    /// Lexical form of the value.
    pub fn to_lexical(&self) -> String {
        match self {
            XdmAtomicValue::Boolean(b) => b.to_string(),
            XdmAtomicValue::String(s) | XdmAtomicValue::AnyUri(s) | XdmAtomicValue::UntypedAtomic(s) => {
                s.clone()
            }
            XdmAtomicValue::Integer(i) => i.to_string(),
            XdmAtomicValue::Double(d) => d.to_string(),
        }
    }
}

/// A navigable, read-only document produced by a processor's item factory.
///
/// Processors downcast through [`NavigableDocument::as_any`] to reach their
/// own tree representation.
pub trait NavigableDocument: fmt::Debug + Send + Sync {
    fn base_uri(&self) -> Option<&str> {
        None
    }
    fn string_value(&self) -> String;
    fn as_any(&self) -> &dyn Any;
}

pub type Document = Arc<dyn NavigableDocument>;

#[derive(Debug, Clone)]
pub enum XdmItem {
    Atomic(XdmAtomicValue),
    Node(Document),
}

impl XdmItem {
    pub fn string_value(&self) -> String {
        match self {
            XdmItem::Atomic(a) => a.to_lexical(),
            XdmItem::Node(n) => n.string_value(),
        }
    }

    pub fn as_atomic(&self) -> Option<&XdmAtomicValue> {
        match self {
            XdmItem::Atomic(a) => Some(a),
            XdmItem::Node(_) => None,
        }
    }
}

impl PartialEq for XdmItem {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (XdmItem::Atomic(a), XdmItem::Atomic(b)) => a == b,
            (XdmItem::Node(a), XdmItem::Node(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<XdmAtomicValue> for XdmItem {
    fn from(value: XdmAtomicValue) -> Self {
        XdmItem::Atomic(value)
    }
}

impl From<Document> for XdmItem {
    fn from(value: Document) -> Self {
        XdmItem::Node(value)
    }
}

impl fmt::Display for XdmItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XdmItem::Node(_) => write!(f, "<node>"),
            XdmItem::Atomic(a) => write!(f, "{a:?}"),
        }
    }
}

pub type XdmSequence = Vec<XdmItem>;

pub fn string(value: impl Into<String>) -> XdmSequence {
    vec![XdmItem::Atomic(XdmAtomicValue::String(value.into()))]
}

pub fn optional_string(value: Option<impl Into<String>>) -> XdmSequence {
    value.map(string).unwrap_or_default()
}

pub fn strings<I, S>(values: I) -> XdmSequence
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(|s| XdmItem::Atomic(XdmAtomicValue::String(s.into()))).collect()
}

pub fn boolean(value: bool) -> XdmSequence {
    vec![XdmItem::Atomic(XdmAtomicValue::Boolean(value))]
}

pub fn integer(value: i64) -> XdmSequence {
    vec![XdmItem::Atomic(XdmAtomicValue::Integer(value))]
}
