//! Boundary to the external query engine.
//!
//! Nothing here evaluates XQuery. A processor compiles source text into an
//! [`Executable`], and the executable runs against [`RuntimeOptions`].

use crate::error::Error;
use crate::resolver::Resolver;
use crate::xdm::{Document, ExpandedName, XdmItem, XdmSequence};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, Read, Write};
use std::sync::Arc;
use url::Url;

#[derive(Clone)]
pub struct CompileOptions {
    pub base_uri: Url,
    /// Used by the processor for imports and other nested resolution.
    pub resolver: Arc<dyn Resolver>,
}

#[derive(Clone, Default)]
pub struct ParsingOptions {
    pub resolver: Option<Arc<dyn Resolver>>,
    pub base_uri: Option<Url>,
}

#[derive(Clone, Default)]
pub struct RuntimeOptions {
    pub context_item: Option<XdmItem>,
    pub external_variables: HashMap<ExpandedName, XdmSequence>,
    /// Resolver for `fn:doc` and friends while the query runs.
    pub input_resolver: Option<Arc<dyn Resolver>>,
}

impl RuntimeOptions {
    pub fn with_context_item(mut self, item: impl Into<XdmItem>) -> Self {
        self.context_item = Some(item.into());
        self
    }

    pub fn with_variable(mut self, name: ExpandedName, value: impl Into<XdmSequence>) -> Self {
        self.external_variables.insert(name, value.into());
        self
    }

    pub fn with_input_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.input_resolver = Some(resolver);
        self
    }
}

impl fmt::Debug for RuntimeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeOptions")
            .field("context_item", &self.context_item)
            .field("external_variables", &self.external_variables)
            .field("input_resolver", &self.input_resolver.is_some())
            .finish()
    }
}

/// Raw input an item factory can turn into a document.
pub enum DocumentSource<'a> {
    /// Undecoded bytes; the encoding comes from the XML declaration.
    Bytes(&'a mut dyn Read),
    /// Already-decoded UTF-8 text.
    Text(&'a mut dyn BufRead),
    /// A pull parser positioned at the start of the document.
    Xml(quick_xml::Reader<&'a mut dyn BufRead>),
}

pub trait ItemFactory: Send + Sync {
    fn create_node_read_only(&self, input: DocumentSource<'_>, options: &ParsingOptions)
    -> Result<Document, Error>;

    /// Convert an arbitrary object (in its serialized JSON form) into a document.
    fn create_document(&self, value: &serde_json::Value) -> Result<Document, Error>;
}

pub trait Executable: Send + Sync {
    fn base_uri(&self) -> Option<&Url>;

    /// Type of the processor that produced this executable.
    fn processor_type(&self) -> TypeId;

    fn item_factory(&self) -> Arc<dyn ItemFactory>;

    fn run(&self, options: &RuntimeOptions, output: &mut dyn Write) -> Result<(), Error>;
}

pub trait QueryProcessor: Send + Sync + 'static {
    fn compile(&self, source: &mut dyn Read, options: &CompileOptions) -> Result<Arc<dyn Executable>, Error>;

    fn item_factory(&self) -> Arc<dyn ItemFactory>;

    /// Identifies the implementation, not the instance.
    fn processor_type(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}
