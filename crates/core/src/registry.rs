use crate::processor::QueryProcessor;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Name-keyed set of available processors plus one designated default.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: BTreeMap<String, Arc<dyn QueryProcessor>>,
    default: Option<String>,
}

impl ProcessorRegistry {
    pub fn builder() -> ProcessorRegistryBuilder {
        ProcessorRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn QueryProcessor>> {
        self.processors.get(name).cloned()
    }

    pub fn default_processor(&self) -> Option<Arc<dyn QueryProcessor>> {
        self.default.as_deref().and_then(|name| self.get(name))
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.processors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("processors", &self.processors.keys().collect::<Vec<_>>())
            .field("default", &self.default)
            .finish()
    }
}

#[derive(Default)]
pub struct ProcessorRegistryBuilder {
    registry: ProcessorRegistry,
}

impl ProcessorRegistryBuilder {
    /// The first registered processor becomes the default unless one is chosen explicitly.
    pub fn register(mut self, name: impl Into<String>, processor: Arc<dyn QueryProcessor>) -> Self {
        let name = name.into();
        if self.registry.default.is_none() {
            self.registry.default = Some(name.clone());
        }
        self.registry.processors.insert(name, processor);
        self
    }

    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.registry.default = Some(name.into());
        self
    }

    pub fn build(self) -> ProcessorRegistry {
        self.registry
    }
}
