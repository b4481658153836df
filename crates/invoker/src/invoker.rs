use crate::cache::QueryCache;
use crate::error::InvokeError;
use crate::handler::ResultHandler;
use crate::page::PageHost;
use crate::parameters::Parameters;
use crate::settings::InvokerSettings;
use serde::Serialize;
use std::fmt;
use std::io::{BufRead, Read};
use std::sync::Arc;
use url::Url;
use xqweb_core::{
    APP_ROOT_MARKER, CallerOrigin, CompileOptions, Document, DocumentSource, EntityLoader, Executable, FileLoader,
    ModuleResolverFactory, ParsingOptions, ProcessorRegistry, QueryProcessor, Resolver, ResolverFactory,
    RuntimeOptions, XdmItem,
};

/// Which processor compiles a query.
#[derive(Clone, Default)]
pub enum ProcessorSelector {
    #[default]
    Default,
    Named(String),
    Instance(Arc<dyn QueryProcessor>),
}

impl fmt::Debug for ProcessorSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessorSelector::Default => f.write_str("Default"),
            ProcessorSelector::Named(name) => f.debug_tuple("Named").field(name).finish(),
            ProcessorSelector::Instance(_) => f.write_str("Instance(..)"),
        }
    }
}

/// Entry point: resolves query identifiers for a caller, compiles them once
/// per processor and hands out [`QueryInvoker`]s.
///
/// Cloning is cheap and clones share the cache.
#[derive(Clone)]
pub struct QueryInvokers {
    processors: ProcessorRegistry,
    default_processor: Option<String>,
    resolvers: Arc<dyn ResolverFactory>,
    cache: Arc<QueryCache>,
    pages: Option<Arc<dyn PageHost>>,
}

impl QueryInvokers {
    pub fn builder(processors: ProcessorRegistry) -> QueryInvokersBuilder {
        QueryInvokersBuilder {
            processors,
            default_processor: None,
            application_root: None,
            loader: None,
            resolvers: None,
            cache: None,
            pages: None,
        }
    }

    /// Invoker for `query_uri` compiled by the default processor.
    pub fn with(&self, origin: &CallerOrigin, query_uri: &str) -> Result<QueryInvoker, InvokeError> {
        self.with_selector(origin, query_uri, ProcessorSelector::Default)
    }

    /// Invoker for `query_uri` compiled by the processor registered under `processor`.
    pub fn with_named(&self, origin: &CallerOrigin, query_uri: &str, processor: &str) -> Result<QueryInvoker, InvokeError> {
        self.with_selector(origin, query_uri, ProcessorSelector::Named(processor.to_string()))
    }

    pub fn with_processor(
        &self,
        origin: &CallerOrigin,
        query_uri: &str,
        processor: Arc<dyn QueryProcessor>,
    ) -> Result<QueryInvoker, InvokeError> {
        self.with_selector(origin, query_uri, ProcessorSelector::Instance(processor))
    }

    pub fn with_selector(
        &self,
        origin: &CallerOrigin,
        query_uri: &str,
        selector: ProcessorSelector,
    ) -> Result<QueryInvoker, InvokeError> {
        if query_uri.trim().is_empty() {
            return Err(InvokeError::InvalidArgument("query_uri"));
        }
        let resolver = self.resolvers.for_origin(origin);
        let uri = match Url::parse(query_uri) {
            Ok(absolute) => absolute,
            Err(_) => resolver.resolve_uri(None, query_uri)?,
        };
        let processor = self.select(selector)?;

        let span = tracing::debug_span!("query_invoker", uri = %uri, origin = origin.name());
        let _enter = span.enter();

        let executable = self.cache.get_or_compile(&processor, &uri, || {
            if query_uri.starts_with(APP_ROOT_MARKER)
                && let Some(page) = self.page_executable(query_uri, processor.as_ref())
            {
                return Ok(page);
            }
            let mut source = resolver.get_entity(&uri)?;
            tracing::debug!("compiling query");
            processor.compile(&mut source, &CompileOptions { base_uri: uri.clone(), resolver: Arc::clone(&resolver) })
        })?;

        Ok(QueryInvoker { executable, resolver })
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn processors(&self) -> &ProcessorRegistry {
        &self.processors
    }

    fn select(&self, selector: ProcessorSelector) -> Result<Arc<dyn QueryProcessor>, InvokeError> {
        match selector {
            ProcessorSelector::Instance(p) => Ok(p),
            ProcessorSelector::Named(name) => {
                self.processors.get(&name).ok_or(InvokeError::UnknownProcessor(name))
            }
            ProcessorSelector::Default => match &self.default_processor {
                Some(name) => self.processors.get(name).ok_or_else(|| InvokeError::UnknownProcessor(name.clone())),
                None => self.processors.default_processor().ok_or(InvokeError::NoDefaultProcessor),
            },
        }
    }

    // Matches on processor type rather than instance; two registrations of the
    // same type share precompiled pages.
    fn page_executable(&self, virtual_path: &str, processor: &dyn QueryProcessor) -> Option<Arc<dyn Executable>> {
        let page = self.pages.as_ref()?.compiled_page(virtual_path)?;
        if page.processor_type() == processor.processor_type() {
            tracing::debug!(virtual_path, "reusing precompiled page executable");
            Some(page)
        } else {
            tracing::debug!(virtual_path, "page compiled by another processor type, compiling from source");
            None
        }
    }
}

impl fmt::Debug for QueryInvokers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryInvokers")
            .field("processors", &self.processors)
            .field("default_processor", &self.default_processor)
            .field("cache", &self.cache)
            .field("pages", &self.pages.is_some())
            .finish_non_exhaustive()
    }
}

pub struct QueryInvokersBuilder {
    processors: ProcessorRegistry,
    default_processor: Option<String>,
    application_root: Option<Url>,
    loader: Option<Arc<dyn EntityLoader>>,
    resolvers: Option<Arc<dyn ResolverFactory>>,
    cache: Option<Arc<QueryCache>>,
    pages: Option<Arc<dyn PageHost>>,
}

impl QueryInvokersBuilder {
    /// Directory `~/` identifiers resolve against. Defaults to the current directory.
    #[must_use]
    pub fn application_root(mut self, root: Url) -> Self {
        self.application_root = Some(root);
        self
    }

    /// Where query sources are read from. Defaults to the file system.
    #[must_use]
    pub fn loader(mut self, loader: Arc<dyn EntityLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Replace resolution entirely; `application_root` and `loader` are then ignored.
    #[must_use]
    pub fn resolver_factory(mut self, resolvers: Arc<dyn ResolverFactory>) -> Self {
        self.resolvers = Some(resolvers);
        self
    }

    /// Share a cache between several invoker services.
    #[must_use]
    pub fn cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn page_host(mut self, pages: Arc<dyn PageHost>) -> Self {
        self.pages = Some(pages);
        self
    }

    #[must_use]
    pub fn default_processor(mut self, name: impl Into<String>) -> Self {
        self.default_processor = Some(name.into());
        self
    }

    pub fn settings(mut self, settings: &InvokerSettings) -> Result<Self, InvokeError> {
        if let Some(root) = settings.application_root_url()? {
            self.application_root = Some(root);
        }
        if let Some(name) = &settings.default_processor {
            self.default_processor = Some(name.clone());
        }
        Ok(self)
    }

    pub fn build(self) -> Result<QueryInvokers, InvokeError> {
        let resolvers = match self.resolvers {
            Some(r) => r,
            None => {
                let root = match self.application_root {
                    Some(root) => root,
                    None => current_dir_url()?,
                };
                let loader = self.loader.unwrap_or_else(|| Arc::new(FileLoader));
                Arc::new(ModuleResolverFactory::new(root, loader)) as Arc<dyn ResolverFactory>
            }
        };
        Ok(QueryInvokers {
            processors: self.processors,
            default_processor: self.default_processor,
            resolvers,
            cache: self.cache.unwrap_or_default(),
            pages: self.pages,
        })
    }
}

fn current_dir_url() -> Result<Url, InvokeError> {
    let dir = std::env::current_dir().map_err(|e| InvokeError::Settings(format!("current directory: {e}")))?;
    Url::from_directory_path(&dir)
        .map_err(|()| InvokeError::Settings(format!("not an absolute directory: {}", dir.display())))
}

/// A compiled query paired with the resolver of the caller that asked for it.
///
/// Every `query_*` method builds runtime options around one context item and
/// the given parameters, and returns a [`ResultHandler`].
#[derive(Clone)]
pub struct QueryInvoker {
    executable: Arc<dyn Executable>,
    resolver: Arc<dyn Resolver>,
}

impl QueryInvoker {
    pub fn executable(&self) -> &Arc<dyn Executable> {
        &self.executable
    }

    pub fn resolver(&self) -> &Arc<dyn Resolver> {
        &self.resolver
    }

    /// Byte stream input; the encoding is detected by the processor.
    pub fn query_reader<R: Read>(&self, mut input: R, params: &Parameters) -> Result<ResultHandler, InvokeError> {
        let doc = self
            .executable
            .item_factory()
            .create_node_read_only(DocumentSource::Bytes(&mut input), &self.parsing_options())?;
        self.query_document(doc, params)
    }

    /// Decoded text input.
    pub fn query_text<R: BufRead>(&self, mut input: R, params: &Parameters) -> Result<ResultHandler, InvokeError> {
        let doc = self
            .executable
            .item_factory()
            .create_node_read_only(DocumentSource::Text(&mut input), &self.parsing_options())?;
        self.query_document(doc, params)
    }

    /// Input from an XML pull parser, parsed without the caller's resolver.
    pub fn query_xml(
        &self,
        input: quick_xml::Reader<&mut dyn BufRead>,
        params: &Parameters,
    ) -> Result<ResultHandler, InvokeError> {
        let doc = self
            .executable
            .item_factory()
            .create_node_read_only(DocumentSource::Xml(input), &ParsingOptions::default())?;
        self.query_document(doc, params)
    }

    /// Arbitrary serializable object, converted to a document by the processor's item factory.
    pub fn query_value<T: Serialize + ?Sized>(&self, input: &T, params: &Parameters) -> Result<ResultHandler, InvokeError> {
        let value = serde_json::to_value(input).map_err(|e| InvokeError::Input(e.to_string()))?;
        if value.is_null() {
            return Err(InvokeError::InvalidArgument("input"));
        }
        let doc = self.executable.item_factory().create_document(&value)?;
        self.query_document(doc, params)
    }

    pub fn query_document(&self, input: Document, params: &Parameters) -> Result<ResultHandler, InvokeError> {
        let mut options = RuntimeOptions {
            context_item: Some(XdmItem::Node(input)),
            input_resolver: Some(Arc::clone(&self.resolver)),
            ..RuntimeOptions::default()
        };
        let factory = self.executable.item_factory();
        for (name, value) in params.to_bindings(factory.as_ref())? {
            options.external_variables.insert(name, value);
        }
        Ok(self.query_options(options))
    }

    pub fn query_options(&self, options: RuntimeOptions) -> ResultHandler {
        ResultHandler::new(Arc::clone(&self.executable), options)
    }

    fn parsing_options(&self) -> ParsingOptions {
        ParsingOptions { resolver: Some(Arc::clone(&self.resolver)), base_uri: None }
    }
}

impl fmt::Debug for QueryInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryInvoker")
            .field("base_uri", &self.executable.base_uri().map(Url::as_str))
            .finish_non_exhaustive()
    }
}
