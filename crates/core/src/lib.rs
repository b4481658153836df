pub mod consts;
pub mod error;
pub mod functions;
pub mod processor;
pub mod registry;
pub mod resolver;
pub mod xdm;

pub use error::{Error, ErrorCode};
pub use functions::{CallCtx, FunctionLibrary, FunctionSignature, ResolveError, SequenceType};
pub use processor::{
    CompileOptions, DocumentSource, Executable, ItemFactory, ParsingOptions, QueryProcessor, RuntimeOptions,
};
pub use registry::{ProcessorRegistry, ProcessorRegistryBuilder};
pub use resolver::{
    APP_ROOT_MARKER, CallerOrigin, EntityLoader, FileLoader, ModuleResolver, ModuleResolverFactory, Resolver,
    ResolverFactory,
};
pub use xdm::{Document, ExpandedName, NavigableDocument, XdmAtomicValue, XdmItem, XdmSequence};
