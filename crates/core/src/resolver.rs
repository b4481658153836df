//! URI resolution and entity retrieval, scoped to the module that asked for them.

use crate::error::{Error, ErrorCode};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::sync::Arc;
use url::Url;

/// Marker for application-relative paths (`~/queries/index.xq`).
pub const APP_ROOT_MARKER: char = '~';

pub trait Resolver: Send + Sync {
    /// Resolve `relative` against `base`, or against the resolver's own origin when `base` is `None`.
    fn resolve_uri(&self, base: Option<&Url>, relative: &str) -> Result<Url, Error>;

    fn get_entity(&self, uri: &Url) -> Result<Box<dyn Read + Send>, Error>;
}

/// Identity of the code that requested a query: a name for diagnostics and
/// the base URL relative identifiers are resolved against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerOrigin {
    name: String,
    base: Url,
}

impl CallerOrigin {
    pub fn new(name: impl Into<String>, base: Url) -> Self {
        Self { name: name.into(), base }
    }

    /// Origin rooted at a directory on disk.
    pub fn from_directory(name: impl Into<String>, dir: &std::path::Path) -> Result<Self, Error> {
        let base = Url::from_directory_path(dir).map_err(|()| {
            Error::from_code(ErrorCode::FODC0005, format!("not an absolute directory: {}", dir.display()))
        })?;
        Ok(Self::new(name, base))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

/// Fetches the bytes behind an absolute URL.
pub trait EntityLoader: Send + Sync {
    fn open(&self, uri: &Url) -> Result<Box<dyn Read + Send>, Error>;
}

/// Loads `file:` URLs from the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl EntityLoader for FileLoader {
    fn open(&self, uri: &Url) -> Result<Box<dyn Read + Send>, Error> {
        if uri.scheme() != "file" {
            return Err(Error::from_code(
                ErrorCode::FODC0002,
                format!("unsupported URI scheme '{}' for {uri}", uri.scheme()),
            ));
        }
        let path = uri
            .to_file_path()
            .map_err(|()| Error::from_code(ErrorCode::FODC0002, format!("not a file path: {uri}")))?;
        let file = File::open(&path).map_err(|e| {
            Error::from_code(ErrorCode::FODC0002, format!("cannot open {}: {e}", path.display())).with_source(e)
        })?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Resolver scoped to one caller origin.
///
/// * absolute identifiers are used as-is
/// * `~/path` and site-absolute `/path` resolve against the application root
/// * anything else resolves against the explicit base, falling back to the caller's base
#[derive(Clone)]
pub struct ModuleResolver {
    origin: CallerOrigin,
    application_root: Url,
    loader: Arc<dyn EntityLoader>,
}

impl ModuleResolver {
    pub fn new(origin: CallerOrigin, application_root: Url, loader: Arc<dyn EntityLoader>) -> Self {
        Self { origin, application_root, loader }
    }

    pub fn origin(&self) -> &CallerOrigin {
        &self.origin
    }

    pub fn application_root(&self) -> &Url {
        &self.application_root
    }

    fn under_application_root(&self, path: &str) -> Result<Url, Error> {
        Ok(self.application_root.join(path.trim_start_matches('/'))?)
    }
}

impl fmt::Debug for ModuleResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleResolver")
            .field("origin", &self.origin)
            .field("application_root", &self.application_root.as_str())
            .finish_non_exhaustive()
    }
}

impl Resolver for ModuleResolver {
    fn resolve_uri(&self, base: Option<&Url>, relative: &str) -> Result<Url, Error> {
        if let Some(rest) = relative.strip_prefix(APP_ROOT_MARKER) {
            return self.under_application_root(rest);
        }
        if relative.starts_with('/') && !relative.starts_with("//") {
            return self.under_application_root(relative);
        }
        match Url::parse(relative) {
            Ok(abs) => Ok(abs),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = base.unwrap_or(&self.origin.base);
                Ok(base.join(relative)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get_entity(&self, uri: &Url) -> Result<Box<dyn Read + Send>, Error> {
        tracing::trace!(uri = %uri, origin = self.origin.name(), "get_entity");
        self.loader.open(uri)
    }
}

/// Creates one resolver per caller origin.
pub trait ResolverFactory: Send + Sync {
    fn for_origin(&self, origin: &CallerOrigin) -> Arc<dyn Resolver>;
}

#[derive(Clone)]
pub struct ModuleResolverFactory {
    application_root: Url,
    loader: Arc<dyn EntityLoader>,
}

impl ModuleResolverFactory {
    pub fn new(application_root: Url, loader: Arc<dyn EntityLoader>) -> Self {
        Self { application_root, loader }
    }

    /// File-system backed factory.
    pub fn files(application_root: Url) -> Self {
        Self::new(application_root, Arc::new(FileLoader))
    }
}

impl ResolverFactory for ModuleResolverFactory {
    fn for_origin(&self, origin: &CallerOrigin) -> Arc<dyn Resolver> {
        Arc::new(ModuleResolver::new(origin.clone(), self.application_root.clone(), Arc::clone(&self.loader)))
    }
}
