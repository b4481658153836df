//! Namespace-qualified function catalog consumed by a processor's function dispatch.
//!
//! A [`FunctionLibrary`] is generic over the host context `C` that an
//! implementation receives at call time (for web pages: the current request).
//! Registrations carry their declared sequence types so callers can validate
//! arguments and results without knowing the implementation.

mod signature;

pub use signature::{ItemType, Occurrence, SequenceType};

use crate::error::{Error, ErrorCode};
use crate::xdm::{ExpandedName, XdmSequence};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

pub type Arity = usize;

/// Error type returned by function resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No function with this name exists.
    Unknown(ExpandedName),
    /// Function exists, but not for the requested arity. Provides known arities.
    WrongArity { name: ExpandedName, available: Vec<Arity> },
}

impl From<ResolveError> for Error {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Unknown(name) => {
                Error::from_code(ErrorCode::XPST0017, format!("unknown function {name}"))
            }
            ResolveError::WrongArity { name, available } => Error::from_code(
                ErrorCode::XPST0017,
                format!("function {name} cannot be called with this number of arguments (known arities: {available:?})"),
            ),
        }
    }
}

pub struct CallCtx<'a, C> {
    pub context: &'a C,
    pub function: &'a ExpandedName,
}

pub type FunctionImpl<C> =
    Arc<dyn Fn(&CallCtx<C>, &[XdmSequence]) -> Result<XdmSequence, Error> + Send + Sync>;

/// Declared signature of one arity of a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: ExpandedName,
    pub params: Vec<SequenceType>,
    pub return_type: SequenceType,
}

impl FunctionSignature {
    pub fn arity(&self) -> Arity {
        self.params.len()
    }
}

struct Overload<C> {
    signature: FunctionSignature,
    func: FunctionImpl<C>,
}

pub struct FunctionLibrary<C> {
    fns: HashMap<ExpandedName, Vec<Overload<C>>>,
    prefixes: HashMap<String, String>,
}

impl<C> Default for FunctionLibrary<C> {
    fn default() -> Self {
        Self { fns: HashMap::new(), prefixes: HashMap::new() }
    }
}

impl<C> FunctionLibrary<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a prefix to a namespace so scripts (and [`Self::resolve_lexical`]) can use `prefix:local`.
    pub fn bind_prefix(&mut self, prefix: impl Into<String>, ns_uri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), ns_uri.into());
    }

    pub fn namespace_for_prefix(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// Register one arity of a function in a namespace. `return_type` and
    /// `params` use sequence type syntax (`xs:string?`). Re-registering the
    /// same arity replaces the previous implementation.
    pub fn register_ns<F>(
        &mut self,
        ns_uri: &str,
        local: &str,
        return_type: &str,
        params: &[&str],
        f: F,
    ) -> Result<(), Error>
    where
        F: 'static + Send + Sync + Fn(&CallCtx<C>, &[XdmSequence]) -> Result<XdmSequence, Error>,
    {
        let signature = FunctionSignature {
            name: ExpandedName::ns(ns_uri, local),
            params: params.iter().map(|p| SequenceType::parse(p)).collect::<Result<_, _>>()?,
            return_type: SequenceType::parse(return_type)?,
        };
        self.register(signature, Arc::new(f));
        Ok(())
    }

    pub fn register(&mut self, signature: FunctionSignature, func: FunctionImpl<C>) {
        let arity = signature.arity();
        match self.fns.entry(signature.name.clone()) {
            Entry::Vacant(e) => {
                e.insert(vec![Overload { signature, func }]);
            }
            Entry::Occupied(mut e) => {
                let overloads = e.get_mut();
                overloads.retain(|o| o.signature.arity() != arity);
                overloads.push(Overload { signature, func });
                overloads.sort_by_key(|o| o.signature.arity());
            }
        }
    }

    pub fn resolve(&self, name: &ExpandedName, arity: Arity) -> Result<&FunctionImpl<C>, ResolveError> {
        self.overload(name, arity).map(|o| &o.func)
    }

    pub fn signature(&self, name: &ExpandedName, arity: Arity) -> Result<&FunctionSignature, ResolveError> {
        self.overload(name, arity).map(|o| &o.signature)
    }

    /// Resolve `prefix:local` through the bound prefixes.
    pub fn resolve_lexical(&self, lexical: &str) -> Option<ExpandedName> {
        let (prefix, local) = lexical.split_once(':')?;
        let ns = self.prefixes.get(prefix)?;
        Some(ExpandedName::ns(ns, local))
    }

    /// Invoke a function, checking arguments and result against its signature.
    pub fn call(&self, name: &ExpandedName, args: &[XdmSequence], context: &C) -> Result<XdmSequence, Error> {
        let overload = self.overload(name, args.len())?;
        for (i, (arg, ty)) in args.iter().zip(&overload.signature.params).enumerate() {
            if !ty.matches(arg) {
                return Err(Error::from_code(
                    ErrorCode::XPTY0004,
                    format!("argument {} of {name} does not match {ty}", i + 1),
                ));
            }
        }
        tracing::trace!(function = %name, arity = args.len(), "dispatch");
        let ctx = CallCtx { context, function: name };
        let result = (overload.func)(&ctx, args)?;
        if !overload.signature.return_type.matches(&result) {
            return Err(Error::from_code(
                ErrorCode::XPTY0004,
                format!("result of {name} does not match {}", overload.signature.return_type),
            ));
        }
        Ok(result)
    }

    /// All registered signatures, ordered by name and arity.
    pub fn functions(&self) -> Vec<&FunctionSignature> {
        let mut out: Vec<&FunctionSignature> =
            self.fns.values().flat_map(|v| v.iter().map(|o| &o.signature)).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then(a.arity().cmp(&b.arity())));
        out
    }

    pub fn len(&self) -> usize {
        self.fns.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.fns.is_empty()
    }

    fn overload(&self, name: &ExpandedName, arity: Arity) -> Result<&Overload<C>, ResolveError> {
        let Some(cands) = self.fns.get(name) else {
            return Err(ResolveError::Unknown(name.clone()));
        };
        cands.iter().find(|o| o.signature.arity() == arity).ok_or_else(|| ResolveError::WrongArity {
            name: name.clone(),
            available: cands.iter().map(|o| o.signature.arity()).collect(),
        })
    }
}
