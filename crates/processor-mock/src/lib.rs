//! Deterministic in-memory query processor for tests.
//!
//! The mock "compiles" a tiny template language instead of XQuery:
//! `{.}` expands to the context item's string value and `{$name}` to the
//! space-separated values of an external variable. Sources containing
//! `error(` fail to compile. Compilations are counted so tests can assert
//! caching behaviour.

mod document;
mod loader;
mod processor;

pub use document::{MockDocument, MockItemFactory};
pub use loader::MemoryLoader;
pub use processor::{AlternateProcessor, MockExecutable, MockProcessor};
