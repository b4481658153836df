use std::sync::Arc;
use xqweb_core::Executable;

/// Hosting page infrastructure that may already hold a compiled executable
/// for an application-relative path (`~/pages/index.xq`).
pub trait PageHost: Send + Sync {
    fn compiled_page(&self, virtual_path: &str) -> Option<Arc<dyn Executable>>;
}
