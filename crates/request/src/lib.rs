//! The `request` function module: read-only accessors for the HTTP request
//! a query is serving, callable from scripts as `request:url()`,
//! `request:query('id')`, `request:cookie('session')` and so on.
//!
//! The host builds a [`RequestContext`] from the incoming request, wraps it
//! in a [`WebContext`] and passes that to the function library on every call.

mod collection;
mod context;
pub mod module;
mod registration;
mod response;
pub mod uri_format;
mod virtual_path;

pub use collection::NameValueCollection;
pub use context::{RequestContext, RequestContextBuilder, WebContext};
pub use module::cookie_with_remove;
pub use registration::{NAMESPACE, PREFIX, register_request_module, request_module};
pub use response::{ResponseContext, ResponseCookie};
pub use uri_format::{UriComponents, UriFormat};
