//! The request functions, as plain Rust over a [`WebContext`].
//!
//! [`crate::register_request_module`] exposes each of these to query scripts
//! under the `request` namespace.

use crate::context::WebContext;
use crate::uri_format::uri_to_string;
use crate::virtual_path::{self, append_trailing_slash, strip_prefix_ignore_case, to_app_relative};
use http::Method;
use std::net::IpAddr;
use std::path::PathBuf;
use url::Url;
use xqweb_core::{Error, ErrorCode};

pub const X_HTTP_METHOD_OVERRIDE: &str = "X-HTTP-Method-Override";
pub const X_REQUESTED_WITH: &str = "X-Requested-With";
const XML_HTTP_REQUEST: &str = "XMLHttpRequest";

/// Application path with a trailing slash.
pub fn application_path(ctx: &WebContext) -> String {
    append_trailing_slash(ctx.request().application_path())
}

/// The request URL; see [`crate::uri_format`] for `components` and `format`.
pub fn url(ctx: &WebContext, components: Option<&str>, format: Option<&str>) -> Result<String, Error> {
    uri_to_string(ctx.request().url(), components, format)
}

pub fn app_relative_path(ctx: &WebContext) -> String {
    let request = ctx.request();
    to_app_relative(request.file_path(), request.application_path()) + request.path_info()
}

pub fn app_relative_file_path(ctx: &WebContext) -> String {
    let request = ctx.request();
    to_app_relative(request.file_path(), request.application_path())
}

pub fn path_info(ctx: &WebContext) -> String {
    ctx.request().path_info().to_string()
}

pub fn path(ctx: &WebContext) -> String {
    ctx.request().path().to_string()
}

pub fn file_path(ctx: &WebContext) -> String {
    ctx.request().file_path().to_string()
}

/// `relative` combined with the directory of the current file, as a site-absolute path.
pub fn resolve_url(ctx: &WebContext, relative: &str) -> Result<String, Error> {
    let request = ctx.request();
    virtual_path::combine(request.file_path(), relative, request.application_path())
}

/// Like [`url`] for the `Referer` header. A missing or unparsable header gives `None`.
pub fn referrer_url(ctx: &WebContext, components: Option<&str>, format: Option<&str>) -> Result<Option<String>, Error> {
    let Some(referrer) = ctx.request().header(http::header::REFERER.as_str()) else {
        return Ok(None);
    };
    match Url::parse(&referrer) {
        Ok(uri) => uri_to_string(&uri, components, format).map(Some),
        Err(e) => {
            tracing::debug!(referrer = %referrer, error = %e, "ignoring malformed referrer");
            Ok(None)
        }
    }
}

/// The whole query string, re-encoded.
pub fn query_string(ctx: &WebContext) -> String {
    ctx.request().query().to_urlencoded()
}

/// Values of a query parameter in source order. `None` or `""` selects
/// entries written without a name (`?flag`).
pub fn query(ctx: &WebContext, name: Option<&str>) -> Vec<String> {
    owned(ctx.request().query().get_values(name.unwrap_or("")))
}

pub fn query_names(ctx: &WebContext) -> Vec<String> {
    owned(ctx.request().query().names())
}

pub fn form_string(ctx: &WebContext) -> String {
    ctx.request().form().to_urlencoded()
}

pub fn form(ctx: &WebContext, name: &str) -> Vec<String> {
    owned(ctx.request().form().get_values(name))
}

pub fn form_names(ctx: &WebContext) -> Vec<String> {
    owned(ctx.request().form().names())
}

pub fn http_method(ctx: &WebContext) -> String {
    ctx.request().method().as_str().to_string()
}

/// The method a POST asks to be treated as.
///
/// Looks at the `X-HTTP-Method-Override` header, then the form field, then
/// the query parameter of that name; the first non-empty value wins. It
/// replaces the method only for POST requests and never to GET or POST.
pub fn http_method_override(ctx: &WebContext) -> String {
    let request = ctx.request();
    let incoming = request.method().as_str();
    if !incoming.eq_ignore_ascii_case(Method::POST.as_str()) {
        return incoming.to_string();
    }
    let verb_override = [
        request.header(X_HTTP_METHOD_OVERRIDE),
        request.form().get(X_HTTP_METHOD_OVERRIDE),
        request.query().get(X_HTTP_METHOD_OVERRIDE),
    ]
    .into_iter()
    .flatten()
    .find(|v| !v.is_empty());
    match verb_override {
        Some(v) if !v.eq_ignore_ascii_case("GET") && !v.eq_ignore_ascii_case("POST") => v,
        _ => incoming.to_string(),
    }
}

pub fn header(ctx: &WebContext, name: &str) -> Option<String> {
    ctx.request().header(name)
}

pub fn content_type(ctx: &WebContext) -> Option<String> {
    ctx.request().header(http::header::CONTENT_TYPE.as_str())
}

/// `Content-Length`, or 0 when absent or not a number.
pub fn content_length(ctx: &WebContext) -> i64 {
    ctx.request()
        .header(http::header::CONTENT_LENGTH.as_str())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n >= 0)
        .unwrap_or(0)
}

/// Whether the client is this machine: a loopback address or the server's own address.
pub fn is_local(ctx: &WebContext) -> bool {
    let request = ctx.request();
    match request.client_addr() {
        Some(client) => client.is_loopback() || request.local_addr() == Some(client) || is_mapped_loopback(client),
        None => false,
    }
}

fn is_mapped_loopback(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback()),
        IpAddr::V4(_) => false,
    }
}

/// Value of the first cookie named `name`.
pub fn cookie(ctx: &WebContext, name: &str) -> Option<String> {
    ctx.request().cookies().first(name).map(str::to_string)
}

/// [`cookie`], and when `remove` is set also expire the cookie in the response.
pub fn cookie_with_remove(ctx: &WebContext, name: &str, remove: bool) -> Option<String> {
    let value = cookie(ctx, name);
    if remove {
        ctx.response().remove_cookie(name);
    }
    value
}

/// `Accept-Language` entries as sent, quality parameters included.
pub fn user_languages(ctx: &WebContext) -> Vec<String> {
    ctx.request()
        .header(http::header::ACCEPT_LANGUAGE.as_str())
        .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

/// Client address, empty when the host did not provide one.
pub fn user_host_address(ctx: &WebContext) -> String {
    ctx.request().client_addr().map(|a| a.to_string()).unwrap_or_default()
}

/// Client host name, falling back to the address.
pub fn user_host_name(ctx: &WebContext) -> String {
    match ctx.request().client_host() {
        Some(host) => host.to_string(),
        None => user_host_address(ctx),
    }
}

/// Physical location of a virtual path. Relative paths start from the
/// current file's directory; the result must stay inside the application.
pub fn map_path(ctx: &WebContext, virtual_path: &str) -> Result<PathBuf, Error> {
    let request = ctx.request();
    let root = request
        .physical_root()
        .ok_or_else(|| Error::from_code(ErrorCode::FOER0000, "no physical application root is configured"))?;
    let absolute = virtual_path::combine(request.file_path(), virtual_path, request.application_path())?;
    let app = append_trailing_slash(request.application_path());
    let rest = match strip_prefix_ignore_case(&absolute, &app) {
        Some(rest) => rest,
        None if absolute.eq_ignore_ascii_case(app.trim_end_matches('/')) => "",
        None => {
            return Err(Error::from_code(
                ErrorCode::FORG0001,
                format!("'{virtual_path}' is outside the application '{app}'"),
            ));
        }
    };
    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    Ok(rest.split('/').filter(|s| !s.is_empty()).fold(root.to_path_buf(), |path, segment| path.join(segment)))
}

/// `X-Requested-With: XMLHttpRequest` in the query, form, cookies (first
/// collection that has the name) or the request headers.
pub fn is_ajax_request(ctx: &WebContext) -> bool {
    let request = ctx.request();
    let item = request
        .query()
        .get(X_REQUESTED_WITH)
        .or_else(|| request.form().get(X_REQUESTED_WITH))
        .or_else(|| request.cookies().get(X_REQUESTED_WITH));
    item.as_deref() == Some(XML_HTTP_REQUEST) || request.header(X_REQUESTED_WITH).as_deref() == Some(XML_HTTP_REQUEST)
}

fn owned(values: Vec<&str>) -> Vec<String> {
    values.into_iter().map(str::to_string).collect()
}
