//! Request and response state handed to the accessor functions.

use crate::collection::NameValueCollection;
use crate::response::ResponseContext;
use http::header::{CONTENT_TYPE, COOKIE, HOST, HeaderMap};
use http::request::Parts;
use http::{Method, Uri};
use percent_encoding::percent_decode_str;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use url::Url;
use xqweb_core::{Error, ErrorCode};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Everything the accessor functions know about the incoming request.
///
/// Built once per request from [`http::request::Parts`] plus the facts only
/// the host knows (application path, client address, physical root).
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    url: Url,
    headers: HeaderMap,
    path: String,
    application_path: String,
    path_info: String,
    client_addr: Option<IpAddr>,
    client_host: Option<String>,
    local_addr: Option<IpAddr>,
    physical_root: Option<PathBuf>,
    query: NameValueCollection,
    form: NameValueCollection,
    cookies: NameValueCollection,
}

impl RequestContext {
    pub fn builder(parts: Parts) -> RequestContextBuilder {
        RequestContextBuilder {
            parts,
            scheme: None,
            application_path: "/".to_string(),
            path_info: String::new(),
            client_addr: None,
            client_host: None,
            local_addr: None,
            physical_root: None,
            form_body: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute request URL, escaped.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// All values of a header joined with `,`.
    pub fn header(&self, name: &str) -> Option<String> {
        let values: Vec<String> = self
            .headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect();
        (!values.is_empty()).then(|| values.join(","))
    }

    /// Unescaped request path, including path info.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn file_path(&self) -> &str {
        &self.path[..self.path.len() - self.path_info.len()]
    }

    pub fn path_info(&self) -> &str {
        &self.path_info
    }

    pub fn application_path(&self) -> &str {
        &self.application_path
    }

    pub fn client_addr(&self) -> Option<IpAddr> {
        self.client_addr
    }

    pub fn client_host(&self) -> Option<&str> {
        self.client_host.as_deref()
    }

    pub fn local_addr(&self) -> Option<IpAddr> {
        self.local_addr
    }

    pub fn physical_root(&self) -> Option<&Path> {
        self.physical_root.as_deref()
    }

    pub fn query(&self) -> &NameValueCollection {
        &self.query
    }

    pub fn form(&self) -> &NameValueCollection {
        &self.form
    }

    pub fn cookies(&self) -> &NameValueCollection {
        &self.cookies
    }
}

pub struct RequestContextBuilder {
    parts: Parts,
    scheme: Option<String>,
    application_path: String,
    path_info: String,
    client_addr: Option<IpAddr>,
    client_host: Option<String>,
    local_addr: Option<IpAddr>,
    physical_root: Option<PathBuf>,
    form_body: Option<String>,
}

impl RequestContextBuilder {
    /// Scheme of the public URL when the request line does not carry one. Defaults to `http`.
    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Virtual root of the application (`/shop`). Defaults to `/`.
    #[must_use]
    pub fn application_path(mut self, path: impl Into<String>) -> Self {
        self.application_path = path.into();
        self
    }

    /// Trailing part of the path that follows the handling resource (`/view.xq/42` -> `/42`).
    #[must_use]
    pub fn path_info(mut self, path_info: impl Into<String>) -> Self {
        self.path_info = path_info.into();
        self
    }

    #[must_use]
    pub fn client_addr(mut self, addr: IpAddr) -> Self {
        self.client_addr = Some(addr);
        self
    }

    #[must_use]
    pub fn client_host(mut self, host: impl Into<String>) -> Self {
        self.client_host = Some(host.into());
        self
    }

    #[must_use]
    pub fn local_addr(mut self, addr: IpAddr) -> Self {
        self.local_addr = Some(addr);
        self
    }

    /// Directory the application path maps to on disk.
    #[must_use]
    pub fn physical_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.physical_root = Some(root.into());
        self
    }

    /// Request body; read as form data when the content type is urlencoded.
    #[must_use]
    pub fn form_body(mut self, body: impl Into<String>) -> Self {
        self.form_body = Some(body.into());
        self
    }

    pub fn build(self) -> Result<RequestContext, Error> {
        let Parts { method, uri, headers, .. } = self.parts;
        let url = absolute_url(&uri, &headers, self.scheme.as_deref(), self.local_addr)?;
        let path = percent_decode_str(url.path()).decode_utf8_lossy().into_owned();
        if !path.ends_with(&self.path_info) {
            return Err(Error::from_code(
                ErrorCode::FORG0001,
                format!("path info '{}' is not a suffix of '{path}'", self.path_info),
            ));
        }
        let query = url.query().map(NameValueCollection::parse_urlencoded).unwrap_or_default();
        let form = parse_form(&headers, self.form_body.as_deref());
        let cookies = NameValueCollection::parse_cookies(headers.get_all(COOKIE).iter().filter_map(|v| v.to_str().ok()));
        Ok(RequestContext {
            method,
            url,
            headers,
            path,
            application_path: self.application_path,
            path_info: self.path_info,
            client_addr: self.client_addr,
            client_host: self.client_host,
            local_addr: self.local_addr,
            physical_root: self.physical_root,
            query,
            form,
            cookies,
        })
    }
}

fn absolute_url(uri: &Uri, headers: &HeaderMap, scheme: Option<&str>, local: Option<IpAddr>) -> Result<Url, Error> {
    let scheme = uri.scheme_str().or(scheme).unwrap_or("http");
    let authority = match uri.authority() {
        Some(a) => a.as_str().to_string(),
        None => match headers.get(HOST).and_then(|h| h.to_str().ok()) {
            Some(host) => host.to_string(),
            None => match local {
                Some(IpAddr::V6(v6)) => format!("[{v6}]"),
                Some(ip) => ip.to_string(),
                None => "localhost".to_string(),
            },
        },
    };
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let raw = format!("{scheme}://{authority}{path_and_query}");
    Url::parse(&raw).map_err(|e| {
        Error::from_code(ErrorCode::FORG0001, format!("cannot form a request URL from '{raw}'")).with_source(e)
    })
}

fn parse_form(headers: &HeaderMap, body: Option<&str>) -> NameValueCollection {
    let Some(body) = body else {
        return NameValueCollection::new();
    };
    let urlencoded = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_URLENCODED));
    if urlencoded {
        NameValueCollection::parse_urlencoded(body)
    } else {
        tracing::debug!("request body is not urlencoded form data; form is empty");
        NameValueCollection::new()
    }
}

/// The context passed to every request function: the request being served
/// and the response being built.
#[derive(Debug)]
pub struct WebContext {
    request: RequestContext,
    response: ResponseContext,
}

impl WebContext {
    pub fn new(request: RequestContext) -> Self {
        Self { request, response: ResponseContext::new() }
    }

    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    pub fn response(&self) -> &ResponseContext {
        &self.response
    }

    pub fn into_parts(self) -> (RequestContext, ResponseContext) {
        (self.request, self.response)
    }
}
