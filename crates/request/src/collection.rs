//! Ordered name/value collections for query strings, urlencoded forms and cookies.

use itertools::Itertools;
use percent_encoding::percent_decode_str;
use url::form_urlencoded;

/// Name/value pairs in source order. Names compare ASCII case-insensitively;
/// an entry without `=` is stored under the empty name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameValueCollection {
    entries: Vec<(String, String)>,
}

impl NameValueCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `a=1&b=2&flag`, with or without a leading `?`.
    pub fn parse_urlencoded(input: &str) -> Self {
        let input = input.strip_prefix('?').unwrap_or(input);
        let entries = input
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once('=') {
                Some((name, value)) => (decode(name), decode(value)),
                None => (String::new(), decode(part)),
            })
            .collect();
        Self { entries }
    }

    /// Parse one or more `Cookie` header values (`a=1; b=2`). Values are kept verbatim.
    pub fn parse_cookies<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let entries = headers
            .into_iter()
            .flat_map(|header| header.split(';'))
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once('=') {
                Some((name, value)) => (name.trim().to_string(), value.trim().to_string()),
                None => (String::new(), part.to_string()),
            })
            .collect();
        Self { entries }
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Every value bound to `name`, in source order.
    pub fn get_values(&self, name: &str) -> Vec<&str> {
        self.entries.iter().filter(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str()).collect()
    }

    /// Values for `name` joined with `,`, or `None` when the name is absent.
    pub fn get(&self, name: &str) -> Option<String> {
        let values = self.get_values(name);
        (!values.is_empty()).then(|| values.join(","))
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    /// Distinct names in order of first occurrence, spelled as first seen.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).unique_by(|n| n.to_ascii_lowercase()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Re-encode as `application/x-www-form-urlencoded`, values grouped under
    /// their name in order of first occurrence.
    pub fn to_urlencoded(&self) -> String {
        self.names()
            .into_iter()
            .flat_map(|name| self.entries.iter().filter(move |(n, _)| n.eq_ignore_ascii_case(name)))
            .map(|(name, value)| {
                if name.is_empty() { encode(value) } else { format!("{}={}", encode(name), encode(value)) }
            })
            .join("&")
    }
}

fn decode(s: &str) -> String {
    let plus_as_space = s.replace('+', " ");
    percent_decode_str(&plus_as_space).decode_utf8_lossy().into_owned()
}

fn encode(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
