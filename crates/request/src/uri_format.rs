//! Selecting and formatting parts of a URL by component name.
//!
//! Component and format names are the ones query scripts pass to
//! `request:url` and `request:referrer-url`: `Host`, `PathAndQuery`,
//! `Scheme, Host`, `UriEscaped` and so on. Parsing is case-insensitive and
//! also accepts the numeric values of the flags.

use bitflags::bitflags;
use percent_encoding::percent_decode_str;
use std::fmt;
use std::str::FromStr;
use url::Url;
use xqweb_core::{Error, ErrorCode};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UriComponents: u32 {
        const SCHEME = 0x1;
        const USER_INFO = 0x2;
        const HOST = 0x4;
        const PORT = 0x8;
        const PATH = 0x10;
        const QUERY = 0x20;
        const FRAGMENT = 0x40;
        const STRONG_PORT = 0x80;
        const NORMALIZED_HOST = 0x100;
        const KEEP_DELIMITER = 0x4000_0000;
        const SERIALIZATION_INFO_STRING = 0x8000_0000;

        const ABSOLUTE_URI = Self::SCHEME.bits() | Self::USER_INFO.bits() | Self::HOST.bits()
            | Self::PORT.bits() | Self::PATH.bits() | Self::QUERY.bits() | Self::FRAGMENT.bits();
        const HOST_AND_PORT = Self::HOST.bits() | Self::STRONG_PORT.bits();
        const STRONG_AUTHORITY = Self::USER_INFO.bits() | Self::HOST.bits() | Self::STRONG_PORT.bits();
        const SCHEME_AND_SERVER = Self::SCHEME.bits() | Self::HOST.bits() | Self::PORT.bits();
        const HTTP_REQUEST_URL = Self::SCHEME.bits() | Self::HOST.bits() | Self::PORT.bits()
            | Self::PATH.bits() | Self::QUERY.bits();
        const PATH_AND_QUERY = Self::PATH.bits() | Self::QUERY.bits();
    }
}

const COMPONENT_NAMES: &[(&str, UriComponents)] = &[
    ("Scheme", UriComponents::SCHEME),
    ("UserInfo", UriComponents::USER_INFO),
    ("Host", UriComponents::HOST),
    ("Port", UriComponents::PORT),
    ("Path", UriComponents::PATH),
    ("Query", UriComponents::QUERY),
    ("Fragment", UriComponents::FRAGMENT),
    ("StrongPort", UriComponents::STRONG_PORT),
    ("NormalizedHost", UriComponents::NORMALIZED_HOST),
    ("KeepDelimiter", UriComponents::KEEP_DELIMITER),
    ("SerializationInfoString", UriComponents::SERIALIZATION_INFO_STRING),
    ("AbsoluteUri", UriComponents::ABSOLUTE_URI),
    ("HostAndPort", UriComponents::HOST_AND_PORT),
    ("StrongAuthority", UriComponents::STRONG_AUTHORITY),
    ("SchemeAndServer", UriComponents::SCHEME_AND_SERVER),
    ("HttpRequestUrl", UriComponents::HTTP_REQUEST_URL),
    ("PathAndQuery", UriComponents::PATH_AND_QUERY),
];

impl FromStr for UriComponents {
    type Err = Error;

    /// Accepts `Host`, `host, port` or a numeric flag word such as `20`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = UriComponents::empty();
        let mut any = false;
        for part in s.split(',').map(str::trim) {
            let flag = match parse_number(part) {
                Some(bits) => UriComponents::from_bits_retain(bits),
                None => COMPONENT_NAMES
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(part))
                    .map(|(_, flag)| *flag)
                    .ok_or_else(|| invalid("URI component", s))?,
            };
            flags |= flag;
            any = true;
        }
        if any { Ok(flags) } else { Err(invalid("URI component", s)) }
    }
}

/// How escaped characters appear in the formatted result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UriFormat {
    #[default]
    UriEscaped,
    Unescaped,
    SafeUnescaped,
}

impl FromStr for UriFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let format = match parse_number(t) {
            Some(1) => Some(UriFormat::UriEscaped),
            Some(2) => Some(UriFormat::Unescaped),
            Some(3) => Some(UriFormat::SafeUnescaped),
            Some(_) => None,
            None if t.eq_ignore_ascii_case("UriEscaped") => Some(UriFormat::UriEscaped),
            None if t.eq_ignore_ascii_case("Unescaped") => Some(UriFormat::Unescaped),
            None if t.eq_ignore_ascii_case("SafeUnescaped") => Some(UriFormat::SafeUnescaped),
            None => None,
        };
        format.ok_or_else(|| invalid("URI format", s))
    }
}

impl fmt::Display for UriFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UriFormat::UriEscaped => "UriEscaped",
            UriFormat::Unescaped => "Unescaped",
            UriFormat::SafeUnescaped => "SafeUnescaped",
        })
    }
}

fn parse_number(s: &str) -> Option<u32> {
    let n: i64 = s.parse().ok()?;
    // Negative values are the two's-complement flag words.
    i32::try_from(n).ok().map(i32::cast_unsigned).or_else(|| u32::try_from(n).ok())
}

fn invalid(what: &str, value: &str) -> Error {
    Error::from_code(ErrorCode::FORG0001, format!("'{value}' is not a valid {what} value"))
}

/// Format `uri` for script output: the full absolute URL when no components
/// are requested, otherwise the selected components in `format`.
pub fn uri_to_string(uri: &Url, components: Option<&str>, format: Option<&str>) -> Result<String, Error> {
    let Some(components) = components else {
        return Ok(uri.as_str().to_string());
    };
    let components: UriComponents = components.parse()?;
    let format = format.map(str::parse).transpose()?.unwrap_or_default();
    Ok(get_components(uri, components, format))
}

/// The requested components of `uri`. Delimiters between components are
/// included when more than one component is selected; a lone component is
/// returned without its delimiter unless `KEEP_DELIMITER` is set.
pub fn get_components(uri: &Url, components: UriComponents, format: UriFormat) -> String {
    if components.contains(UriComponents::SERIALIZATION_INFO_STRING) {
        return apply_format(uri.as_str(), format);
    }
    let keep = components.contains(UriComponents::KEEP_DELIMITER);
    let authority = components.intersects(
        UriComponents::USER_INFO | UriComponents::HOST | UriComponents::PORT | UriComponents::STRONG_PORT,
    );
    let mut out = String::new();

    if components.contains(UriComponents::SCHEME) {
        out.push_str(uri.scheme());
        if authority && uri.has_authority() {
            out.push_str("://");
        } else if keep || components.intersects(UriComponents::PATH | UriComponents::QUERY | UriComponents::FRAGMENT) {
            out.push(':');
        }
    }

    if components.contains(UriComponents::USER_INFO) && !uri.username().is_empty() {
        out.push_str(uri.username());
        if let Some(password) = uri.password() {
            out.push(':');
            out.push_str(password);
        }
        if keep || components.contains(UriComponents::HOST) {
            out.push('@');
        }
    }

    if components.intersects(UriComponents::HOST | UriComponents::NORMALIZED_HOST)
        && let Some(host) = uri.host_str()
    {
        out.push_str(host);
    }

    let port = if components.contains(UriComponents::STRONG_PORT) {
        uri.port_or_known_default()
    } else if components.contains(UriComponents::PORT) {
        uri.port()
    } else {
        None
    };
    if let Some(port) = port {
        if keep || components.contains(UriComponents::HOST) {
            out.push(':');
        }
        out.push_str(&port.to_string());
    }

    if components.contains(UriComponents::PATH) {
        let path = uri.path();
        // A lone `Path` drops its leading slash; `PathAndQuery` keeps it.
        let lone_path = !components.intersects(UriComponents::QUERY | UriComponents::FRAGMENT);
        if out.is_empty() && !keep && lone_path {
            out.push_str(path.strip_prefix('/').unwrap_or(path));
        } else {
            out.push_str(path);
        }
    }

    if components.contains(UriComponents::QUERY)
        && let Some(query) = uri.query()
    {
        if keep || !out.is_empty() {
            out.push('?');
        }
        out.push_str(query);
    }

    if components.contains(UriComponents::FRAGMENT)
        && let Some(fragment) = uri.fragment()
    {
        if keep || !out.is_empty() {
            out.push('#');
        }
        out.push_str(fragment);
    }

    apply_format(&out, format)
}

fn apply_format(s: &str, format: UriFormat) -> String {
    match format {
        UriFormat::UriEscaped => s.to_string(),
        UriFormat::Unescaped => percent_decode_str(s).decode_utf8_lossy().into_owned(),
        UriFormat::SafeUnescaped => safe_unescape(s),
    }
}

// Decode escapes except those whose character would change how the URL is read.
fn safe_unescape(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let Some(b) = s.get(i + 1..i + 3).and_then(|hex| u8::from_str_radix(hex, 16).ok())
            && !matches!(b, b'%' | b'#' | b'?' | b'/' | b'\\' | b'@' | 0x00..=0x1F | 0x7F)
        {
            out.push(b);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("host".parse::<UriComponents>().unwrap(), UriComponents::HOST);
        assert_eq!("PATHANDQUERY".parse::<UriComponents>().unwrap(), UriComponents::PATH_AND_QUERY);
    }

    #[test]
    fn parses_combinations_and_numbers() {
        assert_eq!(
            "Scheme, Host".parse::<UriComponents>().unwrap(),
            UriComponents::SCHEME | UriComponents::HOST
        );
        assert_eq!("48".parse::<UriComponents>().unwrap(), UriComponents::PATH_AND_QUERY);
        assert_eq!("-2147483648".parse::<UriComponents>().unwrap(), UriComponents::SERIALIZATION_INFO_STRING);
        assert_eq!("3".parse::<UriFormat>().unwrap(), UriFormat::SafeUnescaped);
    }

    #[test]
    fn rejects_unknown_names_with_forg0001() {
        for bad in ["", "Hostname", "Host,", "Host|Port"] {
            let err = bad.parse::<UriComponents>().unwrap_err();
            assert_eq!(err.code_enum(), ErrorCode::FORG0001, "{bad:?}");
        }
        assert_eq!("Escaped".parse::<UriFormat>().unwrap_err().code_enum(), ErrorCode::FORG0001);
        assert!("4".parse::<UriFormat>().is_err());
    }

    #[test]
    fn lone_path_drops_its_slash_but_path_and_query_keeps_it() {
        let uri = Url::parse("http://h/a/b?x=1#top").unwrap();
        assert_eq!(get_components(&uri, UriComponents::PATH, UriFormat::UriEscaped), "a/b");
        assert_eq!(
            get_components(&uri, UriComponents::PATH | UriComponents::KEEP_DELIMITER, UriFormat::UriEscaped),
            "/a/b"
        );
        assert_eq!(get_components(&uri, UriComponents::PATH_AND_QUERY, UriFormat::UriEscaped), "/a/b?x=1");
        assert_eq!(
            get_components(&uri, UriComponents::PATH | UriComponents::FRAGMENT, UriFormat::UriEscaped),
            "/a/b#top"
        );
    }

    #[test]
    fn safe_unescape_keeps_reserved_escapes() {
        assert_eq!(safe_unescape("a%20b%2Fc%3Fd%25"), "a b%2Fc%3Fd%25");
        assert_eq!(safe_unescape("trailing%2"), "trailing%2");
    }
}
