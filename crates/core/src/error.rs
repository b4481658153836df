use crate::consts::ERR_NS;
use crate::xdm::ExpandedName;
use core::fmt;
use std::sync::Arc;

/// Error codes emitted by this workspace and the processors behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    FOER0000, // generic error
    FORG0001, // invalid lexical form (e.g. unknown URI component name)
    FODC0002, // error retrieving resource
    FODC0005, // invalid argument to doc / entity retrieval failure
    FONS0005, // base-uri not defined
    XPDY0002, // context item undefined
    XPTY0004, // type error (argument or result does not match its signature)
    XPST0003, // static error (malformed query or signature)
    XPST0017, // unknown function or wrong arity
    XQST0059, // unable to locate a module
    Unknown,
}

impl ErrorCode {
    pub fn local(self) -> &'static str {
        match self {
            ErrorCode::FOER0000 => "FOER0000",
            ErrorCode::FORG0001 => "FORG0001",
            ErrorCode::FODC0002 => "FODC0002",
            ErrorCode::FODC0005 => "FODC0005",
            ErrorCode::FONS0005 => "FONS0005",
            ErrorCode::XPDY0002 => "XPDY0002",
            ErrorCode::XPTY0004 => "XPTY0004",
            ErrorCode::XPST0003 => "XPST0003",
            ErrorCode::XPST0017 => "XPST0017",
            ErrorCode::XQST0059 => "XQST0059",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }

    /// QName of the code in the `xqt-errors` namespace.
    pub fn qname(self) -> ExpandedName {
        ExpandedName::ns(ERR_NS, self.local())
    }

    pub fn from_code(s: &str) -> Self {
        match s.strip_prefix("err:").unwrap_or(s) {
            "FOER0000" => ErrorCode::FOER0000,
            "FORG0001" => ErrorCode::FORG0001,
            "FODC0002" => ErrorCode::FODC0002,
            "FODC0005" => ErrorCode::FODC0005,
            "FONS0005" => ErrorCode::FONS0005,
            "XPDY0002" => ErrorCode::XPDY0002,
            "XPTY0004" => ErrorCode::XPTY0004,
            "XPST0003" => ErrorCode::XPST0003,
            "XPST0017" => ErrorCode::XPST0017,
            "XQST0059" => ErrorCode::XQST0059,
            _ => ErrorCode::Unknown,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub struct Error {
    pub code: ExpandedName,
    pub message: String,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new_qname(code: ExpandedName, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), source: None }
    }

    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self::new_qname(code.qname(), msg)
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Only codes in the `xqt-errors` namespace map to a typed variant.
    pub fn code_enum(&self) -> ErrorCode {
        if self.code.ns_uri.as_deref() == Some(ERR_NS) {
            ErrorCode::from_code(&self.code.local)
        } else {
            ErrorCode::Unknown
        }
    }

    /// `err:LOCAL` for W3C codes, `Q{ns}local` otherwise.
    pub fn format_code(&self) -> String {
        if self.code.ns_uri.as_deref() == Some(ERR_NS) {
            format!("err:{}", self.code.local)
        } else {
            self.code.to_string()
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::from_code(ErrorCode::FODC0005, e.to_string()).with_source(e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::from_code(ErrorCode::FODC0005, format!("invalid URI: {e}")).with_source(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {} ({})", self.message, self.format_code())
    }
}
