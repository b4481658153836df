//! Well-known namespace URIs.

/// Namespace of the W3C-defined XPath/XQuery error codes (xqt-errors).
pub const ERR_NS: &str = "http://www.w3.org/2005/xqt-errors";
pub const XS: &str = "http://www.w3.org/2001/XMLSchema";
pub const XHTML: &str = "http://www.w3.org/1999/xhtml";
pub const XSLT: &str = "http://www.w3.org/1999/XSL/Transform";
/// Schematron validation report language.
pub const SVRL: &str = "http://purl.oclc.org/dsdl/svrl";
