use crate::consts::XS;
use crate::error::{Error, ErrorCode};
use crate::xdm::{ExpandedName, XdmAtomicValue, XdmItem};
use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occurrence {
    ExactlyOne,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

impl Occurrence {
    pub fn allows(self, len: usize) -> bool {
        match self {
            Occurrence::ExactlyOne => len == 1,
            Occurrence::ZeroOrOne => len <= 1,
            Occurrence::ZeroOrMore => true,
            Occurrence::OneOrMore => len >= 1,
        }
    }

    fn indicator(self) -> &'static str {
        match self {
            Occurrence::ExactlyOne => "",
            Occurrence::ZeroOrOne => "?",
            Occurrence::ZeroOrMore => "*",
            Occurrence::OneOrMore => "+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Item,
    AnyAtomic,
    String,
    Integer,
    Double,
    Boolean,
    AnyUri,
    Node,
    /// `empty-sequence()`
    Empty,
}

impl ItemType {
    fn lexical(self) -> &'static str {
        match self {
            ItemType::Item => "item()",
            ItemType::AnyAtomic => "xs:anyAtomicType",
            ItemType::String => "xs:string",
            ItemType::Integer => "xs:integer",
            ItemType::Double => "xs:double",
            ItemType::Boolean => "xs:boolean",
            ItemType::AnyUri => "xs:anyURI",
            ItemType::Node => "node()",
            ItemType::Empty => "empty-sequence()",
        }
    }

    /// Schema types are written `xs:local` or as `Q{http://www.w3.org/2001/XMLSchema}local`.
    fn parse(s: &str) -> Option<Self> {
        let schema_local = s.strip_prefix("xs:").or_else(|| {
            s.strip_prefix("Q{")
                .and_then(|rest| rest.split_once('}'))
                .and_then(|(ns, local)| (ns == XS).then_some(local))
        });
        if let Some(local) = schema_local {
            return Some(match local {
                "anyAtomicType" => ItemType::AnyAtomic,
                "string" => ItemType::String,
                "integer" => ItemType::Integer,
                "double" => ItemType::Double,
                "boolean" => ItemType::Boolean,
                "anyURI" => ItemType::AnyUri,
                _ => return None,
            });
        }
        Some(match s {
            "item()" => ItemType::Item,
            "node()" | "document-node()" => ItemType::Node,
            "empty-sequence()" => ItemType::Empty,
            _ => return None,
        })
    }

    /// Expanded name of a schema type; `None` for kind tests such as `item()`.
    pub fn type_name(self) -> Option<ExpandedName> {
        let lexical = self.lexical();
        lexical.strip_prefix("xs:").map(|local| ExpandedName::ns(XS, local))
    }

    /// `xs:untypedAtomic` and `xs:anyURI` promote to `xs:string`; integers promote to `xs:double`.
    pub fn matches(self, item: &XdmItem) -> bool {
        match (self, item) {
            (ItemType::Item, _) | (ItemType::Node, XdmItem::Node(_)) => true,
            (ItemType::Empty | ItemType::Node, _) | (_, XdmItem::Node(_)) => false,
            (ItemType::AnyAtomic, XdmItem::Atomic(_)) => true,
            (ItemType::String, XdmItem::Atomic(a)) => matches!(
                a,
                XdmAtomicValue::String(_) | XdmAtomicValue::UntypedAtomic(_) | XdmAtomicValue::AnyUri(_)
            ),
            (ItemType::Integer, XdmItem::Atomic(a)) => matches!(a, XdmAtomicValue::Integer(_)),
            (ItemType::Double, XdmItem::Atomic(a)) => {
                matches!(a, XdmAtomicValue::Double(_) | XdmAtomicValue::Integer(_))
            }
            (ItemType::Boolean, XdmItem::Atomic(a)) => matches!(a, XdmAtomicValue::Boolean(_)),
            (ItemType::AnyUri, XdmItem::Atomic(a)) => matches!(a, XdmAtomicValue::AnyUri(_)),
        }
    }
}

/// A parsed sequence type such as `xs:string?` or `item()*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SequenceType {
    pub item: ItemType,
    pub occurrence: Occurrence,
}

impl SequenceType {
    pub const fn new(item: ItemType, occurrence: Occurrence) -> Self {
        Self { item, occurrence }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        if s == "empty-sequence()" {
            return Ok(Self::new(ItemType::Empty, Occurrence::ZeroOrOne));
        }
        let (body, occurrence) = match s.as_bytes().last() {
            Some(b'?') => (&s[..s.len() - 1], Occurrence::ZeroOrOne),
            Some(b'*') => (&s[..s.len() - 1], Occurrence::ZeroOrMore),
            Some(b'+') => (&s[..s.len() - 1], Occurrence::OneOrMore),
            _ => (s, Occurrence::ExactlyOne),
        };
        let item = ItemType::parse(body.trim()).ok_or_else(|| {
            Error::from_code(ErrorCode::XPST0003, format!("unsupported sequence type '{s}'"))
        })?;
        Ok(Self::new(item, occurrence))
    }

    pub fn matches(&self, seq: &[XdmItem]) -> bool {
        if self.item == ItemType::Empty {
            return seq.is_empty();
        }
        self.occurrence.allows(seq.len()) && seq.iter().all(|it| self.item.matches(it))
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.item == ItemType::Empty {
            return f.write_str(ItemType::Empty.lexical());
        }
        write!(f, "{}{}", self.item.lexical(), self.occurrence.indicator())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::XS;
    use crate::xdm::{self, ExpandedName};
    use rstest::rstest;

    #[rstest]
    #[case("xs:string", ItemType::String, Occurrence::ExactlyOne)]
    #[case("xs:string?", ItemType::String, Occurrence::ZeroOrOne)]
    #[case("xs:string*", ItemType::String, Occurrence::ZeroOrMore)]
    #[case("item()+", ItemType::Item, Occurrence::OneOrMore)]
    #[case(" xs:boolean ", ItemType::Boolean, Occurrence::ExactlyOne)]
    fn parses_signature_strings(#[case] input: &str, #[case] item: ItemType, #[case] occ: Occurrence) {
        let ty = SequenceType::parse(input).unwrap();
        assert_eq!(ty, SequenceType::new(item, occ));
        assert_eq!(ty.to_string(), input.trim());
    }

    #[test]
    fn schema_types_accept_the_expanded_form() {
        let ty = SequenceType::parse("Q{http://www.w3.org/2001/XMLSchema}string?").unwrap();
        assert_eq!(ty, SequenceType::new(ItemType::String, Occurrence::ZeroOrOne));
        assert_eq!(ItemType::Integer.type_name(), Some(ExpandedName::ns(XS, "integer")));
        assert_eq!(ItemType::Item.type_name(), None);
        assert!(SequenceType::parse("Q{urn:other}string").is_err());
    }

    #[test]
    fn rejects_unknown_types() {
        let err = SequenceType::parse("xs:gYear").unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::XPST0003);
    }

    #[test]
    fn cardinality_is_checked() {
        let ty = SequenceType::parse("xs:string").unwrap();
        assert!(ty.matches(&xdm::string("a")));
        assert!(!ty.matches(&[]));
        assert!(!ty.matches(&xdm::strings(["a", "b"])));
        let opt = SequenceType::parse("xs:string?").unwrap();
        assert!(opt.matches(&[]));
        assert!(!opt.matches(&xdm::integer(1)));
    }
}
