use quick_xml::events::Event;
use std::any::Any;
use std::sync::Arc;
use xqweb_core::{Document, DocumentSource, Error, ErrorCode, ItemFactory, NavigableDocument, ParsingOptions};

/// Document holding only its string value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDocument {
    pub text: String,
    pub base_uri: Option<String>,
}

impl NavigableDocument for MockDocument {
    fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }

    fn string_value(&self) -> String {
        self.text.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct MockItemFactory;

impl MockItemFactory {
    fn text_content(mut reader: quick_xml::Reader<&mut dyn std::io::BufRead>) -> Result<String, Error> {
        let mut out = String::new();
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|e| {
                        Error::from_code(ErrorCode::FODC0002, format!("bad XML text: {e}"))
                    })?;
                    out.push_str(&text);
                }
                Ok(Event::CData(e)) => out.push_str(&String::from_utf8_lossy(&e)),
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(Error::from_code(ErrorCode::FODC0002, format!("XML parse error: {e}")));
                }
            }
            buf.clear();
        }
        Ok(out)
    }
}

impl ItemFactory for MockItemFactory {
    fn create_node_read_only(&self, input: DocumentSource<'_>, options: &ParsingOptions) -> Result<Document, Error> {
        let text = match input {
            DocumentSource::Bytes(read) => {
                let mut bytes = Vec::new();
                read.read_to_end(&mut bytes)?;
                String::from_utf8(bytes)
                    .map_err(|e| Error::from_code(ErrorCode::FODC0002, format!("input is not UTF-8: {e}")))?
            }
            DocumentSource::Text(read) => {
                let mut text = String::new();
                read.read_to_string(&mut text)?;
                text
            }
            DocumentSource::Xml(reader) => Self::text_content(reader)?,
        };
        Ok(Arc::new(MockDocument { text, base_uri: options.base_uri.as_ref().map(ToString::to_string) }))
    }

    fn create_document(&self, value: &serde_json::Value) -> Result<Document, Error> {
        let text = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Ok(Arc::new(MockDocument { text, base_uri: None }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, Cursor};

    #[test]
    fn xml_input_keeps_only_text_content() {
        let mut cursor = Cursor::new(b"<a>x &amp; <b>y</b></a>".to_vec());
        let read: &mut dyn BufRead = &mut cursor;
        let doc = MockItemFactory
            .create_node_read_only(DocumentSource::Xml(quick_xml::Reader::from_reader(read)), &ParsingOptions::default())
            .unwrap();
        assert_eq!(doc.string_value(), "x & y");
    }

    #[test]
    fn objects_become_json_text() {
        let doc = MockItemFactory.create_document(&serde_json::json!({"a": 1})).unwrap();
        assert_eq!(doc.string_value(), r#"{"a":1}"#);
    }
}
