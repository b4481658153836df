use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;
use xqweb_core::{EntityLoader, Error, ErrorCode};

/// Entity loader serving documents from memory, counting every open.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    entries: RwLock<HashMap<Url, String>>,
    opens: AtomicUsize,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Panics on an invalid URL; test input only.
    #[must_use]
    pub fn with(self, uri: &str, text: impl Into<String>) -> Self {
        self.insert(Url::parse(uri).expect("valid test URL"), text);
        self
    }

    pub fn insert(&self, uri: Url, text: impl Into<String>) {
        self.entries.write().unwrap().insert(uri, text.into());
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl EntityLoader for MemoryLoader {
    fn open(&self, uri: &Url) -> Result<Box<dyn Read + Send>, Error> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let entries = self.entries.read().unwrap();
        let text = entries
            .get(uri)
            .ok_or_else(|| Error::from_code(ErrorCode::FODC0002, format!("no such entity: {uri}")))?;
        Ok(Box::new(Cursor::new(text.clone().into_bytes())))
    }
}
