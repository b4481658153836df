use crate::error::InvokeError;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use xqweb_core::{Error, ErrorCode, Executable, RuntimeOptions};

/// A compiled query bound to its runtime options, ready to run.
///
/// Running is repeatable; nothing is cached between runs.
#[derive(Clone)]
pub struct ResultHandler {
    executable: Arc<dyn Executable>,
    options: RuntimeOptions,
}

impl ResultHandler {
    pub fn new(executable: Arc<dyn Executable>, options: RuntimeOptions) -> Self {
        Self { executable, options }
    }

    pub fn executable(&self) -> &Arc<dyn Executable> {
        &self.executable
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn run(&self, output: &mut dyn Write) -> Result<(), Error> {
        self.executable.run(&self.options, output)
    }

    pub fn run_to_string(&self) -> Result<String, InvokeError> {
        let mut buf = Vec::new();
        self.run(&mut buf)?;
        String::from_utf8(buf).map_err(|e| {
            Error::from_code(ErrorCode::FOER0000, format!("query output is not UTF-8: {e}")).with_source(e).into()
        })
    }
}

impl fmt::Debug for ResultHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultHandler")
            .field("base_uri", &self.executable.base_uri().map(url::Url::as_str))
            .field("options", &self.options)
            .finish()
    }
}
