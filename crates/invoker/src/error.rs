use thiserror::Error;

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("argument '{0}' must not be empty")]
    InvalidArgument(&'static str),
    #[error("no processor registered under name '{0}'")]
    UnknownProcessor(String),
    #[error("no default processor configured")]
    NoDefaultProcessor,
    #[error("parameters must serialize to a map of names to values, got {0}")]
    Parameters(String),
    #[error("input cannot be converted to a document: {0}")]
    Input(String),
    #[error("invalid settings: {0}")]
    Settings(String),
    /// Resolution, compile and run failures from the processor, passed through unchanged.
    #[error(transparent)]
    Processor(#[from] xqweb_core::Error),
}

impl InvokeError {
    /// The processor error, when this is one.
    pub fn processor_error(&self) -> Option<&xqweb_core::Error> {
        match self {
            InvokeError::Processor(e) => Some(e),
            _ => None,
        }
    }
}
