use crate::error::InvokeError;
use serde::Deserialize;
use url::Url;

/// Host configuration for [`crate::QueryInvokers`], typically loaded from JSON.
///
/// ```json
/// { "application_root": "file:///srv/app/", "default_processor": "saxon" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvokerSettings {
    /// Directory `~/` paths resolve against. Must be an absolute URL ending in `/`.
    #[serde(default)]
    pub application_root: Option<String>,
    /// Overrides the registry's default processor.
    #[serde(default)]
    pub default_processor: Option<String>,
}

impl InvokerSettings {
    pub fn from_json_str(json: &str) -> Result<Self, InvokeError> {
        serde_json::from_str(json).map_err(|e| InvokeError::Settings(e.to_string()))
    }

    pub fn application_root_url(&self) -> Result<Option<Url>, InvokeError> {
        self.application_root
            .as_deref()
            .map(|root| {
                let url = Url::parse(root).map_err(|e| InvokeError::Settings(format!("application_root: {e}")))?;
                if url.path().ends_with('/') {
                    Ok(url)
                } else {
                    Err(InvokeError::Settings(format!("application_root must end with '/': {root}")))
                }
            })
            .transpose()
    }
}
