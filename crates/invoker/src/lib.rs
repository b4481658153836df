//! Resolve, compile and cache queries addressed by URI, then run them
//! against a context item with parameters bound as external variables.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use url::Url;
//! # use xqweb_core::{CallerOrigin, ProcessorRegistry, QueryProcessor};
//! # use xqweb_invoker::{Parameters, QueryInvokers};
//! # fn demo(processor: Arc<dyn QueryProcessor>) -> Result<(), xqweb_invoker::InvokeError> {
//! let registry = ProcessorRegistry::builder().register("default", processor).build();
//! let invokers = QueryInvokers::builder(registry)
//!     .application_root(Url::parse("file:///srv/app/").unwrap())
//!     .build()?;
//! let origin = CallerOrigin::new("pages", Url::parse("file:///srv/app/pages/").unwrap());
//! let out = invokers
//!     .with(&origin, "~/queries/list.xq")?
//!     .query_value(&serde_json::json!({ "id": 7 }), &Parameters::new().with("page", 1))?
//!     .run_to_string()?;
//! # let _ = out;
//! # Ok(())
//! # }
//! ```

mod cache;
mod error;
mod handler;
mod invoker;
mod page;
mod parameters;
mod settings;

pub use cache::QueryCache;
pub use error::InvokeError;
pub use handler::ResultHandler;
pub use invoker::{ProcessorSelector, QueryInvoker, QueryInvokers, QueryInvokersBuilder};
pub use page::PageHost;
pub use parameters::Parameters;
pub use settings::InvokerSettings;
