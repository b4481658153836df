use crate::document::MockItemFactory;
use std::any::TypeId;
use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;
use xqweb_core::{
    CompileOptions, Error, ErrorCode, Executable, ExpandedName, ItemFactory, QueryProcessor, RuntimeOptions,
};

pub struct MockProcessor {
    compiles: AtomicUsize,
    compile_delay: Option<Duration>,
    factory: Arc<MockItemFactory>,
}

impl Default for MockProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProcessor {
    pub fn new() -> Self {
        Self { compiles: AtomicUsize::new(0), compile_delay: None, factory: Arc::new(MockItemFactory) }
    }

    /// Sleep inside every compile, widening the window for concurrent first requests.
    #[must_use]
    pub fn with_compile_delay(mut self, delay: Duration) -> Self {
        self.compile_delay = Some(delay);
        self
    }

    /// Number of compile calls so far, including failed ones.
    pub fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    fn compile_as(
        &self,
        source: &mut dyn Read,
        options: &CompileOptions,
        processor_type: TypeId,
    ) -> Result<Arc<dyn Executable>, Error> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.compile_delay {
            std::thread::sleep(delay);
        }
        let mut text = String::new();
        source.read_to_string(&mut text)?;
        if text.contains("error(") {
            return Err(Error::from_code(ErrorCode::XPST0003, format!("syntax error in {}", options.base_uri)));
        }
        Ok(Arc::new(MockExecutable {
            template: text,
            base_uri: options.base_uri.clone(),
            processor_type,
            factory: Arc::clone(&self.factory),
        }))
    }
}

impl QueryProcessor for MockProcessor {
    fn compile(&self, source: &mut dyn Read, options: &CompileOptions) -> Result<Arc<dyn Executable>, Error> {
        self.compile_as(source, options, TypeId::of::<Self>())
    }

    fn item_factory(&self) -> Arc<dyn ItemFactory> {
        self.factory.clone()
    }
}

/// Same behaviour as [`MockProcessor`] under a different processor type.
#[derive(Default)]
pub struct AlternateProcessor {
    inner: MockProcessor,
}

impl AlternateProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compiles(&self) -> usize {
        self.inner.compiles()
    }
}

impl QueryProcessor for AlternateProcessor {
    fn compile(&self, source: &mut dyn Read, options: &CompileOptions) -> Result<Arc<dyn Executable>, Error> {
        self.inner.compile_as(source, options, TypeId::of::<Self>())
    }

    fn item_factory(&self) -> Arc<dyn ItemFactory> {
        self.inner.item_factory()
    }
}

pub struct MockExecutable {
    template: String,
    base_uri: Url,
    processor_type: TypeId,
    factory: Arc<MockItemFactory>,
}

impl MockExecutable {
    pub fn template(&self) -> &str {
        &self.template
    }

    fn expand(&self, options: &RuntimeOptions) -> Result<String, Error> {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let Some(len) = rest[start..].find('}') else {
                out.push_str(&rest[start..]);
                return Ok(out);
            };
            let token = &rest[start + 1..start + len];
            if token == "." {
                let item = options.context_item.as_ref().ok_or_else(|| {
                    Error::from_code(ErrorCode::XPDY0002, "context item is undefined")
                })?;
                out.push_str(&item.string_value());
            } else if let Some(var) = token.strip_prefix('$') {
                let value = options.external_variables.get(&ExpandedName::local(var)).ok_or_else(|| {
                    Error::from_code(ErrorCode::XPDY0002, format!("external variable ${var} is not bound"))
                })?;
                let parts: Vec<String> = value.iter().map(xqweb_core::XdmItem::string_value).collect();
                out.push_str(&parts.join(" "));
            } else {
                out.push_str(&rest[start..=start + len]);
            }
            rest = &rest[start + len + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

impl Executable for MockExecutable {
    fn base_uri(&self) -> Option<&Url> {
        Some(&self.base_uri)
    }

    fn processor_type(&self) -> TypeId {
        self.processor_type
    }

    fn item_factory(&self) -> Arc<dyn ItemFactory> {
        self.factory.clone()
    }

    fn run(&self, options: &RuntimeOptions, output: &mut dyn Write) -> Result<(), Error> {
        let text = self.expand(options)?;
        output.write_all(text.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use xqweb_core::xdm;
    use xqweb_core::{CallerOrigin, ModuleResolverFactory, ResolverFactory};

    fn options() -> CompileOptions {
        let base = Url::parse("file:///q/test.xq").unwrap();
        let factory = ModuleResolverFactory::files(Url::parse("file:///q/").unwrap());
        CompileOptions { base_uri: base.clone(), resolver: factory.for_origin(&CallerOrigin::new("t", base)) }
    }

    fn run(template: &str, runtime: &RuntimeOptions) -> Result<String, Error> {
        let exec = MockProcessor::new().compile(&mut template.as_bytes(), &options())?;
        let mut out = Vec::new();
        exec.run(runtime, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case("<p>{$who}</p>", "<p>ada</p>")]
    #[case("{.}/{$who}", "ctx/ada")]
    #[case("{unknown} {", "{unknown} {")]
    fn expands_templates(#[case] template: &str, #[case] expected: &str) {
        let runtime = RuntimeOptions::default()
            .with_context_item(xdm::string("ctx").remove(0))
            .with_variable(ExpandedName::local("who"), xdm::string("ada"));
        assert_eq!(run(template, &runtime).unwrap(), expected);
    }

    #[test]
    fn unbound_variables_fail_at_run_time() {
        let err = run("{$missing}", &RuntimeOptions::default()).unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::XPDY0002);
    }

    #[test]
    fn error_calls_fail_to_compile() {
        let processor = MockProcessor::new();
        let err = processor.compile(&mut "error()".as_bytes(), &options()).err().unwrap();
        assert_eq!(err.code_enum(), ErrorCode::XPST0003);
        assert_eq!(processor.compiles(), 1);
    }

    #[test]
    fn alternate_processor_reports_its_own_type() {
        let exec = AlternateProcessor::new().compile(&mut "x".as_bytes(), &options()).unwrap();
        assert_eq!(exec.processor_type(), TypeId::of::<AlternateProcessor>());
        assert_ne!(exec.processor_type(), TypeId::of::<MockProcessor>());
    }
}
