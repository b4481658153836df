use rstest::{fixture, rstest};
use std::sync::Arc;
use url::Url;
use xqweb_core::{CallerOrigin, ErrorCode, ProcessorRegistry, QueryProcessor};
use xqweb_invoker::{InvokeError, InvokerSettings, ProcessorSelector, QueryInvokers};
use xqweb_processor_mock::{MemoryLoader, MockProcessor};

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

fn loader() -> Arc<MemoryLoader> {
    Arc::new(
        MemoryLoader::new()
            .with("file:///app/q.xq", "root q")
            .with("file:///app/pages/q.xq", "pages q")
            .with("file:///elsewhere/abs.xq", "absolute")
            .with("file:///app/bad.xq", "error()"),
    )
}

fn run(invokers: &QueryInvokers, origin: &CallerOrigin, uri: &str) -> Result<String, InvokeError> {
    invokers.with(origin, uri)?.query_options(Default::default()).run_to_string()
}

#[fixture]
fn origin() -> CallerOrigin {
    CallerOrigin::new("pages", url("file:///app/pages/"))
}

#[fixture]
fn invokers() -> QueryInvokers {
    let registry = ProcessorRegistry::builder().register("mock", Arc::new(MockProcessor::new())).build();
    QueryInvokers::builder(registry).application_root(url("file:///app/")).loader(loader()).build().unwrap()
}

#[rstest]
#[case("q.xq", "pages q")]
#[case("../q.xq", "root q")]
#[case("~/q.xq", "root q")]
#[case("~q.xq", "root q")]
#[case("~/pages/q.xq", "pages q")]
#[case("file:///elsewhere/abs.xq", "absolute")]
fn identifiers_resolve_per_origin(invokers: QueryInvokers, origin: CallerOrigin, #[case] uri: &str, #[case] expected: &str) {
    assert_eq!(run(&invokers, &origin, uri).unwrap(), expected);
}

#[rstest]
#[case("")]
#[case("   ")]
#[case("\t\n")]
fn blank_identifiers_are_rejected(invokers: QueryInvokers, origin: CallerOrigin, #[case] uri: &str) {
    assert!(matches!(invokers.with(&origin, uri), Err(InvokeError::InvalidArgument("query_uri"))));
    assert!(invokers.cache().is_empty());
}

#[rstest]
fn missing_sources_report_fodc0002(invokers: QueryInvokers, origin: CallerOrigin) {
    let err = invokers.with(&origin, "nope.xq").unwrap_err();
    assert_eq!(err.processor_error().unwrap().code_enum(), ErrorCode::FODC0002);
}

#[rstest]
fn compile_errors_pass_through(invokers: QueryInvokers, origin: CallerOrigin) {
    let err = invokers.with(&origin, "~/bad.xq").unwrap_err();
    assert_eq!(err.processor_error().unwrap().code_enum(), ErrorCode::XPST0003);
    assert!(err.to_string().contains("file:///app/bad.xq"));
}

#[rstest]
fn unknown_processor_names_fail(invokers: QueryInvokers, origin: CallerOrigin) {
    match invokers.with_named(&origin, "q.xq", "saxon") {
        Err(InvokeError::UnknownProcessor(name)) => assert_eq!(name, "saxon"),
        other => panic!("expected UnknownProcessor, got {other:?}"),
    }
}

#[rstest]
fn invoker_resolver_keeps_the_callers_origin(invokers: QueryInvokers, origin: CallerOrigin) {
    let invoker = invokers.with(&origin, "q.xq").unwrap();
    assert_eq!(invoker.executable().base_uri().unwrap().as_str(), "file:///app/pages/q.xq");
    let next = invoker.resolver().resolve_uri(None, "other.xml").unwrap();
    assert_eq!(next.as_str(), "file:///app/pages/other.xml");
}

#[rstest]
fn explicit_processor_instances_bypass_the_registry(invokers: QueryInvokers, origin: CallerOrigin) {
    let custom = Arc::new(MockProcessor::new());
    let invoker = invokers.with_processor(&origin, "q.xq", custom.clone()).unwrap();
    assert_eq!(custom.compiles(), 1);
    let again = invokers.with_selector(&origin, "q.xq", ProcessorSelector::Instance(custom.clone())).unwrap();
    assert!(Arc::ptr_eq(invoker.executable(), again.executable()));
    assert_eq!(custom.compiles(), 1);
}

#[rstest]
fn empty_registry_has_no_default(origin: CallerOrigin) {
    let invokers = QueryInvokers::builder(ProcessorRegistry::builder().build())
        .application_root(url("file:///app/"))
        .loader(loader())
        .build()
        .unwrap();
    assert!(matches!(invokers.with(&origin, "q.xq"), Err(InvokeError::NoDefaultProcessor)));
}

#[rstest]
fn settings_choose_root_and_default_processor(origin: CallerOrigin) {
    let first = Arc::new(MockProcessor::new());
    let second = Arc::new(MockProcessor::new());
    let registry = ProcessorRegistry::builder()
        .register("first", first.clone() as Arc<dyn QueryProcessor>)
        .register("second", second.clone() as Arc<dyn QueryProcessor>)
        .build();
    let settings =
        InvokerSettings::from_json_str(r#"{ "application_root": "file:///app/pages/", "default_processor": "second" }"#)
            .unwrap();
    let invokers = QueryInvokers::builder(registry).loader(loader()).settings(&settings).unwrap().build().unwrap();

    assert_eq!(run(&invokers, &origin, "~/q.xq").unwrap(), "pages q");
    assert_eq!((first.compiles(), second.compiles()), (0, 1));
}

#[rstest]
fn settings_naming_a_missing_processor_fail_on_use(origin: CallerOrigin) {
    let registry = ProcessorRegistry::builder().register("mock", Arc::new(MockProcessor::new())).build();
    let settings = InvokerSettings { application_root: None, default_processor: Some("gone".into()) };
    let invokers = QueryInvokers::builder(registry)
        .application_root(url("file:///app/"))
        .loader(loader())
        .settings(&settings)
        .unwrap()
        .build()
        .unwrap();
    assert!(matches!(invokers.with(&origin, "q.xq"), Err(InvokeError::UnknownProcessor(n)) if n == "gone"));
}
