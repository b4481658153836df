use rstest::{fixture, rstest};
use std::sync::{Arc, Barrier};
use std::time::Duration;
use url::Url;
use xqweb_core::{CallerOrigin, ErrorCode, ProcessorRegistry, QueryProcessor};
use xqweb_invoker::{InvokeError, QueryInvokers};
use xqweb_processor_mock::{MemoryLoader, MockProcessor};

const THREADS: usize = 8;

struct Env {
    processor: Arc<MockProcessor>,
    loader: Arc<MemoryLoader>,
    invokers: QueryInvokers,
    origin: CallerOrigin,
}

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

#[fixture]
fn env() -> Env {
    let processor = Arc::new(MockProcessor::new().with_compile_delay(Duration::from_millis(40)));
    let loader = Arc::new(
        MemoryLoader::new()
            .with("file:///app/q.xq", "hello {$who}")
            .with("file:///app/broken.xq", "error()")
            .with("file:///app/pages/list.xq", "pages list")
            .with("file:///app/admin/list.xq", "admin list"),
    );
    let registry = ProcessorRegistry::builder().register("mock", processor.clone() as Arc<dyn QueryProcessor>).build();
    let invokers = QueryInvokers::builder(registry)
        .application_root(url("file:///app/"))
        .loader(loader.clone())
        .build()
        .unwrap();
    Env { processor, loader, invokers, origin: CallerOrigin::new("pages", url("file:///app/pages/")) }
}

#[rstest]
fn concurrent_first_requests_compile_once(env: Env) {
    let barrier = Barrier::new(THREADS);
    let execs: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    env.invokers.with(&env.origin, "~/q.xq").unwrap().executable().clone()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(execs.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(env.processor.compiles(), 1);
    assert_eq!(env.loader.opens(), 1);
    assert_eq!(env.invokers.cache().len(), 1);
}

#[rstest]
fn later_requests_hit_the_cache(env: Env) {
    let first = env.invokers.with(&env.origin, "~/q.xq").unwrap();
    let again = env.invokers.with(&env.origin, "/q.xq").unwrap();
    assert!(Arc::ptr_eq(first.executable(), again.executable()));
    assert_eq!(env.processor.compiles(), 1);
}

#[rstest]
fn failed_compiles_are_not_cached(env: Env) {
    for attempt in 1..=2 {
        let err = env.invokers.with(&env.origin, "~/broken.xq").unwrap_err();
        let code = err.processor_error().map(xqweb_core::Error::code_enum);
        assert_eq!(code, Some(ErrorCode::XPST0003));
        assert_eq!(env.processor.compiles(), attempt);
    }
    assert!(env.invokers.cache().is_empty());
}

#[rstest]
fn same_relative_name_differs_per_origin(env: Env) {
    let admin = CallerOrigin::new("admin", url("file:///app/admin/"));
    let pages = env.invokers.with(&env.origin, "list.xq").unwrap();
    let other = env.invokers.with(&admin, "list.xq").unwrap();
    assert!(!Arc::ptr_eq(pages.executable(), other.executable()));
    assert_eq!(pages.query_options(Default::default()).run_to_string().unwrap(), "pages list");
    assert_eq!(other.query_options(Default::default()).run_to_string().unwrap(), "admin list");
}

#[test]
fn entries_are_kept_per_processor_instance() {
    let a = Arc::new(MockProcessor::new());
    let b = Arc::new(MockProcessor::new());
    let registry = ProcessorRegistry::builder()
        .register("a", a.clone() as Arc<dyn QueryProcessor>)
        .register("b", b.clone() as Arc<dyn QueryProcessor>)
        .build();
    let loader = Arc::new(MemoryLoader::new().with("file:///app/q.xq", "q"));
    let invokers =
        QueryInvokers::builder(registry).application_root(url("file:///app/")).loader(loader).build().unwrap();
    let origin = CallerOrigin::new("t", url("file:///app/"));

    let from_a = invokers.with_named(&origin, "q.xq", "a").unwrap();
    let from_b = invokers.with_named(&origin, "q.xq", "b").unwrap();
    let default = invokers.with(&origin, "q.xq").unwrap();

    assert!(!Arc::ptr_eq(from_a.executable(), from_b.executable()));
    assert!(Arc::ptr_eq(from_a.executable(), default.executable()));
    assert_eq!((a.compiles(), b.compiles()), (1, 1));
    assert_eq!(invokers.cache().len(), 2);
}

#[test]
fn clones_share_one_cache() {
    let processor = Arc::new(MockProcessor::new());
    let registry = ProcessorRegistry::builder().register("mock", processor.clone() as Arc<dyn QueryProcessor>).build();
    let loader = Arc::new(MemoryLoader::new().with("file:///app/q.xq", "q"));
    let invokers =
        QueryInvokers::builder(registry).application_root(url("file:///app/")).loader(loader).build().unwrap();
    let clone = invokers.clone();
    let origin = CallerOrigin::new("t", url("file:///app/"));

    invokers.with(&origin, "q.xq").unwrap();
    clone.with(&origin, "q.xq").unwrap();
    assert_eq!(processor.compiles(), 1);
    assert!(matches!(clone.with(&origin, " "), Err(InvokeError::InvalidArgument("query_uri"))));
}
