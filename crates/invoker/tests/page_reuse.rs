use rstest::{fixture, rstest};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;
use xqweb_core::{
    CallerOrigin, CompileOptions, Executable, ModuleResolverFactory, ProcessorRegistry, QueryProcessor, ResolverFactory,
};
use xqweb_invoker::{PageHost, QueryInvokers};
use xqweb_processor_mock::{AlternateProcessor, MemoryLoader, MockProcessor};

struct Pages(HashMap<String, Arc<dyn Executable>>);

impl PageHost for Pages {
    fn compiled_page(&self, virtual_path: &str) -> Option<Arc<dyn Executable>> {
        self.0.get(virtual_path).cloned()
    }
}

struct Env {
    processor: Arc<MockProcessor>,
    loader: Arc<MemoryLoader>,
    invokers: QueryInvokers,
    origin: CallerOrigin,
}

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

fn precompiled(processor: &dyn QueryProcessor, template: &str) -> Arc<dyn Executable> {
    let base = url("file:///app/page.xq");
    let resolver = ModuleResolverFactory::files(url("file:///app/")).for_origin(&CallerOrigin::new("host", base.clone()));
    processor.compile(&mut template.as_bytes(), &CompileOptions { base_uri: base, resolver }).unwrap()
}

#[fixture]
fn env() -> Env {
    let page = precompiled(&MockProcessor::new(), "precompiled");
    let pages = Pages(HashMap::from([("~/page.xq".to_string(), page)]));
    let processor = Arc::new(MockProcessor::new());
    let loader = Arc::new(MemoryLoader::new().with("file:///app/page.xq", "from source"));
    let registry = ProcessorRegistry::builder().register("mock", processor.clone() as Arc<dyn QueryProcessor>).build();
    let invokers = QueryInvokers::builder(registry)
        .application_root(url("file:///app/"))
        .loader(loader.clone())
        .page_host(Arc::new(pages))
        .build()
        .unwrap();
    Env { processor, loader, invokers, origin: CallerOrigin::new("pages", url("file:///app/pages/")) }
}

fn output(invokers: &QueryInvokers, origin: &CallerOrigin, uri: &str, processor: Option<Arc<dyn QueryProcessor>>) -> String {
    let invoker = match processor {
        Some(p) => invokers.with_processor(origin, uri, p),
        None => invokers.with(origin, uri),
    };
    invoker.unwrap().query_options(Default::default()).run_to_string().unwrap()
}

#[rstest]
fn matching_processor_type_reuses_the_page(env: Env) {
    assert_eq!(output(&env.invokers, &env.origin, "~/page.xq", None), "precompiled");
    assert_eq!(env.processor.compiles(), 0);
    assert_eq!(env.loader.opens(), 0);
    // cached under the processor like any compiled query
    assert_eq!(env.invokers.cache().len(), 1);
}

#[rstest]
fn other_processor_types_compile_from_source(env: Env) {
    let alternate = Arc::new(AlternateProcessor::new());
    let out = output(&env.invokers, &env.origin, "~/page.xq", Some(alternate.clone() as Arc<dyn QueryProcessor>));
    assert_eq!(out, "from source");
    assert_eq!(alternate.compiles(), 1);
    assert_eq!(env.loader.opens(), 1);
}

#[rstest]
#[case("/page.xq")]
#[case("file:///app/page.xq")]
fn pages_are_only_consulted_for_app_relative_paths(env: Env, #[case] uri: &str) {
    assert_eq!(output(&env.invokers, &env.origin, uri, None), "from source");
    assert_eq!(env.processor.compiles(), 1);
}

#[rstest]
fn unknown_pages_fall_back_to_the_loader(env: Env) {
    env.loader.insert(url("file:///app/other.xq"), "other");
    assert_eq!(output(&env.invokers, &env.origin, "~/other.xq", None), "other");
    assert_eq!(env.processor.compiles(), 1);
}
