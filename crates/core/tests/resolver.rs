use rstest::{fixture, rstest};
use std::io::Read;
use std::sync::Arc;
use url::Url;
use xqweb_core::{
    CallerOrigin, ErrorCode, FileLoader, ModuleResolver, ModuleResolverFactory, Resolver, ResolverFactory,
};

#[fixture]
fn app_root() -> Url {
    Url::parse("file:///srv/app/").unwrap()
}

fn origin(base: &str) -> CallerOrigin {
    CallerOrigin::new("test", Url::parse(base).unwrap())
}

#[rstest]
fn relative_identifiers_resolve_against_the_caller(app_root: Url) {
    let factory = ModuleResolverFactory::files(app_root);
    let billing = factory.for_origin(&origin("file:///srv/app/modules/billing/"));
    let shop = factory.for_origin(&origin("file:///srv/app/modules/shop/"));

    let a = billing.resolve_uri(None, "report.xq").unwrap();
    let b = shop.resolve_uri(None, "report.xq").unwrap();

    assert_eq!(a.as_str(), "file:///srv/app/modules/billing/report.xq");
    assert_eq!(b.as_str(), "file:///srv/app/modules/shop/report.xq");
    assert_ne!(a, b);
}

#[rstest]
#[case("~/queries/index.xq", "file:///srv/app/queries/index.xq")]
#[case("~queries/index.xq", "file:///srv/app/queries/index.xq")]
#[case("~", "file:///srv/app/")]
fn app_root_marker_resolves_against_application_root(app_root: Url, #[case] input: &str, #[case] expected: &str) {
    let resolver = ModuleResolver::new(origin("file:///srv/app/modules/x/"), app_root, Arc::new(FileLoader));
    assert_eq!(resolver.resolve_uri(None, input).unwrap().as_str(), expected);
}

#[rstest]
#[case(None, "/q.xq", "file:///srv/app/q.xq")]
#[case(None, "/queries/list.xq", "file:///srv/app/queries/list.xq")]
#[case(Some("file:///srv/lib/"), "/q.xq", "file:///srv/app/q.xq")]
fn site_absolute_paths_are_rooted_at_the_application(
    app_root: Url,
    #[case] base: Option<&str>,
    #[case] input: &str,
    #[case] expected: &str,
) {
    let resolver = ModuleResolver::new(origin("file:///srv/app/pages/"), app_root, Arc::new(FileLoader));
    let base = base.map(|b| Url::parse(b).unwrap());
    assert_eq!(resolver.resolve_uri(base.as_ref(), input).unwrap().as_str(), expected);
}

#[rstest]
fn absolute_identifiers_are_kept(app_root: Url) {
    let resolver = ModuleResolver::new(origin("file:///srv/app/"), app_root, Arc::new(FileLoader));
    let uri = resolver.resolve_uri(None, "http://example.org/q.xq").unwrap();
    assert_eq!(uri.as_str(), "http://example.org/q.xq");
}

#[rstest]
fn explicit_base_wins_over_origin(app_root: Url) {
    let resolver = ModuleResolver::new(origin("file:///srv/app/a/"), app_root, Arc::new(FileLoader));
    let base = Url::parse("file:///srv/lib/").unwrap();
    let uri = resolver.resolve_uri(Some(&base), "util.xq").unwrap();
    assert_eq!(uri.as_str(), "file:///srv/lib/util.xq");
}

#[rstest]
fn file_loader_reads_files_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("hello.xq"), "<hello/>").unwrap();
    let origin = CallerOrigin::from_directory("disk", dir.path()).unwrap();
    let factory = ModuleResolverFactory::files(origin.base().clone());
    let resolver = factory.for_origin(&origin);

    let uri = resolver.resolve_uri(None, "hello.xq").unwrap();
    let mut text = String::new();
    resolver.get_entity(&uri).unwrap().read_to_string(&mut text).unwrap();
    assert_eq!(text, "<hello/>");
}

#[rstest]
fn missing_files_report_retrieval_errors() {
    let dir = tempfile::tempdir().unwrap();
    let origin = CallerOrigin::from_directory("disk", dir.path()).unwrap();
    let resolver = ModuleResolverFactory::files(origin.base().clone()).for_origin(&origin);
    let uri = resolver.resolve_uri(None, "missing.xq").unwrap();
    let err = resolver.get_entity(&uri).err().expect("missing file must fail");
    assert_eq!(err.code_enum(), ErrorCode::FODC0002);
}

#[rstest]
fn file_loader_rejects_other_schemes(app_root: Url) {
    let resolver = ModuleResolver::new(origin("file:///srv/app/"), app_root, Arc::new(FileLoader));
    let uri = Url::parse("http://example.org/q.xq").unwrap();
    let err = resolver.get_entity(&uri).err().expect("http must be rejected");
    assert_eq!(err.code_enum(), ErrorCode::FODC0002);
}
