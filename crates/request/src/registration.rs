use crate::context::WebContext;
use crate::module;
use xqweb_core::xdm::{self, XdmItem, XdmSequence};
use xqweb_core::{Error, FunctionLibrary};

pub const NAMESPACE: &str = "http://myxsl.net/ns/web/request";
pub const PREFIX: &str = "request";

fn arg(args: &[XdmSequence], i: usize) -> Option<String> {
    args.get(i)?.first().map(XdmItem::string_value)
}

// Required arguments are guaranteed present by the library's cardinality check.
fn required(args: &[XdmSequence], i: usize) -> String {
    arg(args, i).unwrap_or_default()
}

/// Register every request function in `lib` and bind the `request` prefix.
pub fn register_request_module(lib: &mut FunctionLibrary<WebContext>) -> Result<(), Error> {
    lib.bind_prefix(PREFIX, NAMESPACE);

    macro_rules! reg {
        ($local:expr, $ret:expr, [$($param:expr),* $(,)?], $func:expr $(,)?) => {
            lib.register_ns(NAMESPACE, $local, $ret, &[$($param),*], $func)?
        };
    }

    reg!("application-path", "xs:string", [], |c, _| Ok(xdm::string(module::application_path(c.context))));

    reg!("url", "xs:string", [], |c, _| Ok(xdm::string(module::url(c.context, None, None)?)));
    reg!("url", "xs:string", ["xs:string?"], |c, a| {
        Ok(xdm::string(module::url(c.context, arg(a, 0).as_deref(), None)?))
    });
    reg!("url", "xs:string", ["xs:string?", "xs:string?"], |c, a| {
        Ok(xdm::string(module::url(c.context, arg(a, 0).as_deref(), arg(a, 1).as_deref())?))
    });

    reg!("app-relative-path", "xs:string", [], |c, _| Ok(xdm::string(module::app_relative_path(c.context))));
    reg!("app-relative-file-path", "xs:string", [], |c, _| {
        Ok(xdm::string(module::app_relative_file_path(c.context)))
    });
    reg!("path-info", "xs:string", [], |c, _| Ok(xdm::string(module::path_info(c.context))));
    reg!("path", "xs:string", [], |c, _| Ok(xdm::string(module::path(c.context))));
    reg!("file-path", "xs:string", [], |c, _| Ok(xdm::string(module::file_path(c.context))));
    reg!("resolve-url", "xs:string", ["xs:string"], |c, a| {
        Ok(xdm::string(module::resolve_url(c.context, &required(a, 0))?))
    });

    reg!("referrer-url", "xs:string?", [], |c, _| Ok(xdm::optional_string(module::referrer_url(c.context, None, None)?)));
    reg!("referrer-url", "xs:string?", ["xs:string?"], |c, a| {
        Ok(xdm::optional_string(module::referrer_url(c.context, arg(a, 0).as_deref(), None)?))
    });
    reg!("referrer-url", "xs:string?", ["xs:string?", "xs:string?"], |c, a| {
        Ok(xdm::optional_string(module::referrer_url(c.context, arg(a, 0).as_deref(), arg(a, 1).as_deref())?))
    });

    reg!("query", "xs:string", [], |c, _| Ok(xdm::string(module::query_string(c.context))));
    reg!("query", "xs:string*", ["xs:string?"], |c, a| Ok(xdm::strings(module::query(c.context, arg(a, 0).as_deref()))));
    reg!("query-names", "xs:string*", [], |c, _| Ok(xdm::strings(module::query_names(c.context))));

    reg!("form", "xs:string", [], |c, _| Ok(xdm::string(module::form_string(c.context))));
    reg!("form", "xs:string*", ["xs:string"], |c, a| Ok(xdm::strings(module::form(c.context, &required(a, 0)))));
    reg!("form-names", "xs:string*", [], |c, _| Ok(xdm::strings(module::form_names(c.context))));

    reg!("http-method", "xs:string", [], |c, _| Ok(xdm::string(module::http_method(c.context))));
    reg!("http-method-override", "xs:string", [], |c, _| Ok(xdm::string(module::http_method_override(c.context))));

    reg!("header", "xs:string?", ["xs:string"], |c, a| {
        Ok(xdm::optional_string(module::header(c.context, &required(a, 0))))
    });
    reg!("content-type", "xs:string?", [], |c, _| Ok(xdm::optional_string(module::content_type(c.context))));
    reg!("content-length", "xs:integer", [], |c, _| Ok(xdm::integer(module::content_length(c.context))));
    reg!("is-local", "xs:boolean", [], |c, _| Ok(xdm::boolean(module::is_local(c.context))));
    reg!("cookie", "xs:string?", ["xs:string"], |c, a| {
        Ok(xdm::optional_string(module::cookie(c.context, &required(a, 0))))
    });

    reg!("user-languages", "xs:string*", [], |c, _| Ok(xdm::strings(module::user_languages(c.context))));
    reg!("user-host-address", "xs:string", [], |c, _| Ok(xdm::string(module::user_host_address(c.context))));
    reg!("user-host-name", "xs:string", [], |c, _| Ok(xdm::string(module::user_host_name(c.context))));
    reg!("map-path", "xs:string", ["xs:string"], |c, a| {
        let path = module::map_path(c.context, &required(a, 0))?;
        Ok(xdm::string(path.to_string_lossy()))
    });
    reg!("is-ajax-request", "xs:boolean", [], |c, _| Ok(xdm::boolean(module::is_ajax_request(c.context))));

    Ok(())
}

/// A library holding only the request functions.
pub fn request_module() -> Result<FunctionLibrary<WebContext>, Error> {
    let mut lib = FunctionLibrary::new();
    register_request_module(&mut lib)?;
    Ok(lib)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_function_once_per_arity() {
        let lib = request_module().unwrap();
        assert_eq!(lib.len(), 31);
        assert_eq!(lib.namespace_for_prefix(PREFIX), Some(NAMESPACE));
        let names: Vec<String> = lib.functions().iter().map(|f| format!("{}#{}", f.name.local, f.arity())).collect();
        assert!(names.contains(&"referrer-url#2".to_string()));
        assert!(names.contains(&"is-ajax-request#0".to_string()));
    }
}
