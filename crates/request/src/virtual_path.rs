//! Virtual path arithmetic: `~/` application-relative paths, combining and
//! normalizing site-absolute paths.

use xqweb_core::{Error, ErrorCode};

pub fn append_trailing_slash(path: &str) -> String {
    if path.ends_with('/') { path.to_string() } else { format!("{path}/") }
}

/// `~/rest` when `path` lies under `application_path`, otherwise `path` unchanged.
pub fn to_app_relative(path: &str, application_path: &str) -> String {
    let app = append_trailing_slash(application_path);
    if let Some(rest) = strip_prefix_ignore_case(path, &app) {
        return format!("~/{rest}");
    }
    if path.eq_ignore_ascii_case(app.trim_end_matches('/')) {
        return "~/".to_string();
    }
    path.to_string()
}

/// Resolve `relative` against the directory of `base_file`, honouring `~/`
/// and site-absolute paths. The result is normalized and site-absolute.
pub fn combine(base_file: &str, relative: &str, application_path: &str) -> Result<String, Error> {
    if relative.trim().is_empty() {
        return Err(Error::from_code(ErrorCode::FORG0001, "relative path must not be empty"));
    }
    let joined = if let Some(rest) = relative.strip_prefix('~') {
        format!("{}{}", append_trailing_slash(application_path), rest.trim_start_matches('/'))
    } else if relative.starts_with('/') {
        relative.to_string()
    } else {
        format!("{}{relative}", directory(base_file))
    };
    let split = joined.find(['?', '#']).unwrap_or(joined.len());
    let (path, suffix) = joined.split_at(split);
    Ok(format!("{}{suffix}", normalize(path)?))
}

/// Everything up to and including the last `/`.
pub fn directory(path: &str) -> &str {
    path.rfind('/').map_or("/", |i| &path[..=i])
}

/// Collapse `.` and `..` segments and duplicate slashes. Fails when `..`
/// climbs above the root.
pub fn normalize(path: &str) -> Result<String, Error> {
    let mut segments: Vec<&str> = Vec::new();
    let mut trailing_slash = path.ends_with('/');
    for segment in path.split('/') {
        match segment {
            "" => {}
            "." => trailing_slash = true,
            ".." => {
                if segments.pop().is_none() {
                    return Err(Error::from_code(
                        ErrorCode::FORG0001,
                        format!("'{path}' points above the root"),
                    ));
                }
                trailing_slash = true;
            }
            s => {
                segments.push(s);
                trailing_slash = false;
            }
        }
    }
    trailing_slash |= path.ends_with('/');
    let mut out = format!("/{}", segments.join("/"));
    if trailing_slash && !out.ends_with('/') {
        out.push('/');
    }
    Ok(out)
}

pub fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}
