//! URL helpers shared by the HTTP clients.

use url::Url;

/// Join a base URL and a path with exactly one `/` between them.
///
/// # Example
///
/// ```
/// use centric_etl_repository::utils::join_url;
///
/// assert_eq!(join_url("http://rollcall:9001/", "/indices/create"), "http://rollcall:9001/indices/create");
/// ```
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Resolve a pagination link against the URL of the page that returned it.
///
/// Absolute links are returned unchanged. Relative links are resolved the way
/// a browser would; if the current URL cannot be parsed the link is returned
/// as is and the next request reports the failure.
pub fn resolve_url(current: &str, link: &str) -> String {
    if Url::parse(link).is_ok() {
        return link.to_string();
    }
    match Url::parse(current).and_then(|base| base.join(link)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => link.to_string(),
    }
}
