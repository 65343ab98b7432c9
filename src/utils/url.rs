//! Endpoint URL handling.
//!
//! The endpoint comes from flags, the config file, or a built-in default, so
//! it may or may not carry a trailing slash. These helpers make request URL
//! construction insensitive to that.

/// Strips trailing slashes from a base URL.
///
/// # Examples
///
/// ```
/// use confab::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000"), "http://localhost:8000");
/// assert_eq!(normalize_base_url("http://localhost:8000/"), "http://localhost:8000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Joins a base URL and a path with exactly one slash between them.
///
/// # Examples
///
/// ```
/// use confab::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000/", "api/chat"),
///     "http://localhost:8000/api/chat"
/// );
/// assert_eq!(
///     construct_api_url("http://localhost:8000", "/api/chat"),
///     "http://localhost:8000/api/chat"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}
