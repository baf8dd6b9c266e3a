//! URL utilities for consistent endpoint construction
//!
//! The base URL is user-supplied (`--base-url`), so trailing slashes have to
//! be tolerated without producing double slashes in the final endpoints.

/// Normalize a base URL by removing trailing slashes.
///
/// # Examples
///
/// ```
/// use arcvale::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000"), "http://localhost:8000");
/// assert_eq!(normalize_base_url("http://localhost:8000/"), "http://localhost:8000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Construct a complete endpoint URL from a base URL and endpoint path.
///
/// # Examples
///
/// ```
/// use arcvale::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000", "query-stream"),
///     "http://localhost:8000/query-stream"
/// );
/// assert_eq!(
///     construct_api_url("http://localhost:8000/", "/health"),
///     "http://localhost:8000/health"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("http://localhost:8000"),
            "http://localhost:8000"
        );
        assert_eq!(
            normalize_base_url("http://localhost:8000///"),
            "http://localhost:8000"
        );
        assert_eq!(normalize_base_url(""), "");
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn test_construct_api_url() {
        assert_eq!(
            construct_api_url("http://localhost:8000", "query"),
            "http://localhost:8000/query"
        );
        assert_eq!(
            construct_api_url("http://localhost:8000/", "query"),
            "http://localhost:8000/query"
        );
        assert_eq!(
            construct_api_url("http://localhost:8000", "/health"),
            "http://localhost:8000/health"
        );
        assert_eq!(
            construct_api_url("https://advisor.example.com/api/", "/query-stream"),
            "https://advisor.example.com/api/query-stream"
        );
    }
}
