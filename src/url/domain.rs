use crate::FrontierError;
use url::Url;

/// Extracts the lowercase host from a parsed URL
///
/// The port is not part of the result: `example.com:8080` and `example.com`
/// share one politeness budget.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use crawl_admission::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}

/// Resolves the lowercase host of a raw URL string
///
/// This is the key the host throttle cache is indexed on.
///
/// # Returns
///
/// * `Ok(String)` - The lowercase host
/// * `Err(FrontierError::HostResolution)` - The URL is malformed or has no host
pub fn resolve_host(url_str: &str) -> Result<String, FrontierError> {
    let url = Url::parse(url_str).map_err(|e| FrontierError::HostResolution {
        url: url_str.to_string(),
        reason: e.to_string(),
    })?;

    extract_domain(&url).ok_or_else(|| FrontierError::HostResolution {
        url: url_str.to_string(),
        reason: "URL has no host".to_string(),
    })
}
