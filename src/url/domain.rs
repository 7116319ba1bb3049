use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to
/// lowercase. The port is not part of the domain.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ladle::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("https://www.example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
