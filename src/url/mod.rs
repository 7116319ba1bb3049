//! URL handling module for Ladle
//!
//! Input URLs are parsed once, up front, so a malformed entry fails its own
//! task instead of surfacing later inside a worker.

mod domain;

pub use domain::extract_domain;

use crate::{UrlError, UrlResult};
use url::Url;

/// Parses an input URL for crawling
///
/// # Rules
///
/// 1. The string (trimmed) must parse as an absolute URL
/// 2. Only `http` and `https` schemes are accepted
/// 3. The URL must have a host
/// 4. The fragment is dropped; it never reaches the server
///
/// # Examples
///
/// ```
/// use ladle::url::parse_task_url;
///
/// let url = parse_task_url(" https://www.allrecipes.com/recipe/1/#reviews ").unwrap();
/// assert_eq!(url.as_str(), "https://www.allrecipes.com/recipe/1/");
///
/// assert!(parse_task_url("ftp://example.com/file").is_err());
/// ```
pub fn parse_task_url(input: &str) -> UrlResult<Url> {
    let mut url =
        Url::parse(input.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", input, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);
    Ok(url)
}
