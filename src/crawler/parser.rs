//! HTML parsing
//!
//! Wraps `scraper`'s lenient HTML5 parser and rejects bodies that carry no
//! markup at all. The returned document is not `Send`; callers parse and
//! extract in one synchronous step.

use crate::crawler::task::{ErrorKind, TaskError};
use scraper::{ElementRef, Html};

/// A body that cannot be treated as an HTML document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed markup: {0}")]
pub struct MalformedMarkup(pub String);

impl From<MalformedMarkup> for TaskError {
    fn from(error: MalformedMarkup) -> Self {
        TaskError::new(ErrorKind::MalformedMarkup, error.0)
    }
}

/// Parses a page body into a document
///
/// The HTML5 parser recovers from almost anything, so rejection is limited
/// to bodies that are blank or contain no element beyond the implicit
/// `html`/`head`/`body` skeleton.
///
/// # Example
///
/// ```
/// use ladle::crawler::parse_document;
///
/// assert!(parse_document("<h1>Chicken Parmesan</h1>").is_ok());
/// assert!(parse_document("   ").is_err());
/// ```
pub fn parse_document(body: &str) -> Result<Html, MalformedMarkup> {
    if body.trim().is_empty() {
        return Err(MalformedMarkup("empty body".to_string()));
    }

    let document = Html::parse_document(body);

    let has_elements = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|element| !matches!(element.value().name(), "html" | "head" | "body"));

    if !has_elements {
        return Err(MalformedMarkup("no HTML elements found".to_string()));
    }

    Ok(document)
}
