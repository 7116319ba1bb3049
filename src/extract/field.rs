use crate::rules::{Cardinality, FieldRule, SiteRuleSet};
use scraper::{ElementRef, Html};
use serde::{Serialize, Serializer};

/// Outcome of extracting one field from one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Value of a single-cardinality field
    Single(String),

    /// Values of a list-cardinality field, in document order (may be empty)
    List(Vec<String>),

    /// The field could not be extracted
    Missing,
}

impl FieldValue {
    /// Returns true unless the value is `Missing`
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Missing)
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(values) => Some(values),
            _ => None,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Single(value) => serializer.serialize_str(value),
            Self::List(values) => values.serialize(serializer),
            Self::Missing => serializer.serialize_none(),
        }
    }
}

/// Per-field values for every field declared by a rule set
///
/// Entries follow the rule set's declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    values: Vec<(String, FieldValue)>,
}

impl ExtractionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of a field, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Removes a field's entry entirely
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        let index = self.values.iter().position(|(n, _)| n == name)?;
        Some(self.values.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names of fields that came back `Missing`
    pub fn misses(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, v)| !v.is_present())
            .map(|(n, _)| n)
            .collect()
    }
}

/// Applies one rule to a parsed document
///
/// # Rules
///
/// - Candidates are the selector's matches in document order, narrowed by
///   the label filter when one is set.
/// - A candidate's raw value is the attribute (if `attr` is set) or the text
///   of the candidate, or of its first `child` match when `child` is set.
/// - The raw value is trimmed, then transformed. Values that end up empty or
///   that the transform rejects are dropped.
/// - Single: the first surviving value, or `Missing`.
/// - List: every surviving value. An empty list stays an empty list unless
///   the rule is required, in which case it is `Missing`.
///
/// # Example
///
/// ```
/// use ladle::config::{Cardinality, FieldConfig, SiteConfig};
/// use ladle::extract::{extract, FieldValue};
/// use ladle::rules::SiteRuleSet;
/// use scraper::Html;
///
/// let site = SiteConfig {
///     domain: "example.com".to_string(),
///     groups: vec![],
///     fields: vec![FieldConfig {
///         name: "name".to_string(),
///         selector: "h1".to_string(),
///         cardinality: Cardinality::Single,
///         required: true,
///         transform: None,
///         pattern: None,
///         child: None,
///         attr: None,
///         label: None,
///         group: None,
///     }],
/// };
/// let rules = SiteRuleSet::compile(&site).unwrap();
/// let document = Html::parse_document("<h1>  Chicken Parmesan </h1>");
///
/// assert_eq!(
///     extract(&document, &rules.fields[0]),
///     FieldValue::Single("Chicken Parmesan".to_string())
/// );
/// ```
pub fn extract(document: &Html, rule: &FieldRule) -> FieldValue {
    let mut values = document
        .select(&rule.selector)
        .filter(|element| label_matches(element, rule))
        .filter_map(|element| value_of(element, rule));

    match rule.cardinality {
        Cardinality::Single => values
            .next()
            .map(FieldValue::Single)
            .unwrap_or(FieldValue::Missing),
        Cardinality::List => {
            let values: Vec<String> = values.collect();
            if values.is_empty() && rule.required {
                FieldValue::Missing
            } else {
                FieldValue::List(values)
            }
        }
    }
}

/// Applies every rule of a rule set to a parsed document
pub fn extract_all(document: &Html, rules: &SiteRuleSet) -> ExtractionResult {
    let mut result = ExtractionResult::new();

    for rule in &rules.fields {
        let value = extract(document, rule);
        if !value.is_present() {
            tracing::debug!("{}: field '{}' missing", rules.domain, rule.name);
        }
        result.insert(rule.name.clone(), value);
    }

    result
}

fn label_matches(element: &ElementRef<'_>, rule: &FieldRule) -> bool {
    let Some(label) = &rule.label else {
        return true;
    };

    element
        .select(&label.selector)
        .next()
        .map(|label_element| text_of(&label_element).trim() == label.equals)
        .unwrap_or(false)
}

fn value_of(element: ElementRef<'_>, rule: &FieldRule) -> Option<String> {
    let source = match &rule.child {
        Some(child) => element.select(child).next()?,
        None => element,
    };

    let raw = match &rule.attr {
        Some(attr) => source.value().attr(attr)?.to_string(),
        None => text_of(&source),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    rule.transform.apply(trimmed)
}

fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>()
}
