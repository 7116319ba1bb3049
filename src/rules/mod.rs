//! Site rule sets
//!
//! A rule set is the compiled form of one `[[site]]` configuration table: an
//! ordered list of field rules with their selectors parsed and their
//! transforms resolved. Compilation is the only place a rule can fail; once a
//! [`SiteRuleSet`] exists it is immutable and shared read-only by every worker.

mod compile;
mod transform;

pub use crate::config::Cardinality;
pub use transform::Transform;

use scraper::Selector;

/// Compiled extraction rules for one domain
#[derive(Debug, Clone)]
pub struct SiteRuleSet {
    /// Exact host name, lowercased
    pub domain: String,

    /// Field rules in declaration order
    pub fields: Vec<FieldRule>,

    /// Declared nested groups in declaration order
    pub groups: Vec<GroupRule>,
}

/// Compiled rule for one logical field
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: String,
    pub selector: Selector,
    pub cardinality: Cardinality,
    pub required: bool,
    pub transform: Transform,
    pub child: Option<Selector>,
    pub attr: Option<String>,
    pub label: Option<LabelFilter>,
    pub group: Option<String>,
}

/// Keeps only matches whose label element reads `equals`
#[derive(Debug, Clone)]
pub struct LabelFilter {
    pub selector: Selector,
    pub equals: String,
}

/// A nested group of fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRule {
    pub name: String,
    pub required: bool,
}

impl SiteRuleSet {
    /// Looks up a field rule by name
    pub fn field(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up a group by name
    pub fn group(&self, name: &str) -> Option<&GroupRule> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Top-level fields (not nested in a group), in declaration order
    pub fn top_level_fields(&self) -> impl Iterator<Item = &FieldRule> {
        self.fields.iter().filter(|f| f.group.is_none())
    }

    /// Fields nested in the named group, in declaration order
    pub fn group_fields<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a FieldRule> {
        self.fields
            .iter()
            .filter(move |f| f.group.as_deref() == Some(group))
    }
}
