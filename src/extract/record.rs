use crate::extract::field::{ExtractionResult, FieldValue};
use crate::rules::SiteRuleSet;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Whether every required field of a record was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completeness {
    Complete,

    /// Carries the missing required names in declaration order. Members of a
    /// required group are reported as `group.field`; a required group with no
    /// value at all is reported by its name.
    Partial { missing: Vec<String> },
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Missing required names (empty for complete records)
    pub fn missing_fields(&self) -> &[String] {
        match self {
            Self::Complete => &[],
            Self::Partial { missing } => missing,
        }
    }
}

/// Canonical record assembled from one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Top-level fields in declaration order
    pub fields: Vec<(String, FieldValue)>,

    /// Nested groups in declaration order
    pub groups: Vec<GroupRecord>,

    pub completeness: Completeness,
}

/// Sub-object for one nested group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    pub name: String,
    pub fields: Vec<(String, FieldValue)>,
}

impl GroupRecord {
    /// Returns true if at least one member field is present
    pub fn has_values(&self) -> bool {
        self.fields.iter().any(|(_, v)| v.is_present())
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl Record {
    pub fn is_complete(&self) -> bool {
        self.completeness.is_complete()
    }

    /// Looks up a top-level field
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn group(&self, name: &str) -> Option<&GroupRecord> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// Assembles the extraction result of one document into a record
///
/// A field with no entry in `extraction` is treated as `Missing`, so the
/// record always carries every field the rule set declares.
///
/// # Completeness
///
/// - Complete iff every required top-level field is present.
/// - Group members may be missing individually without affecting the parent.
/// - A required group with no present member is missing as a whole; a
///   required group with some values reports each of its missing required
///   members as `group.field`.
/// - Fields of optional groups never make a record partial.
pub fn assemble(rules: &SiteRuleSet, extraction: &ExtractionResult) -> Record {
    let value_for = |name: &str| extraction.get(name).cloned().unwrap_or(FieldValue::Missing);

    let mut missing = Vec::new();

    let fields: Vec<(String, FieldValue)> = rules
        .top_level_fields()
        .map(|rule| {
            let value = value_for(&rule.name);
            if rule.required && !value.is_present() {
                missing.push(rule.name.clone());
            }
            (rule.name.clone(), value)
        })
        .collect();

    let mut groups = Vec::with_capacity(rules.groups.len());
    for group_rule in &rules.groups {
        let group = GroupRecord {
            name: group_rule.name.clone(),
            fields: rules
                .group_fields(&group_rule.name)
                .map(|rule| (rule.name.clone(), value_for(&rule.name)))
                .collect(),
        };

        if group_rule.required {
            if !group.has_values() {
                missing.push(group_rule.name.clone());
            } else {
                for rule in rules.group_fields(&group_rule.name) {
                    let present = group.get(&rule.name).is_some_and(FieldValue::is_present);
                    if rule.required && !present {
                        missing.push(format!("{}.{}", group_rule.name, rule.name));
                    }
                }
            }
        }

        groups.push(group);
    }

    let completeness = if missing.is_empty() {
        Completeness::Complete
    } else {
        Completeness::Partial { missing }
    };

    Record {
        fields,
        groups,
        completeness,
    }
}

/// Serializes `(name, value)` pairs as a JSON object in their given order
struct FieldMap<'a>(&'a [(String, FieldValue)]);

impl Serialize for FieldMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + self.groups.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        for group in &self.groups {
            map.serialize_entry(&group.name, &FieldMap(&group.fields))?;
        }
        map.end()
    }
}
