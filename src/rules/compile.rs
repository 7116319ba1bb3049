use crate::config::{FieldConfig, SiteConfig};
use crate::rules::{FieldRule, GroupRule, LabelFilter, SiteRuleSet, Transform};
use crate::RuleError;
use regex::Regex;
use scraper::Selector;
use std::collections::HashSet;

impl SiteRuleSet {
    /// Compiles a site's declarative configuration into a rule set
    ///
    /// Every selector is parsed, every transform name resolved and every regex
    /// compiled. Field and group names must be unique within the site, and a
    /// field may only reference a declared group.
    ///
    /// # Arguments
    ///
    /// * `site` - The site configuration table
    ///
    /// # Returns
    ///
    /// * `Ok(SiteRuleSet)` - Successfully compiled rule set
    /// * `Err(RuleError)` - The first rule that failed to compile
    pub fn compile(site: &SiteConfig) -> Result<Self, RuleError> {
        let domain = site.domain.to_lowercase();

        let mut groups = Vec::with_capacity(site.groups.len());
        let mut group_names = HashSet::new();
        for group in &site.groups {
            if !group_names.insert(group.name.as_str()) {
                return Err(RuleError::DuplicateGroup {
                    domain,
                    group: group.name.clone(),
                });
            }
            groups.push(GroupRule {
                name: group.name.clone(),
                required: group.required,
            });
        }

        let mut fields = Vec::with_capacity(site.fields.len());
        let mut field_names = HashSet::new();
        for field in &site.fields {
            if !field_names.insert(field.name.as_str()) {
                return Err(RuleError::DuplicateField {
                    domain,
                    field: field.name.clone(),
                });
            }
            // A top-level field and a group would share one key in the record
            if field.group.is_none() && group_names.contains(field.name.as_str()) {
                return Err(RuleError::NameCollision {
                    domain,
                    name: field.name.clone(),
                });
            }
            if let Some(group) = &field.group {
                if !group_names.contains(group.as_str()) {
                    return Err(RuleError::UndeclaredGroup {
                        domain,
                        field: field.name.clone(),
                        group: group.clone(),
                    });
                }
            }
            fields.push(compile_field(&domain, field)?);
        }

        tracing::debug!(
            "Compiled rule set for {}: {} fields, {} groups",
            domain,
            fields.len(),
            groups.len()
        );

        Ok(Self {
            domain,
            fields,
            groups,
        })
    }
}

fn compile_field(domain: &str, field: &FieldConfig) -> Result<FieldRule, RuleError> {
    let selector = parse_selector(domain, &field.name, &field.selector)?;

    let child = field
        .child
        .as_deref()
        .map(|s| parse_selector(domain, &field.name, s))
        .transpose()?;

    let label = match &field.label {
        Some(label) => {
            if child.is_none() {
                return Err(invalid(
                    domain,
                    &field.name,
                    "a label filter needs a child selector for the value",
                ));
            }
            Some(LabelFilter {
                selector: parse_selector(domain, &field.name, &label.selector)?,
                equals: label.equals.trim().to_string(),
            })
        }
        None => None,
    };

    if field.attr.as_deref().is_some_and(|a| a.trim().is_empty()) {
        return Err(invalid(domain, &field.name, "attr cannot be empty"));
    }

    let transform = compile_transform(domain, field)?;

    Ok(FieldRule {
        name: field.name.clone(),
        selector,
        cardinality: field.cardinality,
        required: field.required,
        transform,
        child,
        attr: field.attr.clone(),
        label,
        group: field.group.clone(),
    })
}

fn compile_transform(domain: &str, field: &FieldConfig) -> Result<Transform, RuleError> {
    let name = field.transform.as_deref().unwrap_or("trim");

    if name != "regex" && field.pattern.is_some() {
        return Err(invalid(
            domain,
            &field.name,
            "pattern is only used by the regex transform",
        ));
    }

    match name {
        "trim" => Ok(Transform::Trim),
        "collapse-whitespace" => Ok(Transform::CollapseWhitespace),
        "number" => Ok(Transform::Number),
        "regex" => {
            let pattern = field.pattern.as_deref().ok_or_else(|| {
                invalid(domain, &field.name, "the regex transform needs a pattern")
            })?;
            let re = Regex::new(pattern).map_err(|source| RuleError::Regex {
                domain: domain.to_string(),
                field: field.name.clone(),
                source,
            })?;
            Ok(Transform::Regex(re))
        }
        other => Err(RuleError::UnknownTransform {
            domain: domain.to_string(),
            field: field.name.clone(),
            name: other.to_string(),
            expected: Transform::NAMES.join(", "),
        }),
    }
}

fn parse_selector(domain: &str, field: &str, selector: &str) -> Result<Selector, RuleError> {
    Selector::parse(selector).map_err(|e| RuleError::Selector {
        domain: domain.to_string(),
        field: field.to_string(),
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

fn invalid(domain: &str, field: &str, message: &str) -> RuleError {
    RuleError::InvalidRule {
        domain: domain.to_string(),
        field: field.to_string(),
        message: message.to_string(),
    }
}
