//! Site registry
//!
//! Maps a URL's domain to the rule set registered for it. The registry is
//! built once from configuration and is read-only afterwards, so workers
//! share it through an `Arc` without locking.

use crate::config::SiteConfig;
use crate::rules::SiteRuleSet;
use crate::url::extract_domain;
use crate::RuleError;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Immutable table of compiled rule sets keyed by exact domain
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    sites: HashMap<String, Arc<SiteRuleSet>>,
}

/// Why a URL could not be resolved to a rule set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotRegistered {
    #[error("No rule set registered for domain '{0}'")]
    Domain(String),

    #[error("URL has no domain")]
    NoDomain,
}

impl SiteRegistry {
    /// Compiles and registers every configured site
    ///
    /// # Returns
    ///
    /// * `Ok(SiteRegistry)` - All rule sets compiled
    /// * `Err(RuleError)` - A rule failed to compile, or a domain is registered twice
    pub fn from_config(sites: &[SiteConfig]) -> Result<Self, RuleError> {
        let mut registry = Self::default();
        for site in sites {
            registry.register(SiteRuleSet::compile(site)?)?;
        }
        Ok(registry)
    }

    /// Adds a compiled rule set; domains are unique
    pub fn register(&mut self, rules: SiteRuleSet) -> Result<(), RuleError> {
        let domain = rules.domain.to_lowercase();
        if self.sites.contains_key(&domain) {
            return Err(RuleError::DuplicateDomain(domain));
        }
        self.sites.insert(domain, Arc::new(rules));
        Ok(())
    }

    /// Resolves a URL to its rule set by exact domain match
    ///
    /// No subdomain or wildcard inference is done: `www.example.com` and
    /// `example.com` are different sites.
    pub fn resolve(&self, url: &Url) -> Result<Arc<SiteRuleSet>, NotRegistered> {
        let domain = extract_domain(url).ok_or(NotRegistered::NoDomain)?;
        self.sites
            .get(&domain)
            .cloned()
            .ok_or(NotRegistered::Domain(domain))
    }

    /// Registered domains, sorted
    pub fn domains(&self) -> Vec<&str> {
        let mut domains: Vec<&str> = self.sites.keys().map(String::as_str).collect();
        domains.sort_unstable();
        domains
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
