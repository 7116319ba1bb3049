use serde::Deserialize;

/// Main configuration structure for Ladle
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteConfig>,
}

/// Crawl scheduler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Number of workers, and so the maximum number of in-flight tasks
    pub concurrency: u32,

    /// Deadline for a single fetch attempt (milliseconds)
    #[serde(rename = "per-task-timeout-ms")]
    pub per_task_timeout_ms: u64,

    /// Retries allowed after the first attempt for retryable failures
    #[serde(rename = "max-retries", default)]
    pub max_retries: u32,

    /// Delay before the first retry; doubled for each further retry (milliseconds)
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound for a single backoff delay (milliseconds)
    #[serde(rename = "backoff-max-ms", default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Minimum spacing between request starts to the same domain (milliseconds)
    #[serde(rename = "min-domain-interval-ms", default)]
    pub min_domain_interval_ms: u64,
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

/// Scheduler values given on the command line, replacing the file's
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerOverrides {
    pub concurrency: Option<u32>,
    pub per_task_timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Extraction rules for one registered domain
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Exact host name this rule set applies to (e.g., "www.allrecipes.com")
    pub domain: String,

    /// Nested groups that fields may belong to
    #[serde(default, rename = "group")]
    pub groups: Vec<GroupConfig>,

    /// Field rules, in output order
    #[serde(default, rename = "field")]
    pub fields: Vec<FieldConfig>,
}

/// A nested group of fields (e.g., nutrition facts)
#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    pub name: String,

    #[serde(default)]
    pub required: bool,
}

/// Declarative rule for one logical field
#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    /// Logical field name in the canonical record
    pub name: String,

    /// CSS selector matched against the whole document
    pub selector: String,

    #[serde(default)]
    pub cardinality: Cardinality,

    #[serde(default)]
    pub required: bool,

    /// Transform name: "trim", "collapse-whitespace", "regex" or "number"
    #[serde(default)]
    pub transform: Option<String>,

    /// Regular expression used by the "regex" transform
    #[serde(default)]
    pub pattern: Option<String>,

    /// Selector evaluated inside each match; its text becomes the value
    #[serde(default)]
    pub child: Option<String>,

    /// Read this attribute instead of the text content
    #[serde(default)]
    pub attr: Option<String>,

    /// Keep only matches whose label child has the given text
    #[serde(default)]
    pub label: Option<LabelConfig>,

    /// Group this field is nested under
    #[serde(default)]
    pub group: Option<String>,
}

/// Label filter for label/value rows
#[derive(Debug, Clone, Deserialize)]
pub struct LabelConfig {
    /// Selector for the label element inside each match
    pub selector: String,

    /// Expected label text after trimming
    pub equals: String,
}

/// Whether a field extracts one value or a list of values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    Single,
    List,
}
