use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_classification() -> String {
    "internal".to_string()
}

fn default_status() -> NodeStatus {
    NodeStatus::Active
}

fn default_true() -> bool {
    true
}

fn default_base_row_count() -> u64 {
    100
}

/// Lifecycle state of a [`CatalogNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Draft,
    PendingReview,
    Approved,
    Active,
    Deprecated,
    Archived,
}

impl NodeStatus {
    /// Whether a binding served from a node in this status may be returned
    /// to a caller. Archived, draft, and pending-review nodes never serve a
    /// binding, including one that would otherwise be inherited by a
    /// descendant.
    pub fn serves_bindings(&self) -> bool {
        !matches!(
            self,
            NodeStatus::Archived | NodeStatus::Draft | NodeStatus::PendingReview
        )
    }
}

/// The concrete backend a [`CatalogNode`] binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Snowflake,
    Oracle,
    Mssql,
    Rest,
    Static,
    Excel,
    Bloomberg,
    Refinitiv,
    Opensearch,
    Composite,
    Derived,
}

/// Ten independently-inherited ownership fields, each resolved from the
/// nearest defining ancestor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    #[serde(default)]
    pub accountable_owner: Option<String>,
    #[serde(default)]
    pub data_specialist: Option<String>,
    #[serde(default)]
    pub support_channel: Option<String>,
    #[serde(default)]
    pub adop: Option<String>,
    #[serde(default)]
    pub ads: Option<String>,
    #[serde(default)]
    pub adal: Option<String>,
    #[serde(default)]
    pub adop_name: Option<String>,
    #[serde(default)]
    pub ads_name: Option<String>,
    #[serde(default)]
    pub adal_name: Option<String>,
    #[serde(default)]
    pub ui: Option<String>,
}

/// Macro-free listing of ownership field names, used to drive the
/// inheritance walk and the provenance-paired resolved output without
/// repeating the field list in three places.
pub const OWNERSHIP_FIELDS: &[&str] = &[
    "accountable_owner",
    "data_specialist",
    "support_channel",
    "adop",
    "ads",
    "adal",
    "adop_name",
    "ads_name",
    "adal_name",
    "ui",
];

impl Ownership {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "accountable_owner" => self.accountable_owner.as_deref(),
            "data_specialist" => self.data_specialist.as_deref(),
            "support_channel" => self.support_channel.as_deref(),
            "adop" => self.adop.as_deref(),
            "ads" => self.ads.as_deref(),
            "adal" => self.adal.as_deref(),
            "adop_name" => self.adop_name.as_deref(),
            "ads_name" => self.ads_name.as_deref(),
            "adal_name" => self.adal_name.as_deref(),
            "ui" => self.ui.as_deref(),
            _ => None,
        }
    }
}

/// Output of the ownership inheritance walk: each field paired with the
/// ancestor path where it was defined (if any).
///
/// Serializes flat, one `<field>` / `<field>_source` pair per resolved
/// field, matching the wire shape every resolve/describe/list/lineage
/// response documents -- not the `{values, provenance}` shape this type
/// stores internally.
#[derive(Debug, Clone, Default)]
pub struct ResolvedOwnership {
    pub values: BTreeMap<String, String>,
    pub provenance: BTreeMap<String, String>,
}

impl Serialize for ResolvedOwnership {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.values.len() * 2))?;
        for field in OWNERSHIP_FIELDS {
            if let Some(value) = self.values.get(*field) {
                map.serialize_entry(field, value)?;
            }
            if let Some(source) = self.provenance.get(*field) {
                map.serialize_entry(&format!("{field}_source"), source)?;
            }
        }
        map.end()
    }
}

impl ResolvedOwnership {
    /// Walks `chain` (root to self, each entry an ownership record keyed by
    /// its path) and overwrites, per field, both the running value and its
    /// provenance whenever an ancestor defines a non-null value.
    pub fn walk<'a, I>(chain: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Ownership)>,
    {
        let mut out = ResolvedOwnership::default();
        for (path, ownership) in chain {
            for field in OWNERSHIP_FIELDS {
                if let Some(value) = ownership.field(field) {
                    out.values.insert((*field).to_string(), value.to_string());
                    out.provenance.insert((*field).to_string(), path.to_string());
                }
            }
        }
        out
    }
}

/// Association of a node with a concrete backend: type, opaque config, and
/// an optional query template under the reserved `query` config key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceBinding {
    pub source_type: SourceType,
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub schema: Option<serde_json::Value>,
    #[serde(default = "default_true")]
    pub read_only: bool,
    #[serde(default)]
    pub allowed_operations: Vec<String>,
}

impl SourceBinding {
    pub fn query_template(&self) -> Option<&str> {
        self.config.get("query").and_then(|v| v.as_str())
    }
}

/// Declarative predicate over a segment sequence, producing an allow/deny
/// decision and a row-count estimate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessPolicy {
    #[serde(default)]
    pub required_segments: Vec<usize>,
    #[serde(default)]
    pub min_filters: usize,
    #[serde(default)]
    pub blocked_patterns: Vec<String>,
    #[serde(default)]
    pub cardinality_multipliers: Vec<u64>,
    #[serde(default = "default_base_row_count")]
    pub base_row_count: u64,
    #[serde(default)]
    pub max_rows_warn: Option<u64>,
    #[serde(default)]
    pub max_rows_block: Option<u64>,
    #[serde(default)]
    pub require_confirmation_above: Option<u64>,
    #[serde(default)]
    pub denial_message: Option<String>,
    #[serde(default)]
    pub allowed_roles: Vec<String>,
    #[serde(default)]
    pub allowed_hours: Option<(u8, u8)>,
}

/// Verdict of [`AccessPolicy::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyVerdict {
    Allow,
    AllowWithWarning(String),
    Deny(String),
}

impl AccessPolicy {
    /// Evaluates this policy against a moniker's path segments, returning
    /// `(allowed, message, estimated_rows)`. A query is allowed iff no
    /// blocked pattern matches, every required segment is specific, the
    /// minimum filter count is met, and the estimate stays at or under
    /// `max_rows_block`.
    pub fn validate(&self, segments: &[String]) -> (PolicyVerdict, u64) {
        let joined = segments.join("/");
        for pattern in &self.blocked_patterns {
            if regex_or_substring_matches(pattern, &joined) {
                let msg = self
                    .denial_message
                    .clone()
                    .unwrap_or_else(|| format!("path matches blocked pattern {pattern:?}"));
                return (PolicyVerdict::Deny(msg), self.estimate_rows(segments));
            }
        }

        for &idx in &self.required_segments {
            if is_all(segments.get(idx)) {
                let msg = self.denial_message.clone().unwrap_or_else(|| {
                    format!("segment {idx} must be specific, not ALL")
                });
                return (PolicyVerdict::Deny(msg), self.estimate_rows(segments));
            }
        }

        let specific_count = segments.iter().filter(|s| !is_all(Some(s))).count();
        if specific_count < self.min_filters {
            let msg = self.denial_message.clone().unwrap_or_else(|| {
                format!(
                    "at least {} specific segment(s) required, found {}",
                    self.min_filters, specific_count
                )
            });
            return (PolicyVerdict::Deny(msg), self.estimate_rows(segments));
        }

        let estimated_rows = self.estimate_rows(segments);

        if let Some(max_block) = self.max_rows_block {
            if estimated_rows > max_block {
                let msg = self.denial_message.clone().unwrap_or_else(|| {
                    format!(
                        "estimated row count {estimated_rows} exceeds the limit of {max_block}"
                    )
                });
                return (PolicyVerdict::Deny(msg), estimated_rows);
            }
        }

        if let Some(max_warn) = self.max_rows_warn {
            if estimated_rows > max_warn {
                return (
                    PolicyVerdict::AllowWithWarning(format!(
                        "estimated row count {estimated_rows} exceeds the warning threshold of {max_warn}"
                    )),
                    estimated_rows,
                );
            }
        }

        (PolicyVerdict::Allow, estimated_rows)
    }

    fn estimate_rows(&self, segments: &[String]) -> u64 {
        let mut rows = self.base_row_count;
        for (idx, segment) in segments.iter().enumerate() {
            if is_all(Some(segment)) {
                let multiplier = self
                    .cardinality_multipliers
                    .get(idx)
                    .copied()
                    .unwrap_or(100);
                rows = rows.saturating_mul(multiplier);
            }
        }
        rows
    }
}

fn is_all(segment: Option<&String>) -> bool {
    segment.is_some_and(|s| s.eq_ignore_ascii_case("ALL"))
}

fn regex_or_substring_matches(pattern: &str, haystack: &str) -> bool {
    match regex::RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => re.is_match(haystack),
        Err(_) => haystack.to_ascii_lowercase().contains(&pattern.to_ascii_lowercase()),
    }
}

/// Coarse quality signal attached to a node; consulted by nothing in the
/// resolution path, carried purely as descriptive metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataQuality {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sla {
    #[serde(default)]
    pub uptime_pct: Option<f64>,
    #[serde(default)]
    pub response_time_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Freshness {
    #[serde(default)]
    pub max_staleness_seconds: Option<u64>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSchema {
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Documentation {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A single node in the catalog tree, keyed by its canonical path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogNode {
    #[serde(skip)]
    pub path: String,

    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_classification")]
    pub classification: String,
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub ownership: Ownership,

    #[serde(default)]
    pub binding: Option<SourceBinding>,
    #[serde(default)]
    pub policy: Option<AccessPolicy>,

    #[serde(default)]
    pub quality: Option<DataQuality>,
    #[serde(default)]
    pub sla: Option<Sla>,
    #[serde(default)]
    pub freshness: Option<Freshness>,
    #[serde(default)]
    pub schema: Option<DataSchema>,
    #[serde(default)]
    pub documentation: Option<Documentation>,

    #[serde(default = "default_status")]
    pub status: NodeStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub successor: Option<String>,
    #[serde(default)]
    pub sunset_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub migration_guide_url: Option<String>,
    #[serde(default)]
    pub is_leaf: bool,
}

impl CatalogNode {
    /// An empty, non-leaf node synthesized for a path with no registered
    /// entry. Virtual nodes never carry a binding and never participate in
    /// ownership inheritance as a *source* (nothing can descend from a
    /// placeholder within a snapshot), though their own ownership is still
    /// resolved by walking registered ancestors.
    pub fn virtual_node(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            display_name: None,
            description: None,
            classification: default_classification(),
            tags: Vec::new(),
            ownership: Ownership::default(),
            binding: None,
            policy: None,
            quality: None,
            sla: None,
            freshness: None,
            schema: None,
            documentation: None,
            status: NodeStatus::Active,
            created_at: None,
            updated_at: None,
            successor: None,
            sunset_at: None,
            migration_guide_url: None,
            is_leaf: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cardinality_multiplier_drives_estimated_rows() {
        let policy = AccessPolicy {
            base_row_count: 1000,
            cardinality_multipliers: vec![10, 10, 10],
            max_rows_block: Some(5_000),
            ..Default::default()
        };
        let (verdict, estimated_rows) = policy.validate(&seg(&["ALL", "ALL", "x"]));
        assert_eq!(estimated_rows, 100_000);
        assert!(matches!(verdict, PolicyVerdict::Deny(_)));
    }

    #[test]
    fn all_beyond_multiplier_list_defaults_to_hundred() {
        let policy = AccessPolicy {
            base_row_count: 1,
            cardinality_multipliers: vec![10],
            max_rows_block: Some(u64::MAX),
            ..Default::default()
        };
        // Index 1 has no configured multiplier, so it defaults to 100.
        let (_, estimated_rows) = policy.validate(&seg(&["ALL", "ALL"]));
        assert_eq!(estimated_rows, 1 * 10 * 100);
    }

    #[test]
    fn required_segment_must_be_specific() {
        let policy = AccessPolicy {
            required_segments: vec![1],
            ..Default::default()
        };
        let (verdict, _) = policy.validate(&seg(&["x", "ALL"]));
        match verdict {
            PolicyVerdict::Deny(msg) => assert!(!msg.is_empty()),
            other => panic!("expected Deny, got {other:?}"),
        }
    }

    #[test]
    fn min_filters_enforced() {
        let policy = AccessPolicy {
            min_filters: 2,
            ..Default::default()
        };
        let (verdict, _) = policy.validate(&seg(&["x", "ALL", "ALL"]));
        assert!(matches!(verdict, PolicyVerdict::Deny(_)));
        let (verdict, _) = policy.validate(&seg(&["x", "y", "ALL"]));
        assert!(matches!(verdict, PolicyVerdict::Allow));
    }

    #[test]
    fn blocked_pattern_denies_regardless_of_filters() {
        let policy = AccessPolicy {
            blocked_patterns: vec!["secret".to_string()],
            denial_message: Some("not allowed".to_string()),
            ..Default::default()
        };
        let (verdict, _) = policy.validate(&seg(&["a", "SECRET", "b"]));
        assert_eq!(verdict, PolicyVerdict::Deny("not allowed".to_string()));
    }

    #[test]
    fn warn_threshold_allows_with_a_warning() {
        let policy = AccessPolicy {
            base_row_count: 100,
            max_rows_warn: Some(50),
            max_rows_block: Some(10_000),
            ..Default::default()
        };
        let (verdict, estimated_rows) = policy.validate(&seg(&["x"]));
        assert_eq!(estimated_rows, 100);
        assert!(matches!(verdict, PolicyVerdict::AllowWithWarning(_)));
    }

    #[test]
    fn ownership_walk_overwrites_value_and_provenance_in_lockstep() {
        let mut root = Ownership::default();
        root.accountable_owner = Some("a@x".to_string());
        let mut child = Ownership::default();
        child.accountable_owner = Some("b@x".to_string());

        let resolved =
            ResolvedOwnership::walk([("root", &root), ("root.child", &child)].into_iter());
        assert_eq!(
            resolved.values.get("accountable_owner").map(String::as_str),
            Some("b@x")
        );
        assert_eq!(
            resolved.provenance.get("accountable_owner").map(String::as_str),
            Some("root.child")
        );
    }
}
