use std::collections::BTreeMap;

use catalog::{
    CatalogNode, NodeStatus, PolicyVerdict, Registry, ResolvedOwnership, Snapshot, SourceBinding,
};
use moniker::{Moniker, VersionType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::ResolverError;

const MAX_SUCCESSOR_HOPS: u32 = 5;

/// Identity of the caller making a request. The engine records who asked;
/// it never enforces identity -- authentication and authorization happen
/// upstream of this crate.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
}

impl Default for Caller {
    fn default() -> Self {
        Self {
            user_id: "anonymous".to_string(),
        }
    }
}

/// A binding rendered for the HTTP surface: connection config with the
/// `query` key pulled out and templated separately.
#[derive(Debug, Serialize)]
pub struct RenderedSource {
    pub source_type: catalog::SourceType,
    pub connection: BTreeMap<String, serde_json::Value>,
    pub query: Option<String>,
    pub params: BTreeMap<String, String>,
    pub schema: Option<serde_json::Value>,
    pub read_only: bool,
}

#[derive(Debug, Serialize)]
pub struct ResolveResult {
    pub moniker: String,
    pub path: String,
    pub source: RenderedSource,
    pub ownership: ResolvedOwnership,
    pub node: CatalogNode,
    pub binding_path: String,
    pub sub_path: Option<String>,
    pub redirected_from: Option<String>,
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DescribeResult {
    pub node: CatalogNode,
    pub ownership: ResolvedOwnership,
    pub moniker: String,
    pub path: String,
    pub has_source_binding: bool,
    pub source_type: Option<catalog::SourceType>,
}

#[derive(Debug, Serialize)]
pub struct ListResult {
    pub children: Vec<String>,
    pub moniker: String,
    pub path: String,
    pub ownership: ResolvedOwnership,
}

#[derive(Debug, Serialize)]
pub struct LineageResult {
    pub chain: Vec<String>,
    pub ownership: ResolvedOwnership,
}

/// The resolution engine: given a parsed moniker, walks the catalog tree to
/// find a binding, follows deprecation successors, validates an access
/// policy, renders a query template, and composes ownership provenance.
pub struct Resolver<'a> {
    registry: &'a Registry,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, raw: &str, _caller: &Caller) -> Result<ResolveResult, ResolverError> {
        let moniker = Moniker::parse(raw, true)?;
        let requested_path = moniker.path.to_string();

        // Pin one snapshot for the whole request: every read below runs
        // against this exact tree, so a reload racing this request can
        // never compose a response from two different snapshots.
        let snapshot = self.registry.pin();

        let (initial_binding, initial_binding_path) = snapshot
            .find_binding(&requested_path)
            .ok_or_else(|| ResolverError::NotFound {
                path: requested_path.clone(),
            })?;

        let chase = self.chase_successors(&snapshot, &initial_binding_path);

        let (effective_path, binding, binding_path, redirected_from) = match chase {
            Some((new_path, binding, binding_path)) => {
                (new_path, binding, binding_path, Some(requested_path.clone()))
            }
            None => (
                requested_path.clone(),
                initial_binding,
                initial_binding_path,
                None,
            ),
        };

        let binding_node = snapshot.get_exact(&binding_path);
        let mut warning = None;
        if let Some(node) = &binding_node {
            if let Some(policy) = &node.policy {
                let (verdict, estimated_rows) = policy.validate(moniker.path.segments());
                match verdict {
                    PolicyVerdict::Deny(message) => {
                        return Err(ResolverError::AccessDenied {
                            message,
                            estimated_rows,
                        })
                    }
                    PolicyVerdict::AllowWithWarning(message) => warning = Some(message),
                    PolicyVerdict::Allow => {}
                }
            }
        }

        let rendered = render_source(&binding, &moniker);

        let sub_path = strip_prefix(&effective_path, &binding_path);

        let ownership = snapshot.resolve_ownership(&effective_path);
        let node = snapshot.lookup(&effective_path);

        Ok(ResolveResult {
            moniker: moniker.to_canonical_string(),
            path: effective_path,
            source: rendered,
            ownership,
            node,
            binding_path,
            sub_path,
            redirected_from,
            warning,
        })
    }

    /// Follows a chain of `successor` pointers starting from the node at
    /// `start_path`, bounded at [`MAX_SUCCESSOR_HOPS`]. Returns
    /// `Some((new_path, binding, binding_path))` if the chase landed on a
    /// fresh, valid binding; `None` if no chase was needed or the chase
    /// found nothing (in which case the caller keeps the original binding).
    /// Reads only `snapshot`, the one pinned for the enclosing request.
    fn chase_successors(
        &self,
        snapshot: &Snapshot,
        start_path: &str,
    ) -> Option<(String, SourceBinding, String)> {
        let mut node = snapshot.get_exact(start_path)?;
        if node.status != NodeStatus::Deprecated {
            return None;
        }

        let mut hops = 0u32;
        let mut next_path = node.successor.clone()?;

        loop {
            if hops >= MAX_SUCCESSOR_HOPS {
                tracing::debug!(start_path, "successor chase exceeded hop bound, aborting");
                return None;
            }
            hops += 1;

            let next_node = snapshot.get_exact(&next_path);
            let still_chasing = next_node
                .as_ref()
                .map(|n| n.status == NodeStatus::Deprecated && n.successor.is_some())
                .unwrap_or(false);

            if !still_chasing {
                return snapshot
                    .find_binding(&next_path)
                    .map(|(binding, binding_path)| (next_path.clone(), binding, binding_path));
            }

            node = next_node.unwrap();
            next_path = node.successor.clone().unwrap();
        }
    }

    pub fn describe(&self, raw: &str) -> Result<DescribeResult, ResolverError> {
        let moniker = Moniker::parse(raw, true)?;
        let path = moniker.path.to_string();
        let snapshot = self.registry.pin();
        let node = snapshot.lookup(&path);
        let ownership = snapshot.resolve_ownership(&path);
        let source_type = node.binding.as_ref().map(|b| b.source_type);
        Ok(DescribeResult {
            has_source_binding: node.binding.is_some(),
            source_type,
            node,
            ownership,
            moniker: moniker.to_canonical_string(),
            path,
        })
    }

    pub fn list(&self, raw: &str) -> Result<ListResult, ResolverError> {
        let moniker = Moniker::parse(raw, true)?;
        let path = moniker.path.to_string();
        let snapshot = self.registry.pin();
        let children = snapshot.children_of(&path);
        let ownership = snapshot.resolve_ownership(&path);
        Ok(ListResult {
            children,
            moniker: moniker.to_canonical_string(),
            path,
            ownership,
        })
    }

    pub fn lineage(&self, raw: &str) -> Result<LineageResult, ResolverError> {
        let moniker = Moniker::parse(raw, true)?;
        let path = moniker.path.to_string();
        let chain = Registry::ancestor_chain(&path);
        let snapshot = self.registry.pin();
        let ownership = snapshot.resolve_ownership(&path);
        Ok(LineageResult { chain, ownership })
    }
}

fn strip_prefix(path: &str, binding_path: &str) -> Option<String> {
    if path == binding_path {
        return None;
    }
    let prefix = format!("{binding_path}/");
    path.strip_prefix(&prefix).map(str::to_string)
}

static SEGMENT_PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{segments\[(\d+)\]\}").unwrap());

/// Minimal placeholder substitution for a binding's query template. Dialect
/// specific placeholders (`{segments[N]:date}`, `{filter[N]:column}`,
/// `{lookback_start_sql}`, `{date_filter:column}`) are reserved and left
/// untouched so a downstream dialect renderer can expand them -- the core
/// stays free of SQL knowledge.
fn render_source(binding: &SourceBinding, moniker: &Moniker) -> RenderedSource {
    let connection: BTreeMap<String, serde_json::Value> = binding
        .config
        .iter()
        .filter(|(k, _)| k.as_str() != "query")
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let query = binding.query_template().map(|template| {
        let segments = moniker.path.segments();
        let substituted = SEGMENT_PLACEHOLDER_RE.replace_all(template, |caps: &regex::Captures| {
            let idx: usize = caps[1].parse().unwrap_or(usize::MAX);
            segments.get(idx).cloned().unwrap_or_default()
        });

        let version_date = match &moniker.version_type {
            Some(VersionType::Date) => moniker.version.clone().unwrap_or_default(),
            _ => "{version_date}".to_string(),
        };
        let substituted = if moniker.version_type == Some(VersionType::Date) {
            substituted.replace("{version_date}", &version_date)
        } else {
            substituted.to_string()
        };

        let is_latest = matches!(moniker.version_type, Some(VersionType::Latest));
        substituted.replace("{is_latest}", if is_latest { "true" } else { "false" })
    });

    RenderedSource {
        source_type: binding.source_type,
        connection,
        query,
        params: moniker.params.clone(),
        schema: binding.schema.clone(),
        read_only: binding.read_only,
    }
}
