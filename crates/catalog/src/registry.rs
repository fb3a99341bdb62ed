use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use moniker::MonikerPath;

use crate::error::RegistryError;
use crate::model::{CatalogNode, NodeStatus, Ownership, ResolvedOwnership, SourceBinding};

const AUDIT_LOG_CAPACITY: usize = 2048;

/// One entry in the bounded, in-memory audit ledger consulted by
/// `GET /catalog/<path>/audit`. Never persisted; lost on process restart.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuditEntry {
    pub path: String,
    pub actor: String,
    pub action: String,
    pub detail: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct Stats {
    pub by_status: HashMap<String, usize>,
    pub by_source_type: HashMap<String, usize>,
    pub total: usize,
}

/// An immutable, point-in-time view of the catalog tree. A brand new
/// `Snapshot` is built entirely outside of any lock and then swapped into
/// place in one step, so that readers never observe a partially-updated
/// tree.
///
/// Every read a caller needs to compose a single response should run
/// against one pinned `Arc<Snapshot>` (see [`Registry::pin`]), not against
/// a fresh [`Registry`] call per field -- a reload between two independent
/// `Registry` calls would otherwise let one response mix fields read from
/// two different snapshots.
#[derive(Clone)]
pub struct Snapshot {
    nodes: HashMap<String, CatalogNode>,
    children: HashMap<String, BTreeSet<String>>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            nodes: HashMap::new(),
            children: HashMap::new(),
        }
    }

    fn build(mut nodes: Vec<CatalogNode>) -> Result<Self, RegistryError> {
        let mut by_path = HashMap::with_capacity(nodes.len());
        for node in nodes.drain(..) {
            if by_path.contains_key(&node.path) {
                return Err(RegistryError::DuplicatePath(node.path));
            }
            by_path.insert(node.path.clone(), node);
        }

        let mut children: HashMap<String, BTreeSet<String>> = HashMap::new();
        for path in by_path.keys() {
            let parent = parent_of(path);
            children.entry(parent).or_default().insert(path.clone());
        }

        Ok(Self {
            nodes: by_path,
            children,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the registered node at `path`, or `None` if nothing is
    /// registered there. Never synthesizes a virtual node.
    pub fn get_exact(&self, path: &str) -> Option<CatalogNode> {
        self.nodes.get(path).cloned()
    }

    /// Returns the node at `path`, synthesizing an empty, non-leaf virtual
    /// node if nothing is registered there.
    pub fn lookup(&self, path: &str) -> CatalogNode {
        self.get_exact(path)
            .unwrap_or_else(|| CatalogNode::virtual_node(path))
    }

    /// Direct children of `path`, in canonical sorted order. Only actually
    /// registered nodes appear; virtual nodes never appear in listings.
    pub fn children_of(&self, path: &str) -> Vec<String> {
        self.children
            .get(path)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Resolves the ten ownership fields for `path` by walking the
    /// registered ancestor chain root-to-self, overwriting each field's
    /// value and provenance whenever an ancestor defines it. Independent of
    /// registration order and deterministic given a fixed snapshot.
    pub fn resolve_ownership(&self, path: &str) -> ResolvedOwnership {
        let chain = Registry::ancestor_chain(path);
        let owned: Vec<(String, Ownership)> = chain
            .iter()
            .filter_map(|p| self.nodes.get(p).map(|n| (p.clone(), n.ownership.clone())))
            .collect();
        ResolvedOwnership::walk(owned.iter().map(|(p, o)| (p.as_str(), o)))
    }

    /// Finds the nearest binding for `path`: the exact node's binding if it
    /// has one and its status permits serving it, otherwise the nearest
    /// ancestor's. Returns `(binding, path_where_found)`.
    pub fn find_binding(&self, path: &str) -> Option<(SourceBinding, String)> {
        for candidate in Registry::ancestor_chain(path).into_iter().rev() {
            if let Some(node) = self.nodes.get(&candidate) {
                if node.status.serves_bindings() {
                    if let Some(binding) = &node.binding {
                        return Some((binding.clone(), candidate));
                    }
                }
            }
        }
        None
    }

    /// Case-insensitive substring search over path, display_name,
    /// description, and tags.
    pub fn search(&self, query: &str, limit: usize) -> Vec<CatalogNode> {
        let needle = query.to_ascii_lowercase();
        self.nodes
            .values()
            .filter(|n| {
                n.path.to_ascii_lowercase().contains(&needle)
                    || n.display_name
                        .as_deref()
                        .is_some_and(|s| s.to_ascii_lowercase().contains(&needle))
                    || n.description
                        .as_deref()
                        .is_some_and(|s| s.to_ascii_lowercase().contains(&needle))
                    || n.tags.iter().any(|t| t.to_ascii_lowercase().contains(&needle))
            })
            .sorted_by(|a, b| a.path.cmp(&b.path))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> Stats {
        let by_status = self.nodes.values().map(|n| format!("{:?}", n.status)).counts();
        let by_source_type = self
            .nodes
            .values()
            .filter_map(|n| n.binding.as_ref().map(|b| format!("{:?}", b.source_type)))
            .counts();
        Stats {
            total: self.nodes.len(),
            by_status,
            by_source_type,
        }
    }

    /// Position-based pagination over the lexicographically sorted path
    /// list. Since this runs against one pinned snapshot, a page is always
    /// internally consistent; a cursor handed back to a later call may
    /// still skip or repeat entries if a reload happened in between.
    pub fn paginate(&self, cursor: Option<&str>, limit: usize) -> (Vec<CatalogNode>, Option<String>) {
        let mut paths: Vec<&String> = self.nodes.keys().collect();
        paths.sort();

        let start = match cursor {
            Some(c) => paths.partition_point(|p| p.as_str() <= c),
            None => 0,
        };

        let page: Vec<CatalogNode> = paths
            .iter()
            .skip(start)
            .take(limit)
            .filter_map(|p| self.nodes.get(p.as_str()))
            .cloned()
            .collect();

        let next_cursor = if start + limit < paths.len() {
            page.last().map(|n| n.path.clone())
        } else {
            None
        };

        (page, next_cursor)
    }
}

/// The parent of `p` is `p` with its last `/`- or `.`-delimited segment
/// removed, whichever separator appears last in the string. Root parents
/// yield the empty string. This tolerates catalogs that intermix both
/// separators across a deployment.
pub fn parent_of(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    let parts = MonikerPath::split_any(path);
    if parts.len() < 2 {
        String::new()
    } else {
        parts[0].to_string()
    }
}

/// In-memory store of all catalog nodes: lookup, children enumeration,
/// ancestor walks, ownership resolution with provenance, binding discovery,
/// search, and atomic replacement, all behind a single readers-writer lock.
///
/// The lock guards only a cheaply-clonable `Arc<Snapshot>`, never the tree
/// itself: a reload swaps the `Arc`, so any snapshot a caller has already
/// pinned (via [`Registry::pin`]) keeps serving reads against the tree as
/// it was at pin time, even after the swap.
pub struct Registry {
    snapshot: RwLock<Arc<Snapshot>>,
    audit: RwLock<VecDeque<AuditEntry>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::empty()
    }
}

impl Registry {
    pub fn empty() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot::empty())),
            audit: RwLock::new(VecDeque::new()),
        }
    }

    /// Builds a new snapshot from `nodes` outside of any lock, then swaps it
    /// into place under the write lock in one step.
    pub fn atomic_replace(&self, nodes: Vec<CatalogNode>) -> Result<(), RegistryError> {
        let next = Arc::new(Snapshot::build(nodes)?);
        let mut guard = self.snapshot.write().expect("registry lock poisoned");
        *guard = next;
        drop(guard);
        self.push_audit("<snapshot>", "system", "reload", "atomic snapshot replace");
        Ok(())
    }

    /// Pins the currently-live snapshot for the lifetime of one logical
    /// request. Every read run against the returned handle observes exactly
    /// this snapshot, regardless of any reload that swaps a new one in
    /// while the caller is still working -- the callers composing a
    /// multi-field response (resolve, describe, list, lineage) must pin
    /// once up front and read only through that handle, never mix it with
    /// fresh `Registry` calls.
    pub fn pin(&self) -> Arc<Snapshot> {
        self.snapshot.read().expect("registry lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.pin().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the registered node at `path`, or `None` if nothing is
    /// registered there. Never synthesizes a virtual node.
    pub fn get_exact(&self, path: &str) -> Option<CatalogNode> {
        self.pin().get_exact(path)
    }

    /// Returns the node at `path`, synthesizing an empty, non-leaf virtual
    /// node if nothing is registered there.
    pub fn lookup(&self, path: &str) -> CatalogNode {
        self.pin().lookup(path)
    }

    /// Direct children of `path`, in canonical sorted order. Only actually
    /// registered nodes appear; virtual nodes never appear in listings.
    pub fn children_of(&self, path: &str) -> Vec<String> {
        self.pin().children_of(path)
    }

    /// The ancestor chain of `path`, ordered root to self (inclusive),
    /// computed purely syntactically -- it does not require every ancestor
    /// to have a registered node.
    pub fn ancestor_chain(path: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = path.to_string();
        loop {
            chain.push(current.clone());
            let parent = parent_of(&current);
            if parent.is_empty() || parent == current {
                break;
            }
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Resolves the ten ownership fields for `path` by walking the
    /// registered ancestor chain root-to-self, overwriting each field's
    /// value and provenance whenever an ancestor defines it. Independent of
    /// registration order and deterministic given a fixed snapshot.
    pub fn resolve_ownership(&self, path: &str) -> ResolvedOwnership {
        self.pin().resolve_ownership(path)
    }

    /// Finds the nearest binding for `path`: the exact node's binding if it
    /// has one and its status permits serving it, otherwise the nearest
    /// ancestor's. Returns `(binding, path_where_found)`.
    pub fn find_binding(&self, path: &str) -> Option<(SourceBinding, String)> {
        self.pin().find_binding(path)
    }

    /// Case-insensitive substring search over path, display_name,
    /// description, and tags.
    pub fn search(&self, query: &str, limit: usize) -> Vec<CatalogNode> {
        self.pin().search(query, limit)
    }

    pub fn stats(&self) -> Stats {
        self.pin().stats()
    }

    /// Position-based pagination over the lexicographically sorted path
    /// list. If the snapshot swaps between two separate calls, cursors may
    /// skip or repeat entries; a single call always reads one pinned
    /// snapshot, so one page is always internally consistent.
    pub fn paginate(&self, cursor: Option<&str>, limit: usize) -> (Vec<CatalogNode>, Option<String>) {
        self.pin().paginate(cursor, limit)
    }

    /// Best-effort status mutation of the live snapshot. Applied in place
    /// (copy-on-write against any snapshot a reader has already pinned) and
    /// guaranteed to be discarded by the next successful `atomic_replace`,
    /// since reload always rebuilds the snapshot wholesale from the
    /// declarative source.
    pub fn set_status(
        &self,
        path: &str,
        status: NodeStatus,
        actor: &str,
    ) -> Result<(), RegistryError> {
        let mut guard = self.snapshot.write().expect("registry lock poisoned");
        let snapshot = Arc::make_mut(&mut guard);
        let node = snapshot
            .nodes
            .get_mut(path)
            .ok_or_else(|| RegistryError::NotFound(path.to_string()))?;
        let previous = format!("{:?}", node.status);
        node.status = status;
        drop(guard);
        self.push_audit(
            path,
            actor,
            "set_status",
            &format!("{previous} -> {status:?} (live snapshot only, reverts on next reload)"),
        );
        Ok(())
    }

    pub fn audit_log(&self, path: &str) -> Vec<AuditEntry> {
        self.audit
            .read()
            .expect("audit lock poisoned")
            .iter()
            .filter(|e| e.path == path)
            .cloned()
            .collect()
    }

    fn push_audit(&self, path: &str, actor: &str, action: &str, detail: &str) {
        let mut guard = self.audit.write().expect("audit lock poisoned");
        if guard.len() >= AUDIT_LOG_CAPACITY {
            guard.pop_front();
        }
        guard.push_back(AuditEntry {
            path: path.to_string(),
            actor: actor.to_string(),
            action: action.to_string(),
            detail: detail.to_string(),
            at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceBinding;

    fn node(path: &str) -> CatalogNode {
        CatalogNode {
            path: path.to_string(),
            display_name: None,
            description: None,
            classification: "internal".to_string(),
            tags: vec![],
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

    #[test]
    fn parent_computation_tolerates_both_separators() {
        assert_eq!(parent_of("analytics.risk/var"), "analytics.risk");
        assert_eq!(parent_of("analytics/risk.var"), "analytics/risk");
        assert_eq!(parent_of("root"), "");
        assert_eq!(parent_of(""), "");
    }

    #[test]
    fn children_index_matches_parent_computation() {
        let reg = Registry::empty();
        reg.atomic_replace(vec![node("a"), node("a.b"), node("a.b.c")])
            .unwrap();
        assert_eq!(reg.children_of("a"), vec!["a.b".to_string()]);
        assert_eq!(reg.children_of("a.b"), vec!["a.b.c".to_string()]);
    }

    #[test]
    fn ownership_independent_of_registration_order() {
        let mut parent = node("benchmarks");
        parent.ownership.accountable_owner = Some("a@x".to_string());
        let mut child = node("benchmarks.constituents");
        child.ownership.data_specialist = Some("b@x".to_string());

        let reg1 = Registry::empty();
        reg1.atomic_replace(vec![parent.clone(), child.clone()]).unwrap();

        let reg2 = Registry::empty();
        reg2.atomic_replace(vec![child, parent]).unwrap();

        let r1 = reg1.resolve_ownership("benchmarks.constituents");
        let r2 = reg2.resolve_ownership("benchmarks.constituents");
        assert_eq!(r1.values, r2.values);
        assert_eq!(r1.provenance, r2.provenance);
        assert_eq!(
            r1.provenance.get("accountable_owner").map(String::as_str),
            Some("benchmarks")
        );
        assert_eq!(
            r1.provenance.get("data_specialist").map(String::as_str),
            Some("benchmarks.constituents")
        );
        assert!(!r1.values.contains_key("support_channel"));
    }

    #[test]
    fn duplicate_path_within_snapshot_is_rejected() {
        let reg = Registry::empty();
        let err = reg.atomic_replace(vec![node("a"), node("a")]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicatePath(_)));
    }

    #[test]
    fn virtual_nodes_are_never_listed() {
        let reg = Registry::empty();
        reg.atomic_replace(vec![node("a")]).unwrap();
        assert!(reg.get_exact("a.missing").is_none());
        let v = reg.lookup("a.missing");
        assert!(!v.is_leaf);
        assert!(v.binding.is_none());
        assert!(reg.children_of("a.missing").is_empty());
    }

    #[test]
    fn binding_discovery_skips_archived_ancestor() {
        let mut archived = node("a");
        archived.status = NodeStatus::Archived;
        archived.binding = Some(SourceBinding {
            source_type: crate::model::SourceType::Snowflake,
            config: Default::default(),
            schema: None,
            read_only: true,
            allowed_operations: vec![],
        });
        let child = node("a.b");

        let reg = Registry::empty();
        reg.atomic_replace(vec![archived, child]).unwrap();
        assert!(reg.find_binding("a.b").is_none());
    }

    #[test]
    fn atomic_replace_is_fully_visible_or_not_at_all() {
        let reg = Registry::empty();
        reg.atomic_replace(vec![node("a")]).unwrap();
        assert!(reg.get_exact("a").is_some());
        reg.atomic_replace(vec![node("b")]).unwrap();
        assert!(reg.get_exact("a").is_none());
        assert!(reg.get_exact("b").is_some());
    }

    #[test]
    fn a_pinned_snapshot_is_unaffected_by_a_later_reload() {
        let reg = Registry::empty();
        reg.atomic_replace(vec![node("a")]).unwrap();

        let pinned = reg.pin();
        reg.atomic_replace(vec![node("b")]).unwrap();

        assert!(pinned.get_exact("a").is_some());
        assert!(pinned.get_exact("b").is_none());
        assert!(reg.get_exact("a").is_none());
        assert!(reg.get_exact("b").is_some());
    }

    #[test]
    fn set_status_does_not_mutate_an_already_pinned_snapshot() {
        let reg = Registry::empty();
        reg.atomic_replace(vec![node("a")]).unwrap();

        let pinned = reg.pin();
        reg.set_status("a", NodeStatus::Archived, "operator").unwrap();

        assert_eq!(pinned.get_exact("a").unwrap().status, NodeStatus::Active);
        assert_eq!(reg.get_exact("a").unwrap().status, NodeStatus::Archived);
    }
}
