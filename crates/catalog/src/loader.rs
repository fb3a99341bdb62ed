use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::LoadError;
use crate::model::CatalogNode;
use crate::registry::Registry;

/// Reads a declarative catalog file whose top level is a bare mapping from
/// path to node specification, and returns the fully-populated nodes.
///
/// Normalization performed here: missing `status` defaults to `active`,
/// missing `classification` to `internal`, a binding's `read_only` defaults
/// to `true`, and a policy's `base_row_count` defaults to 100 -- all via
/// `#[serde(default = ...)]` on [`CatalogNode`] itself, so this function only
/// needs to assign the path key and detect duplicates.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<CatalogNode>, LoadError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    reject_duplicate_top_level_keys(&raw)?;

    let value: serde_yaml::Value =
        serde_yaml::from_str(&raw).map_err(|source| LoadError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;

    let mapping = value.as_mapping().ok_or_else(|| LoadError::NotAMapping(
        path.display().to_string(),
    ))?;

    let mut nodes = Vec::with_capacity(mapping.len());
    for (key, node_value) in mapping {
        let key = key
            .as_str()
            .ok_or_else(|| LoadError::NotAMapping(format!("{key:?}")))?
            .to_string();

        let mut node: CatalogNode =
            serde_yaml::from_value(node_value.clone()).map_err(|source| LoadError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;
        node.path = key;
        nodes.push(node);
    }

    Ok(nodes)
}

/// Top-level mapping keys in the declarative format are written unindented
/// (column 0). Duplicate top-level keys are a fatal parse error, which a
/// round-trip through `serde_yaml::Value` alone cannot detect -- its backing
/// map silently keeps the last occurrence. This scans the raw text for
/// unindented `key:` lines before parsing.
fn reject_duplicate_top_level_keys(raw: &str) -> Result<(), LoadError> {
    let mut seen = HashSet::new();
    for line in raw.lines() {
        if line.is_empty() || line.starts_with(['#', ' ', '\t', '-']) {
            continue;
        }
        let Some((key, _)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().trim_matches(['"', '\'']).to_string();
        if key.is_empty() {
            continue;
        }
        if !seen.insert(key.clone()) {
            return Err(LoadError::DuplicateKey(key));
        }
    }
    Ok(())
}

/// Background task that re-reads `path` at `interval` and calls
/// `atomic_replace` on `registry`. If parsing fails, the previous snapshot
/// is retained and the failure is logged; the service keeps serving.
/// `cancel` is the same token the HTTP surface cancels on shutdown (spec
/// §5: "each inbound request carries a cancellation signal" -- the
/// reloader is not a request, but it shares the same propagate-and-abandon
/// discipline rather than a bespoke stop flag).
pub async fn reload_loop(
    registry: Arc<Registry>,
    path: PathBuf,
    interval: std::time::Duration,
    cancel: tokio_util::sync::CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = reload_once(&registry, &path) {
                    tracing::warn!(error = %err, path = %path.display(), "catalog reload failed, retaining previous snapshot");
                }
            }
            _ = cancel.cancelled() => {
                tracing::debug!("catalog reload loop shutting down");
                break;
            }
        }
    }
}

/// Performs one synchronous reload, used both by the background loop and by
/// the on-demand `/config/reload` endpoint.
pub fn reload_once(registry: &Registry, path: &Path) -> Result<usize, LoadError> {
    let nodes = load(path)?;
    let count = nodes.len();
    registry
        .atomic_replace(nodes)
        .map_err(|err| LoadError::DuplicateKey(err.to_string()))?;
    tracing::info!(nodes = count, path = %path.display(), "catalog reloaded");
    Ok(count)
}
