use sha2::{Digest, Sha256};

use crate::model::SourceBinding;

/// A deterministic, cross-implementation fingerprint of a [`SourceBinding`],
/// used by external collaborators for change detection.
///
/// Computed as the first 8 bytes of the SHA-256 digest of a canonical JSON
/// serialization of `{source_type, config, allowed_operations, schema,
/// read_only}`: keys sorted lexicographically, no extraneous whitespace.
/// This byte layout is a contract with external systems and must not
/// change.
pub fn fingerprint(binding: &SourceBinding) -> [u8; 8] {
    let canonical = canonical_json(binding);
    let digest = Sha256::digest(canonical.as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

pub fn fingerprint_hex(binding: &SourceBinding) -> String {
    hex::encode(fingerprint(binding))
}

fn canonical_json(binding: &SourceBinding) -> String {
    // serde_json::Value's Map is a BTreeMap by default (no "preserve_order"
    // feature enabled in this workspace), so `to_string` on a `Value` built
    // from sorted fields already yields sorted-key, whitespace-free JSON.
    let value = serde_json::json!({
        "source_type": binding.source_type,
        "config": binding.config,
        "allowed_operations": binding.allowed_operations,
        "schema": binding.schema,
        "read_only": binding.read_only,
    });
    serde_json::to_string(&value).expect("fingerprint input is always serializable")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceType;
    use std::collections::BTreeMap;

    #[test]
    fn fingerprint_is_stable_across_config_key_order() {
        let mut config_a = BTreeMap::new();
        config_a.insert("query".to_string(), serde_json::json!("SELECT 1"));
        config_a.insert("warehouse".to_string(), serde_json::json!("WH"));

        let mut config_b = BTreeMap::new();
        config_b.insert("warehouse".to_string(), serde_json::json!("WH"));
        config_b.insert("query".to_string(), serde_json::json!("SELECT 1"));

        let a = SourceBinding {
            source_type: SourceType::Snowflake,
            config: config_a,
            schema: None,
            read_only: true,
            allowed_operations: vec!["select".to_string()],
        };
        let b = SourceBinding {
            source_type: SourceType::Snowflake,
            config: config_b,
            schema: None,
            read_only: true,
            allowed_operations: vec!["select".to_string()],
        };

        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_changes_with_config() {
        let a = SourceBinding {
            source_type: SourceType::Rest,
            config: BTreeMap::new(),
            schema: None,
            read_only: true,
            allowed_operations: vec![],
        };
        let mut config = BTreeMap::new();
        config.insert("url".to_string(), serde_json::json!("https://example.com"));
        let b = SourceBinding {
            source_type: SourceType::Rest,
            config,
            schema: None,
            read_only: true,
            allowed_operations: vec![],
        };
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
