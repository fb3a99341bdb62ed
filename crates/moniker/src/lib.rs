//! Grammar and parser for hierarchical data-asset monikers.
//!
//! A moniker is an opaque, hierarchical identifier for a data asset, with an
//! optional namespace, version, sub-resource, revision, and query
//! parameters. See the crate's tests for the canonical worked examples.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

mod error;
pub use error::ParseError;

static SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]{0,127}$").unwrap());
static NAMESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_\-]{0,63}$").unwrap());
static REVISION_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)/v(\d+)$").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{8}$").unwrap());
static LOOKBACK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(\d+)([ymwd])$").unwrap());

const SCHEME: &str = "moniker://";

/// An ordered sequence of path segments, the hierarchical part of a moniker.
///
/// Segments are non-empty strings matching `[A-Za-z0-9][A-Za-z0-9_.\-]{0,127}`.
/// `/` and `.` are both accepted as separators when splitting a raw string
/// into segments for ancestor walks (see [`MonikerPath::split_any`]); the
/// canonical string form always joins with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonikerPath(Vec<String>);

impl MonikerPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses segments strictly from `/`-joined input, validating each one.
    pub fn parse(s: &str, validate: bool) -> Result<Self, ParseError> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        let segments: Vec<String> = s.split('/').map(|p| p.to_string()).collect();
        if validate {
            for seg in &segments {
                if !SEGMENT_RE.is_match(seg) {
                    return Err(ParseError::InvalidSegment(seg.clone()));
                }
            }
        }
        Ok(Self(segments))
    }

    /// Splits a raw hierarchy string on whichever of `/` or `.` appears
    /// last, tolerating catalogs that intermix both separators. Used by the
    /// registry's parent-computation helper, not by the moniker grammar
    /// itself.
    pub fn split_any(s: &str) -> Vec<&str> {
        let last_slash = s.rfind('/');
        let last_dot = s.rfind('.');
        match (last_slash, last_dot) {
            (None, None) => vec![s],
            (Some(i), None) => split_at(s, i),
            (None, Some(i)) => split_at(s, i),
            (Some(i), Some(j)) => split_at(s, i.max(j)),
        }
    }
}

fn split_at(s: &str, idx: usize) -> Vec<&str> {
    vec![&s[..idx], &s[idx + 1..]]
}

impl fmt::Display for MonikerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Classification of a parsed `version` token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionType {
    Date,
    Lookback { value: u64, unit: char },
    Frequency,
    Latest,
    All,
    Custom,
}

impl VersionType {
    fn classify(version: &str) -> Self {
        let lower = version.to_ascii_lowercase();
        if lower == "latest" {
            VersionType::Latest
        } else if lower == "all" {
            VersionType::All
        } else if matches!(lower.as_str(), "daily" | "weekly" | "monthly") {
            VersionType::Frequency
        } else if DATE_RE.is_match(version) {
            VersionType::Date
        } else if let Some(caps) = LOOKBACK_RE.captures(version) {
            let value: u64 = caps[1].parse().unwrap_or(0);
            let unit = caps[2].chars().next().unwrap().to_ascii_uppercase();
            VersionType::Lookback { value, unit }
        } else {
            VersionType::Custom
        }
    }
}

/// A fully parsed moniker reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moniker {
    pub path: MonikerPath,
    pub namespace: Option<String>,
    pub version: Option<String>,
    pub version_type: Option<VersionType>,
    pub sub_resource: Option<String>,
    pub revision: Option<u32>,
    pub params: BTreeMap<String, String>,
}

impl Moniker {
    /// Parses `s` into a `Moniker`. Accepts a `moniker://` prefix or bare
    /// form; rejects any other scheme. `validate` controls whether path
    /// segments and the namespace are checked against their grammars.
    pub fn parse(s: &str, validate: bool) -> Result<Self, ParseError> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }

        let body_with_scheme = if let Some(rest) = s.strip_prefix(SCHEME) {
            rest
        } else if s.contains("://") {
            return Err(ParseError::InvalidScheme);
        } else {
            s
        };
        if body_with_scheme.is_empty() {
            return Err(ParseError::Empty);
        }

        let (body, query_string) = match body_with_scheme.split_once('?') {
            Some((b, q)) => (b, Some(q)),
            None => (body_with_scheme, None),
        };

        // Step 2: namespace is the prefix before the first `@`, but only if
        // a `/` exists later in the string and that `@` precedes it. With no
        // `/` at all, the `@` precedes nothing and belongs to step 4 instead.
        let first_at = body.find('@');
        let first_slash = body.find('/');
        let (namespace, rest) = match first_at {
            Some(at_idx) if first_slash.is_some_and(|slash_idx| at_idx < slash_idx) => {
                let ns = &body[..at_idx];
                if validate && !NAMESPACE_RE.is_match(ns) {
                    return Err(ParseError::InvalidNamespace(ns.to_string()));
                }
                (Some(ns.to_string()), &body[at_idx + 1..])
            }
            _ => (None, body),
        };

        // Step 3: strip a trailing, case-insensitive `/vN` revision suffix.
        let (residual, revision) = match REVISION_SUFFIX_RE.captures(rest) {
            Some(caps) => {
                let whole = caps.get(0).unwrap();
                let n: u32 = caps[1]
                    .parse()
                    .map_err(|_| ParseError::InvalidRevision(caps[1].to_string()))?;
                (&rest[..whole.start()], Some(n))
            }
            None => (rest, None),
        };

        // Step 4: the last `@` in the residual, if any, separates path from
        // version (and, transitively, sub_resource).
        let (path_part, version, sub_resource) = match residual.rfind('@') {
            Some(at_idx) => {
                let path_part = &residual[..at_idx];
                let version_tail = &residual[at_idx + 1..];
                match version_tail.split_once('/') {
                    Some((version, sub)) => (path_part, Some(version.to_string()), Some(sub.to_string())),
                    None => (path_part, Some(version_tail.to_string()), None),
                }
            }
            None => (residual, None, None),
        };

        if path_part.is_empty() {
            return Err(ParseError::Empty);
        }
        let path = MonikerPath::parse(path_part, validate)?;

        if let Some(sub) = &sub_resource {
            if validate {
                for slash_part in sub.split('/') {
                    for dot_part in slash_part.split('.') {
                        if !SEGMENT_RE.is_match(dot_part) {
                            return Err(ParseError::InvalidSubResource(sub.clone()));
                        }
                    }
                }
            }
        }

        let params = match query_string {
            Some(qs) => parse_query(qs),
            None => BTreeMap::new(),
        };

        let version_type = version.as_deref().map(VersionType::classify);

        Ok(Moniker {
            path,
            namespace,
            version,
            version_type,
            sub_resource,
            revision,
            params,
        })
    }

    /// Renders the canonical string form of this moniker.
    pub fn to_canonical_string(&self) -> String {
        let mut out = String::from(SCHEME);
        if let Some(ns) = &self.namespace {
            out.push_str(ns);
            out.push('@');
        }
        out.push_str(&self.path.to_string());
        if let Some(v) = &self.version {
            out.push('@');
            out.push_str(v);
        }
        if let Some(sub) = &self.sub_resource {
            out.push('/');
            out.push_str(sub);
        }
        if let Some(rev) = self.revision {
            out.push_str("/v");
            out.push_str(&rev.to_string());
        }
        if !self.params.is_empty() {
            out.push('?');
            let pairs: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            out.push_str(&pairs.join("&"));
        }
        out
    }
}

impl fmt::Display for Moniker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

fn parse_query(qs: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for pair in qs.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        map.entry(k.to_string()).or_insert_with(|| v.to_string());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_path_no_version_no_namespace() {
        let m = Moniker::parse("moniker://indices.sov/dev/EUR/ALL", true).unwrap();
        assert_eq!(
            m.path.segments(),
            &["indices.sov", "dev", "EUR", "ALL"]
        );
        assert!(m.namespace.is_none());
        assert!(m.version.is_none());
    }

    #[test]
    fn namespace_and_latest_version() {
        let m = Moniker::parse("verified@ref.sec/ISIN/US0378331005@latest", true).unwrap();
        assert_eq!(m.namespace.as_deref(), Some("verified"));
        assert_eq!(m.path.to_string(), "ref.sec/ISIN/US0378331005");
        assert_eq!(m.version.as_deref(), Some("latest"));
        assert_eq!(m.version_type, Some(VersionType::Latest));
    }

    #[test]
    fn at_sign_with_no_slash_is_a_version_not_a_namespace() {
        let m = Moniker::parse("foo@bar", true).unwrap();
        assert!(m.namespace.is_none());
        assert_eq!(m.path.to_string(), "foo");
        assert_eq!(m.version.as_deref(), Some("bar"));
    }

    #[test]
    fn date_version_with_revision() {
        let m = Moniker::parse("commodities.der/crypto/ETH@20260115/v2", true).unwrap();
        assert!(m.namespace.is_none());
        assert_eq!(m.version.as_deref(), Some("20260115"));
        assert_eq!(m.version_type, Some(VersionType::Date));
        assert_eq!(m.revision, Some(2));
    }

    #[test]
    fn lookback_version() {
        let m = Moniker::parse("prices.eq/AAPL@3M", true).unwrap();
        assert_eq!(m.version.as_deref(), Some("3M"));
        assert_eq!(
            m.version_type,
            Some(VersionType::Lookback { value: 3, unit: 'M' })
        );
    }

    #[test]
    fn sub_resource_with_dots() {
        let m = Moniker::parse(
            "sec/012345678@20260101/details.corporate.actions",
            true,
        )
        .unwrap();
        assert_eq!(m.sub_resource.as_deref(), Some("details.corporate.actions"));
        assert_eq!(m.version_type, Some(VersionType::Date));
    }

    #[test]
    fn rejects_non_moniker_scheme() {
        assert!(matches!(
            Moniker::parse("https://example.com/foo", true),
            Err(ParseError::InvalidScheme)
        ));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(Moniker::parse("", true), Err(ParseError::Empty)));
    }

    #[test]
    fn bare_form_without_scheme_prefix() {
        let m = Moniker::parse("benchmarks.constituents/SP500/20260101", true).unwrap();
        assert_eq!(
            m.path.segments(),
            &["benchmarks.constituents", "SP500", "20260101"]
        );
    }

    #[test]
    fn query_params_first_value_wins() {
        let m = Moniker::parse("moniker://a/b?x=1&y=2&x=3", true).unwrap();
        assert_eq!(m.params.get("x").map(String::as_str), Some("1"));
        assert_eq!(m.params.get("y").map(String::as_str), Some("2"));
    }

    #[test]
    fn round_trip_modulo_param_order() {
        for raw in [
            "moniker://indices.sov/dev/EUR/ALL",
            "moniker://verified@ref.sec/ISIN/US0378331005@latest",
            "moniker://commodities.der/crypto/ETH@20260115/v2",
            "moniker://prices.eq/AAPL@3M",
        ] {
            let parsed = Moniker::parse(raw, true).unwrap();
            let canonical = parsed.to_canonical_string();
            let reparsed = Moniker::parse(&canonical, true).unwrap();
            assert_eq!(parsed, reparsed);
        }
    }

    #[test]
    fn invalid_segment_is_rejected() {
        let err = Moniker::parse("moniker://has space/here", true).unwrap_err();
        assert!(matches!(err, ParseError::InvalidSegment(_)));
    }
}
