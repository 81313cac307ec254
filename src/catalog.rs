//! Catalog resolver (spec §4.6 "Catalog").
//!
//! A tree of JSON nodes fetched over HTTP; resolution walks a URI path
//! like `tag:example.org,2012:cassini/survey` down the tree, backtracking
//! on ambiguous child-prefix matches, and memoises resolved children —
//! grounded on the teacher's `DatabaseManager` name→entry resolution
//! (`database_manager.rs`) plus the retry-loop style of the address
//! cache for the root-URL fallback.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::credentials::CredentialsManager;
use crate::error::{DasError, Result};
use crate::http;

/// The two built-in catalog root URLs tried in order (spec §4.6).
pub const BUILTIN_ROOTS: [&str; 2] = [
    "https://das2.org/catalog/das2.json",
    "https://das2.org/catalog/das2_mirror.json",
];

const BASE_TIMEOUT: Duration = Duration::from_millis(500);
const MAX_ATTEMPTS_PER_ROOT: u32 = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogNode {
    #[serde(rename = "TYPE")]
    pub node_type: String,
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "TITLE", default)]
    pub title: Option<String>,
    #[serde(rename = "URLS", default)]
    pub urls: Vec<String>,
    #[serde(rename = "SUB_PATHS", default)]
    pub sub_paths: HashMap<String, CatalogNode>,
    #[serde(rename = "SOURCES", default)]
    pub sources: HashMap<String, CatalogNode>,
    #[serde(rename = "PATH_SEPARATOR", default = "default_separator")]
    pub path_separator: String,
}

fn default_separator() -> String {
    "/".to_string()
}

impl CatalogNode {
    fn children(&self) -> impl Iterator<Item = (&String, &CatalogNode)> {
        self.sub_paths.iter().chain(self.sources.iter())
    }

    /// Resolve a full chain of path segments against this node, recursing
    /// into every candidate child and backing out of any branch that
    /// cannot complete the remaining path (spec §4.6 "ambiguous
    /// child-prefix cases", spec §8 scenario 6). An exact name match is
    /// tried first; if it exists but cannot complete the remaining path,
    /// every other child whose name has `segment` as a prefix is tried in
    /// turn. Resolution succeeds only if exactly one candidate, across
    /// exact and prefix matches, can complete the whole remaining chain.
    fn resolve_path<'a>(&'a self, segments: &[&str]) -> Result<&'a CatalogNode> {
        let (segment, rest) = match segments.split_first() {
            None => return Ok(self),
            Some(pair) => pair,
        };
        if let Some((_, child)) = self.children().find(|(name, _)| name.as_str() == *segment) {
            if let Ok(found) = child.resolve_path(rest) {
                return Ok(found);
            }
        }
        let mut successes = Vec::new();
        for (name, child) in self.children() {
            if name == segment || !name.starts_with(segment) {
                continue;
            }
            if let Ok(found) = child.resolve_path(rest) {
                successes.push(found);
            }
        }
        match successes.len() {
            0 => Err(DasError::NotFound(format!("no catalog child completes path at '{segment}'"))),
            1 => Ok(successes[0]),
            _ => Err(DasError::InvalidArgument(format!("ambiguous catalog prefix '{segment}'"))),
        }
    }
}

/// Resolves dotted/slash catalog paths against a root node, memoising
/// resolved nodes by their full path (spec §4.6 "memoises resolved
/// children").
pub struct Catalog {
    root: CatalogNode,
    memo: HashMap<String, CatalogNode>,
}

impl Catalog {
    pub fn from_root(root: CatalogNode) -> Self {
        Catalog { root, memo: HashMap::new() }
    }

    /// Fetch a root catalog JSON document over HTTP, trying each of the
    /// built-in roots with an exponentially increasing connect timeout
    /// (spec §4.6) until one succeeds.
    pub fn fetch_root(credentials: &mut CredentialsManager) -> Result<Catalog> {
        let mut last_err = None;
        for root_url in BUILTIN_ROOTS {
            let mut timeout = BASE_TIMEOUT;
            for _ in 0..MAX_ATTEMPTS_PER_ROOT {
                match fetch_json_node(root_url, credentials, timeout) {
                    Ok(node) => return Ok(Catalog::from_root(node)),
                    Err(e) => {
                        last_err = Some(e);
                        timeout *= 2;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| DasError::NotFound("no catalog root reachable".into())))
    }

    /// Resolve a `tag:...` catalog path down the tree: the leading
    /// `tag:authority,date:` token (if present) names the root itself and
    /// is not further segmented, slashes after it delimit each descent
    /// step. Backs out of an ambiguous-prefix branch that cannot complete
    /// the remaining path (spec §4.6).
    pub fn resolve(&mut self, path: &str) -> Result<&CatalogNode> {
        if let Some(cached) = self.memo.get(path) {
            // re-borrow through the map to satisfy the borrow checker
            // without cloning on the cache-hit path.
            return Ok(self.memo.get(path).unwrap_or(cached));
        }
        let without_tag = match path.strip_prefix("tag:") {
            Some(rest) => match rest.find('/') {
                Some(idx) => &rest[idx + 1..],
                None => "",
            },
            None => path,
        };
        let segments: Vec<&str> = without_tag.split('/').filter(|s| !s.is_empty()).collect();
        let node = self.root.resolve_path(&segments)?;
        let resolved = node.clone();
        self.memo.insert(path.to_string(), resolved);
        Ok(self.memo.get(path).unwrap())
    }
}

fn fetch_json_node(url: &str, credentials: &mut CredentialsManager, timeout: Duration) -> Result<CatalogNode> {
    let response = http::get(url, credentials, Some(timeout))?;
    let node: CatalogNode = serde_json::from_reader(response.body)?;
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str) -> CatalogNode {
        CatalogNode {
            node_type: "HttpStreamSrc".into(),
            name: name.into(),
            title: None,
            urls: vec![format!("https://example.org/{name}")],
            sub_paths: HashMap::new(),
            sources: HashMap::new(),
            path_separator: "/".into(),
        }
    }

    fn branch(name: &str, children: Vec<(&str, CatalogNode)>) -> CatalogNode {
        CatalogNode {
            node_type: "Catalog".into(),
            name: name.into(),
            title: None,
            urls: Vec::new(),
            sub_paths: children.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            sources: HashMap::new(),
            path_separator: "/".into(),
        }
    }

    #[test]
    fn resolves_exact_path() {
        let root = branch("root", vec![("cassini", branch("cassini", vec![("survey", leaf("survey"))]))]);
        let mut cat = Catalog::from_root(root);
        let node = cat.resolve("cassini/survey").unwrap();
        assert_eq!(node.name, "survey");
    }

    #[test]
    fn resolves_unambiguous_prefix() {
        let root = branch("root", vec![("cassini", leaf("cassini"))]);
        let mut cat = Catalog::from_root(root);
        let node = cat.resolve("cass").unwrap();
        assert_eq!(node.name, "cassini");
    }

    #[test]
    fn ambiguous_prefix_with_no_disambiguating_suffix_errors() {
        // both candidates are terminal leaves and the remaining path is
        // empty, so backtracking cannot eliminate either one: this stays
        // genuinely ambiguous.
        let root = branch("root", vec![("cassini", leaf("cassini")), ("casper", leaf("casper"))]);
        let mut cat = Catalog::from_root(root);
        assert!(cat.resolve("cas").is_err());
    }

    /// Spec §8 scenario 6: `survey` and `survey_keyparams` both match the
    /// prefix `surv`, but only `survey` has a `das2` child — resolution
    /// must recurse into each candidate and back out of the one that
    /// can't complete the remaining path, rather than erroring on the
    /// prefix ambiguity alone.
    #[test]
    fn ambiguous_prefix_is_resolved_by_backtracking_into_the_completing_child() {
        let root = branch(
            "root",
            vec![(
                "cassini",
                branch(
                    "cassini",
                    vec![
                        ("survey", branch("survey", vec![("das2", leaf("das2"))])),
                        ("survey_keyparams", leaf("survey_keyparams")),
                    ],
                ),
            )],
        );
        let mut cat = Catalog::from_root(root);
        let node = cat.resolve("cassini/surv/das2").unwrap();
        assert_eq!(node.name, "das2");
    }

    #[test]
    fn ambiguous_prefix_where_every_candidate_completes_still_errors() {
        let root = branch(
            "root",
            vec![
                ("survey", branch("survey", vec![("das2", leaf("das2"))])),
                ("survey_keyparams", branch("survey_keyparams", vec![("das2", leaf("das2"))])),
            ],
        );
        let mut cat = Catalog::from_root(root);
        assert!(cat.resolve("surv/das2").is_err());
    }

    #[test]
    fn missing_segment_errors() {
        let root = branch("root", vec![("cassini", leaf("cassini"))]);
        let mut cat = Catalog::from_root(root);
        assert!(cat.resolve("voyager").is_err());
    }

    #[test]
    fn resolve_strips_leading_tag_authority_token() {
        let root = branch("root", vec![("cassini", branch("cassini", vec![("survey", leaf("survey"))]))]);
        let mut cat = Catalog::from_root(root);
        let node = cat.resolve("tag:example.org,2012:/cassini/survey").unwrap();
        assert_eq!(node.name, "survey");
    }

    #[test]
    fn repeated_resolve_uses_memo() {
        let root = branch("root", vec![("cassini", leaf("cassini"))]);
        let mut cat = Catalog::from_root(root);
        let first = cat.resolve("cassini").unwrap().name.clone();
        let second = cat.resolve("cassini").unwrap().name.clone();
        assert_eq!(first, second);
    }
}
