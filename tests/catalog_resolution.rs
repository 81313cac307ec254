//! Integration test: catalog path resolution against an in-memory node
//! tree, including prefix ambiguity and memoisation, without any network
//! dependency (the root node is constructed directly rather than fetched).

use std::collections::HashMap;

use das::catalog::{Catalog, CatalogNode};

fn leaf(name: &str) -> CatalogNode {
    CatalogNode {
        node_type: "HttpStreamSrc".into(),
        name: name.into(),
        title: None,
        urls: vec![format!("https://example.org/{name}.dsdf")],
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

fn sample_root() -> CatalogNode {
    branch(
        "root",
        vec![(
            "cassini",
            branch("cassini", vec![("survey", leaf("survey")), ("survey_details", leaf("survey_details"))]),
        )],
    )
}

#[test]
fn resolves_multi_level_exact_path() {
    let mut cat = Catalog::from_root(sample_root());
    let node = cat.resolve("cassini/survey").unwrap();
    assert_eq!(node.node_type, "HttpStreamSrc");
    assert_eq!(node.urls[0], "https://example.org/survey.dsdf");
}

#[test]
fn ambiguous_prefix_among_siblings_is_rejected() {
    let mut cat = Catalog::from_root(sample_root());
    let root = sample_root();
    let cassini = &root.sub_paths["cassini"];
    let mut sub_cat = Catalog::from_root(cassini.clone());
    // "survey" itself is ambiguous between "survey" and "survey_details".
    assert!(sub_cat.resolve("surv").is_err());
    // the top-level catalog has no ambiguity at its first segment.
    assert!(cat.resolve("cassini").is_ok());
}

#[test]
fn memoised_lookup_returns_the_same_node_on_repeat() {
    let mut cat = Catalog::from_root(sample_root());
    let first = cat.resolve("cassini/survey").unwrap().urls.clone();
    let second = cat.resolve("cassini/survey").unwrap().urls.clone();
    assert_eq!(first, second);
}
