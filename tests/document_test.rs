//! End-to-end tests: reading markup, inspecting the model, writing it back
//! and following links between documents on disk.

use std::path::PathBuf;

use hyperdoc::diagnostic::W_UNTERMINATED_STYLE;
use hyperdoc::{
    Access, Capabilities, DocState, LocalAccess, StyleSheet, TextRange, load_from_stream, serialize,
};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(FIXTURES_DIR).join(name)
}

const SCENARIO: &[u8] = b"<h1>Title</h1><p>See <a href=\"doc2\">this</a>.</p>";

// ============================================================================
// Reading
// ============================================================================

#[test]
fn test_scenario_runs_and_anchor() {
    let sheet = StyleSheet::standard();
    let outcome = load_from_stream(SCENARIO, &sheet).expect("scenario reads");
    assert!(outcome.diagnostics.is_empty());

    let doc = &outcome.document;
    assert_eq!(doc.state(), DocState::Ready);
    assert_eq!(doc.text(), "Title\nSee this.\n");

    let runs: Vec<(&str, Option<&str>, bool)> = doc
        .runs()
        .unwrap()
        .iter()
        .map(|run| {
            let style = doc.style(run.style).and_then(|s| s.name.as_deref());
            (doc.slice(run.range), style, run.anchor.is_some())
        })
        .collect();
    assert_eq!(
        runs,
        vec![
            ("Title\n", Some("Heading1"), false),
            ("See ", Some("Body"), false),
            ("this", Some("Body"), true),
            (".\n", Some("Body"), false),
        ]
    );

    let anchors: Vec<_> = doc.anchors().collect();
    assert_eq!(anchors.len(), 1);
    assert_eq!(anchors[0].target(), Some("doc2"));
    assert_eq!(anchors[0].capabilities(), Capabilities::NONE);
    assert_eq!(anchors[0].range(), Some(TextRange::new(10, 14)));
    assert_eq!(anchors[0].name(), "z1");
}

#[test]
fn test_scenario_serialized_against_base() {
    let sheet = StyleSheet::standard();
    let doc = load_from_stream(SCENARIO, &sheet).unwrap().document;

    // Relative addresses share a root with the base.
    let out = serialize(&doc, &sheet, Some("doc1")).unwrap();
    assert!(out.contains("HREF=\"doc2\""), "{out}");

    // An absolute target on the same server becomes relative.
    let mut doc = doc;
    let id = doc.anchors().next().unwrap().id();
    doc.link_anchor(id, "http://info.cern.ch/hypertext/WWW/doc2.html")
        .unwrap();
    let out = serialize(&doc, &sheet, Some("http://info.cern.ch/hypertext/WWW/doc1.html")).unwrap();
    assert!(out.contains("HREF=\"doc2.html\""), "{out}");

    // On another server it stays absolute.
    let out = serialize(&doc, &sheet, Some("http://example.org/doc1.html")).unwrap();
    assert!(
        out.contains("HREF=\"http://info.cern.ch/hypertext/WWW/doc2.html\""),
        "{out}"
    );
}

#[test]
fn test_fixture_document() {
    let sheet = StyleSheet::standard();
    let bytes = std::fs::read(fixture_path("project.html")).unwrap();
    let outcome = load_from_stream(&bytes, &sheet).unwrap();
    let doc = &outcome.document;

    assert_eq!(doc.title(), Some("The World Wide Web project"));
    assert!(doc.text().starts_with("World Wide Web\nThe WorldWideWeb (W3)"));
    assert_eq!(doc.anchors().count(), 3);
    assert!(doc.next_anchor_number() >= 7);

    let people = doc.anchor_named("24").unwrap();
    assert_eq!(people.target(), Some("people.html#z3"));
    assert_eq!(doc.slice(people.range().unwrap()), "list of people");
    let subjects = doc.anchor_named("z1").unwrap();
    assert_eq!(subjects.serial(), 1);

    // The paragraph opened by <P> is never closed.
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].code, W_UNTERMINATED_STYLE);
}

#[test]
fn test_fixture_round_trip() {
    let sheet = StyleSheet::standard();
    let bytes = std::fs::read(fixture_path("project.html")).unwrap();
    let first = load_from_stream(&bytes, &sheet).unwrap().document;
    let markup = serialize(&first, &sheet, None).unwrap();
    let second = load_from_stream(markup.as_bytes(), &sheet).unwrap();

    assert!(second.diagnostics.is_empty(), "{:?}", second.diagnostics);
    let doc = &second.document;
    assert_eq!(doc.text(), first.text());
    assert_eq!(doc.title(), first.title());
    assert_eq!(doc.runs().unwrap().len(), first.runs().unwrap().len());
    for anchor in first.anchors() {
        let copy = doc.anchor_named(&anchor.name()).unwrap();
        assert_eq!(copy.range(), anchor.range());
        assert_eq!(copy.target(), anchor.target());
    }
}

// ============================================================================
// Following links
// ============================================================================

#[test]
fn test_follow_link_between_files() {
    let mut access = LocalAccess::new(StyleSheet::standard());
    let home = access.open(&fixture_path("project.html")).unwrap();
    let doc = access.document(&home).unwrap().clone();

    let link = doc.anchor_named("24").unwrap().id();
    let target = doc.follow_link(link, &mut access).unwrap();
    assert!(target.starts_with("file://"), "{target}");
    assert!(target.ends_with("/tests/fixtures/people.html#z3"), "{target}");

    let people = access.document(&target).unwrap();
    assert_eq!(
        people.title(),
        Some("People involved in the WorldWideWeb project")
    );
    let destination = people.anchor_named("z3").unwrap();
    assert_eq!(
        people.slice(destination.range().unwrap()),
        "Tim Berners-Lee"
    );
}

#[test]
fn test_follow_missing_target_fails() {
    let mut access = LocalAccess::new(StyleSheet::standard());
    let home = access.open(&fixture_path("project.html")).unwrap();
    let doc = access.document(&home).unwrap().clone();

    // summary.html is not part of the fixtures.
    let link = doc.anchor_named("0").unwrap().id();
    assert!(doc.follow_link(link, &mut access).is_err());
    assert_eq!(access.name(), "file");
}
