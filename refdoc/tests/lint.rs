use refdoc::{Parser, lint};

const REFERENCE: &str = include_str!("data/database-reference.md");

fn warnings(source: &str) -> Vec<String> {
    let doc = Parser::new(source.to_string(), 0)
        .parse()
        .expect("parse failed");
    lint(&doc).iter().map(|w| w.to_string()).collect()
}

#[test]
fn reference_document_is_clean() {
    assert!(warnings(REFERENCE).is_empty());
}

#[test]
fn broken_internal_links_are_reported() {
    let found = warnings("# A\n\nSee [B](#b) and [C](#c).\n\n# B\n\ntext\n");
    assert_eq!(found, vec!["line 3: section \"A\" links to unknown anchor `#c`"]);
}

#[test]
fn external_links_are_ignored() {
    assert!(warnings("# A\n\n[docs](https://example.com/#frag)\n").is_empty());
}

#[test]
fn empty_sections_are_reported() {
    let found = warnings("# A\n# B\n\ntext\n");
    assert_eq!(found, vec!["line 1: section \"A\" has no content"]);
}

#[test]
fn untagged_code_in_lists_is_reported() {
    let found = warnings("# A\n\n- step\n\n  ```\n  SELECT 1;\n  ```\n");
    assert_eq!(found, vec!["line 3: code example in \"A\" has no language tag"]);
}

#[test]
fn repeated_subsection_anchors_are_reported() {
    let found = warnings("# A\n## Notes\n\nx\n\n# B\n## Notes\n\ny\n");
    assert_eq!(found, vec!["line 7: section \"Notes\" repeats the anchor `#notes`"]);
}

#[test]
fn block_warnings_point_at_the_block() {
    let source = "# A\n\nIntro.\n\n```\nSELECT 1;\n```\n";
    let doc = Parser::new(source.to_string(), 0).parse().expect("parse failed");
    let found = lint(&doc);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].line, 5);
    assert_eq!(found[0].span.start, 13);
    assert!(source[found[0].span.clone()].starts_with("```\nSELECT 1;\n```"));
}
