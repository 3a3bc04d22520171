use pretty_assertions::assert_eq;

use refdoc::{Document, Parser, Section, TableOfContents};
use render::{Format, RenderOptions, Renderer};

const REFERENCE: &str = include_str!("../../refdoc/tests/data/database-reference.md");

const GUIDE: &str = "# Guide\n\nIntro.\n\n## Setup\n\n| Key | Value |\n| --- | ---: |\n| a | 10 |\n| bb | 2 |\n\n### Details\n\n- x\n";

fn parse(source: &str) -> Document {
    Parser::new(source.to_string(), 0)
        .parse()
        .expect("parse failed")
}

fn renderer(format: Format) -> Renderer {
    Renderer::new(RenderOptions {
        format,
        standalone: false,
    })
}

fn markdown(doc: &Document) -> String {
    renderer(Format::Markdown).render(doc, None)
}

/// The document with source positions cleared, for comparing structure
/// across sources of different layout.
fn structure(mut doc: Document) -> Document {
    fn clear(sections: &mut [Section]) {
        for section in sections {
            section.line = 0;
            section.span = 0..0;
            section.block_positions.clear();
            clear(&mut section.children);
        }
    }
    clear(&mut doc.sections);
    doc
}

#[test]
fn canonical_markdown_renders_unchanged() {
    assert_eq!(markdown(&parse(GUIDE)), GUIDE);
}

#[test]
fn markdown_is_a_fixed_point_after_one_round() {
    let once = markdown(&parse(REFERENCE));
    let twice = markdown(&parse(&once));
    assert_eq!(once, twice);
    assert_eq!(parse(&once).section_titles(), parse(REFERENCE).section_titles());
}

#[test]
fn rendering_is_deterministic() {
    let doc = parse(REFERENCE);
    let toc = TableOfContents::generate(&doc).expect("toc");
    for format in [Format::Markdown, Format::Html, Format::Text] {
        let r = renderer(format);
        assert_eq!(r.render(&doc, Some(&toc)), r.render(&doc, Some(&toc)));
    }
}

#[test]
fn code_examples_survive_every_format() {
    let doc = parse(REFERENCE);
    let code = "SELECT customer_id, COUNT(*) AS orders, SUM(total) AS spent\nFROM orders\nWHERE status = 'paid'\nGROUP BY customer_id\n";
    assert!(renderer(Format::Markdown).render(&doc, None).contains(code));
    assert!(renderer(Format::Text).render(&doc, None).contains(code));
}

#[test]
fn adjacent_lists_stay_separate() {
    let source = "# A\n\n- one\n\n* two\n\n1. three\n\n1) four\n";
    let doc = parse(source);
    assert_eq!(doc.sections[0].body.len(), 4);
    let rendered = markdown(&doc);
    assert_eq!(rendered, "# A\n\n- one\n\n* two\n\n1. three\n\n1) four\n");
    assert_eq!(parse(&rendered).sections[0].body.len(), 4);
}

#[test]
fn code_containing_fences_gets_a_longer_fence() {
    let doc = parse("# A\n\n````\n```\n````\n");
    assert_eq!(markdown(&doc), "# A\n\n````\n```\n````\n");
}

#[test]
fn special_characters_are_escaped() {
    let doc = parse("# A\n\nUse \\*literal\\* stars and a\\_b.\n");
    let rendered = markdown(&doc);
    assert_eq!(rendered, "# A\n\nUse \\*literal\\* stars and a\\_b.\n");
    assert_eq!(parse(&rendered), doc);
}

#[test]
fn list_items_with_code_round_trip() {
    let doc = parse("# A\n\n- step\n\n  ```sql\n  SELECT 1;\n  ```\n");
    let rendered = markdown(&doc);
    assert_eq!(rendered, "# A\n\n- step\n\n  ```sql\n  SELECT 1;\n  ```\n");
    assert_eq!(parse(&rendered).sections[0].body, doc.sections[0].body);
}

#[test]
fn empty_list_item_keeps_its_code() {
    let source = "# A\n\n- ```sql\n  SELECT 1;\n  ```\n";
    let doc = parse(source);
    assert_eq!(markdown(&doc), source);
    assert_eq!(parse(&markdown(&doc)).sections[0].body, doc.sections[0].body);
}

#[test]
fn escaped_block_markers_stay_text() {
    let cases = [
        ("# A\n\n\\- not a list\n", "# A\n\n\\- not a list\n"),
        ("# A\n\n2024\\. was a year\n", "# A\n\n2024\\. was a year\n"),
        ("# A\n\nFoo\n\\---\n", "# A\n\nFoo\n\\---\n"),
        ("# A\n\nAT&amp;amp;T\n", "# A\n\nAT\\&amp;T\n"),
    ];
    for (source, expected) in cases {
        assert_eq!(markdown(&parse(source)), expected, "source {source:?}");
    }
}

#[test]
fn awkward_sources_survive_a_round_trip() {
    let sources = [
        "# A\n\n\\- not a list\n",
        "# A\n\n\\+ not a list either\n",
        "# A\n\n2024\\. was a year\n",
        "# A\n\n7\\) is not an item\n",
        "# A\n\nFoo\n\\---\n",
        "# A\n\nFoo\n\\===\n",
        "# A\n\nline one\\\n\\- not an item\n",
        "# A\n\nAT&amp;amp;T and &copy; and &#169;\n",
        "# A\n\n- \\- dash inside an item\n",
        "# A\n\n> \\- quoted dash\n",
        "# A\n\n| a | b |\n| --- | --- |\n| \\- | 1\\. |\n",
        "# A\n\n- ```sql\n  SELECT 1;\n  ```\n",
        "# A\n\n- \n",
        "# A\n\ntext\n\n***\n\n- x\n",
        "# A\n\nFoo\nbar\n===\n\nBody.\n",
        "# A\n\n`` a`b ``, **bold** and [link](#a)\n",
    ];
    for source in sources {
        let original = parse(source);
        let rendered = markdown(&original);
        assert_eq!(
            structure(parse(&rendered)),
            structure(original),
            "source {source:?} rendered as {rendered:?}"
        );
    }
}

#[test]
fn markdown_toc_links_to_anchors() {
    let doc = parse(REFERENCE);
    let toc = TableOfContents::generate(&doc).expect("toc");
    let listing = renderer(Format::Markdown).render_toc(&toc);
    assert!(listing.starts_with("- [ACID Properties](#acid-properties)\n"));
    assert!(listing.contains("- [Aggregations & Filters](#aggregations--filters)\n"));
    assert_eq!(listing.lines().count(), 11);
}

#[test]
fn html_headings_carry_anchors() {
    let doc = parse("# Overview\n\nCompare a < b & c.\n\n```sql\nSELECT 1 WHERE a < 2;\n```\n");
    let html = renderer(Format::Html).render(&doc, None);
    assert!(html.starts_with("<h1 id=\"overview\">Overview</h1>\n"), "{html}");
    assert!(html.contains("<p>Compare a &lt; b &amp; c.</p>"), "{html}");
    assert!(
        html.contains("<pre><code class=\"language-sql\">SELECT 1 WHERE a &lt; 2;\n</code></pre>"),
        "{html}"
    );
}

#[test]
fn html_tables_and_toc() {
    let doc = parse(REFERENCE);
    let toc = TableOfContents::generate(&doc).expect("toc");
    let html = renderer(Format::Html).render(&doc, Some(&toc));
    assert!(html.contains("<nav class=\"toc\">"));
    assert!(html.contains("<a href=\"#acid-properties\">ACID Properties</a>"));
    assert!(html.contains("<h2 id=\"database-isolation-levels\">Database Isolation Levels</h2>"));
    assert!(html.contains("<table>"));
    assert!(html.contains("<h1>Relational Database Reference</h1>"));
}

#[test]
fn standalone_html_is_a_full_page() {
    let doc = parse(GUIDE);
    let html = Renderer::new(RenderOptions {
        format: Format::Html,
        standalone: true,
    })
    .render(&doc, None);
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>Guide</title>"));
    assert!(html.ends_with("</html>\n"));
}

#[test]
fn plain_text_layout() {
    let text = renderer(Format::Text).render(&parse(GUIDE), None);
    assert_eq!(
        text,
        "Guide\n=====\n\nIntro.\n\n1. Setup\n--------\n\nKey | Value\n----+------\na   |    10\nbb  |     2\n\n1.1. Details\n\n  * x\n"
    );
}

#[test]
fn plain_text_toc_is_numbered() {
    let doc = parse(GUIDE);
    let toc = TableOfContents::with_depth(&doc, 2).expect("toc");
    assert_eq!(
        renderer(Format::Text).render_toc(&toc),
        "1. Setup\n   1.1. Details\n"
    );
}
