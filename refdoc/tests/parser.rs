use pretty_assertions::assert_eq;

use refdoc::{Alignment, Block, ContentError, Document, Inline, Parser, Text};

const REFERENCE: &str = include_str!("data/database-reference.md");

fn parse(source: &str) -> Document {
    Parser::new(source.to_string(), 0)
        .parse()
        .expect("parse failed")
}

fn parse_err(source: &str) -> Vec<ContentError> {
    match Parser::new(source.to_string(), 0).parse() {
        Ok(doc) => panic!("expected parse errors, got {:?}", doc),
        Err(errors) => errors,
    }
}

#[test]
fn reference_outline_has_eleven_topics() {
    let doc = parse(REFERENCE);
    assert_eq!(doc.title.as_deref(), Some("Relational Database Reference"));
    assert_eq!(
        doc.section_titles(),
        vec![
            "ACID Properties",
            "CAP Theorem",
            "SQL Joins",
            "Aggregations & Filters",
            "Normalization",
            "Indexes",
            "Transactions",
            "Locking Mechanisms",
            "Database Isolation Levels",
            "Triggers",
            "References",
        ]
    );
}

#[test]
fn reference_preamble_and_subsections() {
    let doc = parse(REFERENCE);
    assert_eq!(doc.preamble.len(), 2);
    assert!(matches!(&doc.preamble[1], Block::BulletList(items) if items.len() == 11));

    let joins = &doc.sections[2];
    assert_eq!(joins.anchor, "sql-joins");
    assert_eq!(joins.level, 2);
    let children: Vec<&str> = joins.children.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(children, vec!["Inner Join", "Left Join"]);
    assert_eq!(joins.children[0].level, 3);
}

#[test]
fn code_examples_are_kept_verbatim() {
    let doc = parse(REFERENCE);
    let triggers = doc.find("triggers").expect("triggers section");
    assert_eq!(
        triggers.body[1],
        Block::CodeExample {
            language: Some("sql".to_string()),
            code: "CREATE TRIGGER orders_audit\nAFTER UPDATE ON orders\nFOR EACH ROW\nEXECUTE FUNCTION log_order_change();\n"
                .to_string(),
        }
    );
}

#[test]
fn tables_keep_header_rows_and_alignment() {
    let doc = parse(REFERENCE);
    let levels = doc.find("database-isolation-levels").expect("isolation section");
    let Block::Table(table) = &levels.body[0] else {
        panic!("expected a table, got {:?}", levels.body[0]);
    };
    assert_eq!(table.columns(), 4);
    assert_eq!(table.header[0].plain(), "Level");
    assert_eq!(table.rows.len(), 4);
    assert_eq!(table.rows[3][0].plain(), "Serializable");
    assert_eq!(
        table.alignments,
        vec![Alignment::None, Alignment::Center, Alignment::Center, Alignment::Center]
    );
}

#[test]
fn list_items_keep_inline_formatting() {
    let doc = parse(REFERENCE);
    let normalization = doc.find("normalization").expect("normalization section");
    let Block::NumberedList { start, items } = &normalization.body[1] else {
        panic!("expected a numbered list, got {:?}", normalization.body[1]);
    };
    assert_eq!(*start, 1);
    assert_eq!(items.len(), 3);
    assert_eq!(
        items[0].text,
        Text(vec![
            Inline::Strong(vec![Inline::Text("1NF".to_string())]),
            Inline::Text(": every column holds atomic values".to_string()),
        ])
    );
}

#[test]
fn section_lines_point_at_headings() {
    let doc = parse("# A\n\ntext\n\n# B\n\nmore\n");
    assert_eq!(doc.title, None);
    assert_eq!(doc.sections[0].line, 1);
    assert_eq!(doc.sections[1].line, 5);
    assert_eq!(doc.sections[0].span, 0..11);
}

#[test]
fn multi_line_setext_titles_keep_their_spaces() {
    let doc = parse("# A\n\ntext\n\nFoo\nbar\n===\n\nbody\n");
    assert_eq!(doc.section_titles(), vec!["A", "Foo bar"]);
    assert!(doc.find("foo-bar").is_some());
}

#[test]
fn escaped_text_is_one_run() {
    let doc = parse("# A\n\n2024\\. was \\[not\\] a link\n");
    assert_eq!(
        doc.sections[0].body,
        vec![Block::Paragraph(Text::plain_str("2024. was [not] a link"))]
    );
}

#[test]
fn body_blocks_record_their_lines() {
    let doc = parse("# A\n\ntext\n\n- item\n");
    let lines: Vec<usize> = doc.sections[0]
        .block_positions
        .iter()
        .map(|p| p.line)
        .collect();
    assert_eq!(lines, vec![3, 5]);
}

#[test]
fn single_heading_is_a_section_not_a_title() {
    let doc = parse("# Only\n\nbody\n");
    assert_eq!(doc.title, None);
    assert_eq!(doc.section_titles(), vec!["Only"]);
}

#[test]
fn deeper_headings_nest_and_shallower_ones_close() {
    let doc = parse("## A\n### A.1\n#### A.1.a\n### A.2\n## B\n");
    assert_eq!(doc.section_titles(), vec!["A", "B"]);
    let a = &doc.sections[0];
    assert_eq!(a.children.len(), 2);
    assert_eq!(a.children[0].children[0].title, "A.1.a");

    let outline: Vec<(usize, &str)> = doc
        .outline()
        .map(|(depth, s)| (depth, s.title.as_str()))
        .collect();
    assert_eq!(
        outline,
        vec![(0, "A"), (1, "A.1"), (2, "A.1.a"), (1, "A.2"), (0, "B")]
    );
}

#[test]
fn heading_whitespace_is_normalized() {
    let doc = parse("#    Spaced     Out   Title   \n");
    assert_eq!(doc.sections[0].title, "Spaced Out Title");
    assert_eq!(doc.sections[0].anchor, "spaced-out-title");
}

#[test]
fn content_before_first_heading_is_preamble() {
    let doc = parse("intro\n\n# A\n\nbody\n");
    assert_eq!(
        doc.preamble,
        vec![Block::Paragraph(Text::plain_str("intro"))]
    );
}

#[test]
fn nested_list_blocks_are_kept() {
    let doc = parse("# A\n\n- outer\n  - inner\n- second\n");
    let Block::BulletList(items) = &doc.sections[0].body[0] else {
        panic!("expected a bullet list");
    };
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].text.plain(), "outer");
    assert!(matches!(&items[0].children[0], Block::BulletList(inner) if inner[0].text.plain() == "inner"));
}

#[test]
fn quotes_and_rules() {
    let doc = parse("# A\n\n> quoted\n\n---\n");
    assert_eq!(
        doc.sections[0].body,
        vec![
            Block::Quote(vec![Block::Paragraph(Text::plain_str("quoted"))]),
            Block::Rule,
        ]
    );
}

#[test]
fn unclosed_fence_names_opening_line() {
    let errors = parse_err("# A\n\ntext\n\n```sql\nSELECT 1;\n");
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        ContentError::MalformedContent { line: 5, .. }
    ));
    assert!(errors[0].to_string().contains("never closed"));
}

#[test]
fn indented_fence_does_not_close_a_code_block() {
    let errors = parse_err("# A\n\n```sql\nSELECT 1;\n    ```\n");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line(), 3);
    assert!(errors[0].to_string().contains("never closed"));
}

#[test]
fn fences_inside_containers_close() {
    let doc = parse("# A\n\n- ```sql\n  SELECT 1;\n  ```\n\n> ```\n> x\n> ```\n");
    assert_eq!(doc.sections[0].body.len(), 2);
}

#[test]
fn table_row_wider_than_header_is_malformed() {
    let errors = parse_err("# A\n\n| a | b |\n| --- | --- |\n| 1 | 2 |\n| 1 | 2 | 3 |\n");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line(), 6);
    assert!(errors[0].to_string().contains("3 cells but the header has 2"));
}

#[test]
fn table_row_narrower_than_header_is_malformed() {
    let errors = parse_err("| a | b | c |\n|---|---|---|\n| 1 | 2 |\n");
    assert_eq!(errors[0].line(), 3);
}

#[test]
fn every_malformed_construct_is_reported() {
    let errors = parse_err("# ?!\n\n| a | b |\n| - | - |\n| 1 |\n\n```\nunterminated\n");
    let lines: Vec<usize> = errors.iter().map(|e| e.line()).collect();
    assert_eq!(lines, vec![1, 5, 7]);
}

#[test]
fn indented_code_has_no_language() {
    let doc = parse("# A\n\n    SELECT 1;\n");
    assert_eq!(
        doc.sections[0].body,
        vec![Block::CodeExample {
            language: None,
            code: "SELECT 1;\n".to_string(),
        }]
    );
}

#[test]
fn documents_can_be_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Document>();
}
