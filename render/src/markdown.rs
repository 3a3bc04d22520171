use refdoc::document::longest_run;
use refdoc::{Alignment, Block, Document, ListItem, Section, Table, TableOfContents, Text, TocEntry};

pub fn render_document(doc: &Document, toc: Option<&TableOfContents>) -> String {
    let mut chunks = Vec::new();

    if let Some(title) = &doc.title {
        chunks.push(heading(1, title));
    }
    if let Some(toc) = toc {
        chunks.push(render_toc(toc));
    }
    chunks.extend(render_blocks(&doc.preamble));
    for section in &doc.sections {
        render_section(section, &mut chunks);
    }

    chunks.join("\n")
}

/// The table of contents as a nested bullet list of anchor links.
pub fn render_toc(toc: &TableOfContents) -> String {
    let mut out = String::new();
    push_toc_entries(&mut out, &toc.entries, 0);
    out
}

fn push_toc_entries(out: &mut String, entries: &[TocEntry], depth: usize) {
    for entry in entries {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!(
            "- [{}](#{})\n",
            Text::plain_str(entry.title.as_str()),
            entry.anchor
        ));
        push_toc_entries(out, &entry.children, depth + 1);
    }
}

fn render_section(section: &Section, chunks: &mut Vec<String>) {
    chunks.push(heading(section.level, &section.title));
    chunks.extend(render_blocks(&section.body));
    for child in &section.children {
        render_section(child, chunks);
    }
}

fn heading(level: u8, title: &str) -> String {
    format!(
        "{} {}\n",
        "#".repeat(level as usize),
        Text::plain_str(title)
    )
}

/// Render a block sequence into blank-line separated chunks.
///
/// Two lists of the same kind in a row would merge into one when parsed
/// again, so every other one switches its marker (`-`/`*`, `.`/`)`).
fn render_blocks(blocks: &[Block]) -> Vec<String> {
    let mut chunks = Vec::with_capacity(blocks.len());
    let mut previous: Option<&Block> = None;
    let mut alternate = false;

    for block in blocks {
        alternate = match (previous, block) {
            (Some(Block::BulletList(_)), Block::BulletList(_))
            | (Some(Block::NumberedList { .. }), Block::NumberedList { .. }) => !alternate,
            _ => false,
        };
        chunks.push(render_block(block, alternate));
        previous = Some(block);
    }

    chunks
}

fn render_block(block: &Block, alternate: bool) -> String {
    match block {
        Block::Paragraph(text) => format!("{}\n", text),
        Block::BulletList(items) => {
            let marker = if alternate { "* " } else { "- " };
            items
                .iter()
                .map(|item| render_item(marker, item))
                .collect()
        }
        Block::NumberedList { start, items } => {
            let delimiter = if alternate { ')' } else { '.' };
            items
                .iter()
                .enumerate()
                .map(|(idx, item)| {
                    render_item(&format!("{}{} ", start + idx as u64, delimiter), item)
                })
                .collect()
        }
        Block::Table(table) => render_table(table),
        Block::CodeExample { language, code } => {
            let fence = "`".repeat((longest_run(code, '`') + 1).max(3));
            let mut out = format!("{}{}\n{}", fence, language.as_deref().unwrap_or(""), code);
            if !code.is_empty() && !code.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&fence);
            out.push('\n');
            out
        }
        Block::Quote(blocks) => {
            let inner = render_blocks(blocks).join("\n");
            inner
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        ">\n".to_string()
                    } else {
                        format!("> {}\n", line)
                    }
                })
                .collect()
        }
        // `***` cannot be read as a setext underline or an empty list item.
        Block::Rule => "***\n".to_string(),
    }
}

fn render_item(marker: &str, item: &ListItem) -> String {
    let indent = " ".repeat(marker.len());
    let chunks = render_blocks(&item.children);
    let mut children = item.children.iter().zip(&chunks);
    let mut out = marker.to_string();

    if item.text.is_empty() {
        // A marker followed by a blank line is an empty item, so the first
        // child starts on the marker line.
        match children.next() {
            Some((_, chunk)) => push_indented(&mut out, chunk, &indent, true),
            None => out.push('\n'),
        }
    } else {
        out.push_str(&item.text.to_string().replace('\n', &format!("\n{}", indent)));
        out.push('\n');
    }

    for (block, chunk) in children {
        // Lists can interrupt the item's text; other blocks need a blank line.
        let interrupts = matches!(block, Block::BulletList(_))
            || matches!(block, Block::NumberedList { start: 1, .. });
        if !interrupts {
            out.push('\n');
        }
        push_indented(&mut out, chunk, &indent, false);
    }

    out
}

/// Append `chunk` with every non-empty line indented, except the first when
/// it continues a marker line.
fn push_indented(out: &mut String, chunk: &str, indent: &str, continues_marker: bool) {
    for (idx, line) in chunk.lines().enumerate() {
        if !line.is_empty() && !(continues_marker && idx == 0) {
            out.push_str(indent);
        }
        out.push_str(line);
        out.push('\n');
    }
}

fn render_table(table: &Table) -> String {
    let mut out = String::new();
    push_row(&mut out, &table.header);

    out.push('|');
    for alignment in &table.alignments {
        out.push_str(match alignment {
            Alignment::None => " --- |",
            Alignment::Left => " :--- |",
            Alignment::Center => " :---: |",
            Alignment::Right => " ---: |",
        });
    }
    out.push('\n');

    for row in &table.rows {
        push_row(&mut out, row);
    }
    out
}

fn push_row(out: &mut String, cells: &[Text]) {
    out.push('|');
    for cell in cells {
        out.push(' ');
        out.push_str(&cell.to_string().replace('|', "\\|"));
        out.push_str(" |");
    }
    out.push('\n');
}
