use refdoc::{Alignment, Block, Document, ListItem, Section, Table, TableOfContents, TocEntry};

/// Plain text: numbered, underlined headings and aligned tables.
pub fn render_document(doc: &Document, toc: Option<&TableOfContents>) -> String {
    let mut chunks = Vec::new();

    if let Some(title) = &doc.title {
        chunks.push(underlined(title, '='));
    }
    if let Some(toc) = toc {
        chunks.push(format!("Contents\n\n{}", render_toc(toc)));
    }
    for block in &doc.preamble {
        chunks.push(render_block(block));
    }
    for (idx, section) in doc.sections.iter().enumerate() {
        render_section(section, &(idx + 1).to_string(), &mut chunks);
    }

    chunks.join("\n")
}

pub fn render_toc(toc: &TableOfContents) -> String {
    let mut out = String::new();
    push_toc_entries(&mut out, &toc.entries, "", 0);
    out
}

fn push_toc_entries(out: &mut String, entries: &[TocEntry], prefix: &str, depth: usize) {
    for (idx, entry) in entries.iter().enumerate() {
        let number = section_number(prefix, idx);
        out.push_str(&format!("{}{} {}\n", "   ".repeat(depth), number, entry.title));
        push_toc_entries(out, &entry.children, &number, depth + 1);
    }
}

fn section_number(prefix: &str, idx: usize) -> String {
    if prefix.is_empty() {
        format!("{}.", idx + 1)
    } else {
        format!("{}{}.", prefix, idx + 1)
    }
}

fn render_section(section: &Section, number: &str, chunks: &mut Vec<String>) {
    let heading = format!("{}. {}", number, section.title);
    if number.contains('.') {
        chunks.push(format!("{}\n", heading));
    } else {
        chunks.push(underlined(&heading, '-'));
    }

    for block in &section.body {
        chunks.push(render_block(block));
    }
    for (idx, child) in section.children.iter().enumerate() {
        render_section(child, &format!("{}.{}", number, idx + 1), chunks);
    }
}

fn underlined(heading: &str, c: char) -> String {
    let width = heading.chars().count();
    format!("{}\n{}\n", heading, c.to_string().repeat(width))
}

fn render_block(block: &Block) -> String {
    match block {
        Block::Paragraph(text) => format!("{}\n", text.plain()),
        Block::BulletList(items) => items.iter().map(|item| render_item("  * ", item)).collect(),
        Block::NumberedList { start, items } => items
            .iter()
            .enumerate()
            .map(|(idx, item)| render_item(&format!("  {}. ", start + idx as u64), item))
            .collect(),
        Block::Table(table) => render_table(table),
        Block::CodeExample { language, code } => {
            let mut out = format!("[{}]\n{}", language.as_deref().unwrap_or("code"), code);
            if !code.ends_with('\n') {
                out.push('\n');
            }
            out
        }
        Block::Quote(blocks) => {
            let inner: Vec<String> = blocks.iter().map(render_block).collect();
            inner
                .join("\n")
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        "  |\n".to_string()
                    } else {
                        format!("  | {}\n", line)
                    }
                })
                .collect()
        }
        Block::Rule => "* * *\n".to_string(),
    }
}

fn render_item(marker: &str, item: &ListItem) -> String {
    let indent = " ".repeat(marker.len());
    let mut out = format!(
        "{}{}\n",
        marker,
        item.text.plain().replace('\n', &format!("\n{}", indent))
    );
    for child in &item.children {
        for line in render_block(child).lines() {
            if !line.is_empty() {
                out.push_str(&indent);
                out.push_str(line);
            }
            out.push('\n');
        }
    }
    out
}

fn render_table(table: &Table) -> String {
    let header: Vec<String> = table.header.iter().map(|cell| cell.plain()).collect();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| cell.plain()).collect())
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|cell| cell.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &header, &widths, &table.alignments);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');
    for row in &rows {
        push_row(&mut out, row, &widths, &table.alignments);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize], alignments: &[Alignment]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .zip(alignments)
        .map(|((cell, &width), alignment)| pad(cell, width, *alignment))
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}

fn pad(cell: &str, width: usize, alignment: Alignment) -> String {
    let gap = width.saturating_sub(cell.chars().count());
    match alignment {
        Alignment::Right => format!("{}{}", " ".repeat(gap), cell),
        Alignment::Center => {
            let left = gap / 2;
            format!("{}{}{}", " ".repeat(left), cell, " ".repeat(gap - left))
        }
        Alignment::None | Alignment::Left => format!("{}{}", cell, " ".repeat(gap)),
    }
}
