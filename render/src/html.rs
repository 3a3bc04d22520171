use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, LinkType, Tag, TagEnd, html};
use refdoc::{Alignment, Block, Document, Inline, ListItem, Section, Table, TableOfContents, Text, TocEntry};

// The document is turned back into pulldown-cmark events and written with
// its HTML writer, which handles escaping and table/list bookkeeping.

pub fn render_document(doc: &Document, toc: Option<&TableOfContents>, standalone: bool) -> String {
    let mut events = Vec::new();

    if standalone {
        events.push(Event::Html(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>".into(),
        ));
        let page_title = doc
            .title
            .as_deref()
            .or_else(|| doc.sections.first().map(|s| s.title.as_str()))
            .unwrap_or("");
        events.push(Event::Text(page_title.into()));
        events.push(Event::Html("</title>\n</head>\n<body>\n".into()));
    }

    if let Some(title) = &doc.title {
        push_heading(&mut events, 1, None, title);
    }
    if let Some(toc) = toc {
        push_toc(&mut events, toc);
    }
    for block in &doc.preamble {
        push_block(&mut events, block);
    }
    for section in &doc.sections {
        push_section(&mut events, section);
    }

    if standalone {
        events.push(Event::Html("</body>\n</html>\n".into()));
    }

    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

/// The table of contents as a `<nav>` holding a nested link list.
pub fn render_toc(toc: &TableOfContents) -> String {
    let mut events = Vec::new();
    push_toc(&mut events, toc);
    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

fn push_toc<'a>(events: &mut Vec<Event<'a>>, toc: &'a TableOfContents) {
    events.push(Event::Html("<nav class=\"toc\">\n".into()));
    push_toc_entries(events, &toc.entries);
    events.push(Event::Html("</nav>\n".into()));
}

fn push_toc_entries<'a>(events: &mut Vec<Event<'a>>, entries: &'a [TocEntry]) {
    if entries.is_empty() {
        return;
    }
    events.push(Event::Start(Tag::List(None)));
    for entry in entries {
        events.push(Event::Start(Tag::Item));
        events.push(Event::Start(Tag::Link {
            link_type: LinkType::Inline,
            dest_url: format!("#{}", entry.anchor).into(),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        events.push(Event::Text(entry.title.as_str().into()));
        events.push(Event::End(TagEnd::Link));
        push_toc_entries(events, &entry.children);
        events.push(Event::End(TagEnd::Item));
    }
    events.push(Event::End(TagEnd::List(false)));
}

fn push_section<'a>(events: &mut Vec<Event<'a>>, section: &'a Section) {
    push_heading(events, section.level, Some(&section.anchor), &section.title);
    for block in &section.body {
        push_block(events, block);
    }
    for child in &section.children {
        push_section(events, child);
    }
}

fn push_heading<'a>(events: &mut Vec<Event<'a>>, level: u8, anchor: Option<&'a str>, title: &'a str) {
    let level = heading_level(level);
    events.push(Event::Start(Tag::Heading {
        level,
        id: anchor.map(CowStr::Borrowed),
        classes: Vec::new(),
        attrs: Vec::new(),
    }));
    events.push(Event::Text(title.into()));
    events.push(Event::End(TagEnd::Heading(level)));
}

fn push_block<'a>(events: &mut Vec<Event<'a>>, block: &'a Block) {
    match block {
        Block::Paragraph(text) => {
            events.push(Event::Start(Tag::Paragraph));
            push_text(events, text);
            events.push(Event::End(TagEnd::Paragraph));
        }
        Block::BulletList(items) => {
            events.push(Event::Start(Tag::List(None)));
            push_items(events, items);
            events.push(Event::End(TagEnd::List(false)));
        }
        Block::NumberedList { start, items } => {
            events.push(Event::Start(Tag::List(Some(*start))));
            push_items(events, items);
            events.push(Event::End(TagEnd::List(true)));
        }
        Block::Table(table) => push_table(events, table),
        Block::CodeExample { language, code } => {
            let info = language.as_deref().unwrap_or("");
            events.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info.into()))));
            events.push(Event::Text(code.as_str().into()));
            events.push(Event::End(TagEnd::CodeBlock));
        }
        Block::Quote(blocks) => {
            events.push(Event::Start(Tag::BlockQuote(None)));
            for block in blocks {
                push_block(events, block);
            }
            events.push(Event::End(TagEnd::BlockQuote(None)));
        }
        Block::Rule => events.push(Event::Rule),
    }
}

fn push_items<'a>(events: &mut Vec<Event<'a>>, items: &'a [ListItem]) {
    for item in items {
        events.push(Event::Start(Tag::Item));
        push_text(events, &item.text);
        for child in &item.children {
            push_block(events, child);
        }
        events.push(Event::End(TagEnd::Item));
    }
}

fn push_table<'a>(events: &mut Vec<Event<'a>>, table: &'a Table) {
    let alignments = table
        .alignments
        .iter()
        .map(|a| match a {
            Alignment::None => pulldown_cmark::Alignment::None,
            Alignment::Left => pulldown_cmark::Alignment::Left,
            Alignment::Center => pulldown_cmark::Alignment::Center,
            Alignment::Right => pulldown_cmark::Alignment::Right,
        })
        .collect();
    events.push(Event::Start(Tag::Table(alignments)));

    events.push(Event::Start(Tag::TableHead));
    push_cells(events, &table.header);
    events.push(Event::End(TagEnd::TableHead));

    for row in &table.rows {
        events.push(Event::Start(Tag::TableRow));
        push_cells(events, row);
        events.push(Event::End(TagEnd::TableRow));
    }

    events.push(Event::End(TagEnd::Table));
}

fn push_cells<'a>(events: &mut Vec<Event<'a>>, cells: &'a [Text]) {
    for cell in cells {
        events.push(Event::Start(Tag::TableCell));
        push_text(events, cell);
        events.push(Event::End(TagEnd::TableCell));
    }
}

fn push_text<'a>(events: &mut Vec<Event<'a>>, text: &'a Text) {
    push_inlines(events, &text.0);
}

fn push_inlines<'a>(events: &mut Vec<Event<'a>>, inlines: &'a [Inline]) {
    for inline in inlines {
        match inline {
            Inline::Text(s) => events.push(Event::Text(s.as_str().into())),
            Inline::CodeSpan(code) => events.push(Event::Code(code.as_str().into())),
            Inline::Strong(children) => {
                events.push(Event::Start(Tag::Strong));
                push_inlines(events, children);
                events.push(Event::End(TagEnd::Strong));
            }
            Inline::Emphasis(children) => {
                events.push(Event::Start(Tag::Emphasis));
                push_inlines(events, children);
                events.push(Event::End(TagEnd::Emphasis));
            }
            Inline::Strikethrough(children) => {
                events.push(Event::Start(Tag::Strikethrough));
                push_inlines(events, children);
                events.push(Event::End(TagEnd::Strikethrough));
            }
            Inline::Link {
                dest,
                title,
                content,
            } => {
                events.push(Event::Start(Tag::Link {
                    link_type: LinkType::Inline,
                    dest_url: dest.as_str().into(),
                    title: title.as_str().into(),
                    id: CowStr::Borrowed(""),
                }));
                push_inlines(events, content);
                events.push(Event::End(TagEnd::Link));
            }
            Inline::Image { dest, title, alt } => {
                events.push(Event::Start(Tag::Image {
                    link_type: LinkType::Inline,
                    dest_url: dest.as_str().into(),
                    title: title.as_str().into(),
                    id: CowStr::Borrowed(""),
                }));
                push_inlines(events, alt);
                events.push(Event::End(TagEnd::Image));
            }
            Inline::SoftBreak => events.push(Event::SoftBreak),
            Inline::HardBreak => events.push(Event::HardBreak),
        }
    }
}

fn heading_level(level: u8) -> HeadingLevel {
    match level {
        1 => HeadingLevel::H1,
        2 => HeadingLevel::H2,
        3 => HeadingLevel::H3,
        4 => HeadingLevel::H4,
        5 => HeadingLevel::H5,
        _ => HeadingLevel::H6,
    }
}
