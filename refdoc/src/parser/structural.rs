use std::ops::Range;

use log::{debug, warn};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser as CmarkParser, Tag, TagEnd};

use crate::anchor::slugify;
use crate::document::{Alignment, Block, Document, Inline, ListItem, Position, Section, Table, Text};
use crate::error::ContentError;
use crate::parser::lines::LineIndex;

type Events<'e> = [(Event<'e>, Range<usize>)];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse Markdown source text into a Document.
pub fn parse_document(source: &str, file_id: usize) -> Result<Document, Vec<ContentError>> {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    let parser = CmarkParser::new_ext(source, options);
    let events: Vec<(Event<'_>, Range<usize>)> = parser.into_offset_iter().collect();

    let mut state = ParseState::new(source, file_id, find_title_heading(&events));
    state.process_events(&events);
    state.finalize()
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

struct ParseState<'a> {
    source: &'a str,
    file_id: usize,
    lines: LineIndex,
    /// Event index of the heading that names the whole document.
    title_at: Option<usize>,
    title: Option<String>,
    preamble: Vec<Block>,
    /// Stack of open sections. Innermost = current scope.
    section_stack: Vec<SectionBuilder>,
    /// Completed top-level sections.
    top_sections: Vec<Section>,
    errors: Vec<ContentError>,
}

struct SectionBuilder {
    title: String,
    anchor: String,
    level: u8,
    line: usize,
    body: Vec<Block>,
    block_positions: Vec<Position>,
    children: Vec<Section>,
    span_start: usize,
}

impl SectionBuilder {
    fn into_section(self, span_end: usize) -> Section {
        Section {
            title: self.title,
            anchor: self.anchor,
            level: self.level,
            body: self.body,
            children: self.children,
            line: self.line,
            span: self.span_start..span_end,
            block_positions: self.block_positions,
        }
    }
}

impl<'a> ParseState<'a> {
    fn new(source: &'a str, file_id: usize, title_at: Option<usize>) -> Self {
        ParseState {
            source,
            file_id,
            lines: LineIndex::new(source),
            title_at,
            title: None,
            preamble: Vec::new(),
            section_stack: Vec::new(),
            top_sections: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn process_events(&mut self, events: &Events<'_>) {
        let mut i = 0;

        while i < events.len() {
            let (ref ev, ref range) = events[i];

            match ev {
                Event::Start(Tag::Heading { level, .. }) => {
                    let is_title = self.title_at == Some(i);
                    let heading_span = range.clone();

                    i += 1;
                    let title = normalize_title(&collect_heading_text(events, &mut i));

                    if is_title {
                        self.title = Some(title);
                        continue;
                    }

                    let level = heading_level_to_u8(level);
                    self.close_sections_to_level(level, heading_span.start);
                    self.open_section(title, level, heading_span);
                }

                _ => {
                    let span = range.clone();
                    if let Some(block) = self.collect_block(events, &mut i) {
                        self.push_block(block, span);
                    }
                }
            }
        }
    }

    fn open_section(&mut self, title: String, level: u8, span: Range<usize>) {
        let line = self.lines.line_number(span.start);
        let anchor = slugify(&title);
        if anchor.is_empty() {
            self.errors.push(ContentError::malformed(
                line,
                self.lines.line_range(self.source, line),
                format!("heading \"{}\" has no characters usable in an anchor", title),
            ));
        }

        self.section_stack.push(SectionBuilder {
            title,
            anchor,
            level,
            line,
            body: Vec::new(),
            block_positions: Vec::new(),
            children: Vec::new(),
            span_start: span.start,
        });
    }

    fn push_block(&mut self, block: Block, span: Range<usize>) {
        match self.section_stack.last_mut() {
            Some(builder) => {
                builder.body.push(block);
                builder.block_positions.push(Position {
                    line: self.lines.line_number(span.start),
                    span,
                });
            }
            None => self.preamble.push(block),
        }
    }

    /// Collect one block starting at `events[*i]`, advancing past it.
    /// Returns `None` for events that do not form a block on their own.
    fn collect_block(&mut self, events: &Events<'_>, i: &mut usize) -> Option<Block> {
        let (ref ev, ref range) = events[*i];
        *i += 1;

        match ev {
            Event::Start(Tag::Paragraph) => {
                let inlines = self.collect_inlines(events, i, &|e| matches!(e, TagEnd::Paragraph));
                Some(Block::Paragraph(Text(inlines)))
            }

            // Headings inside containers (quotes, list items) are not sections.
            Event::Start(Tag::Heading { .. }) => {
                let inlines =
                    self.collect_inlines(events, i, &|e| matches!(e, TagEnd::Heading(_)));
                Some(Block::Paragraph(Text(inlines)))
            }

            Event::Start(Tag::List(start)) => {
                let items = self.collect_list_items(events, i);
                Some(match start {
                    Some(start) => Block::NumberedList {
                        start: *start,
                        items,
                    },
                    None => Block::BulletList(items),
                })
            }

            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        let opening = self.lines.line_range(
                            self.source,
                            self.lines.line_number(range.start),
                        );
                        let block_text = &self.source[range.clone()];
                        if !fence_is_closed(&self.source[opening], block_text) {
                            let line = self.lines.line_number(range.start);
                            self.errors.push(ContentError::malformed(
                                line,
                                self.lines.line_range(self.source, line),
                                "fenced code block is never closed",
                            ));
                        }
                        info.split_whitespace().next().map(str::to_string)
                    }
                    CodeBlockKind::Indented => None,
                };
                let code = collect_text_until(events, i, |e| matches!(e, TagEnd::CodeBlock));
                Some(Block::CodeExample { language, code })
            }

            Event::Start(Tag::Table(alignments)) => {
                let alignments = alignments
                    .iter()
                    .map(|a| match a {
                        pulldown_cmark::Alignment::None => Alignment::None,
                        pulldown_cmark::Alignment::Left => Alignment::Left,
                        pulldown_cmark::Alignment::Center => Alignment::Center,
                        pulldown_cmark::Alignment::Right => Alignment::Right,
                    })
                    .collect();
                Some(Block::Table(self.collect_table(events, i, alignments)))
            }

            Event::Start(Tag::BlockQuote(_)) => {
                let blocks =
                    self.collect_blocks_until(events, i, &|e| matches!(e, TagEnd::BlockQuote(_)));
                Some(Block::Quote(blocks))
            }

            Event::Rule => Some(Block::Rule),

            Event::Start(Tag::HtmlBlock) => {
                warn!(
                    "ignoring raw HTML block on line {}",
                    self.lines.line_number(range.start)
                );
                skip_until(events, i, |e| matches!(e, TagEnd::HtmlBlock));
                None
            }

            _ => None,
        }
    }

    /// Collect blocks until a matching End tag.
    fn collect_blocks_until(
        &mut self,
        events: &Events<'_>,
        i: &mut usize,
        is_end: &dyn Fn(&TagEnd) -> bool,
    ) -> Vec<Block> {
        let mut blocks = Vec::new();

        while *i < events.len() {
            if let Event::End(tag_end) = &events[*i].0 {
                if is_end(tag_end) {
                    *i += 1;
                    break;
                }
            }
            if let Some(block) = self.collect_block(events, i) {
                blocks.push(block);
            }
        }

        blocks
    }

    /// Collect the items of a list until End(List).
    fn collect_list_items(&mut self, events: &Events<'_>, i: &mut usize) -> Vec<ListItem> {
        let mut items = Vec::new();

        while *i < events.len() {
            match &events[*i].0 {
                Event::End(TagEnd::List(_)) => {
                    *i += 1;
                    break;
                }
                Event::Start(Tag::Item) => {
                    *i += 1;
                    items.push(self.collect_item(events, i));
                }
                _ => {
                    *i += 1;
                }
            }
        }

        items
    }

    /// Collect one list item until End(Item).
    ///
    /// Tight lists put inline events directly inside the item; loose lists
    /// wrap them in a paragraph. Either way the first run becomes the item
    /// text and anything after it becomes nested blocks.
    fn collect_item(&mut self, events: &Events<'_>, i: &mut usize) -> ListItem {
        let mut text = Vec::new();
        let mut children = Vec::new();

        while *i < events.len() {
            match &events[*i].0 {
                Event::End(TagEnd::Item) => {
                    *i += 1;
                    break;
                }
                Event::Start(Tag::Paragraph) if text.is_empty() && children.is_empty() => {
                    *i += 1;
                    text = self.collect_inlines(events, i, &|e| matches!(e, TagEnd::Paragraph));
                }
                _ => {
                    if let Some(inline) = self.collect_inline(events, i) {
                        push_inline(&mut text, inline);
                    } else if let Some(block) = self.collect_block(events, i) {
                        children.push(block);
                    }
                }
            }
        }

        ListItem {
            text: Text(text),
            children,
        }
    }

    /// Collect inline nodes until a matching End tag.
    fn collect_inlines(
        &self,
        events: &Events<'_>,
        i: &mut usize,
        is_end: &dyn Fn(&TagEnd) -> bool,
    ) -> Vec<Inline> {
        let mut inlines = Vec::new();

        while *i < events.len() {
            match &events[*i].0 {
                Event::End(tag_end) if is_end(tag_end) => {
                    *i += 1;
                    break;
                }
                _ => match self.collect_inline(events, i) {
                    Some(inline) => push_inline(&mut inlines, inline),
                    None => *i += 1,
                },
            }
        }

        inlines
    }

    /// Collect a single inline node at `events[*i]`.
    /// Leaves `*i` untouched and returns `None` when the event is not inline.
    fn collect_inline(&self, events: &Events<'_>, i: &mut usize) -> Option<Inline> {
        let (ref ev, ref range) = events[*i];

        let inline = match ev {
            Event::Text(s) => {
                *i += 1;
                Inline::Text(s.to_string())
            }
            Event::Code(s) => {
                *i += 1;
                Inline::CodeSpan(s.to_string())
            }
            Event::SoftBreak => {
                *i += 1;
                Inline::SoftBreak
            }
            Event::HardBreak => {
                *i += 1;
                Inline::HardBreak
            }
            Event::InlineHtml(_) => {
                warn!(
                    "ignoring inline HTML on line {}",
                    self.lines.line_number(range.start)
                );
                return None;
            }
            Event::Start(Tag::Strong) => {
                *i += 1;
                Inline::Strong(self.collect_inlines(events, i, &|e| matches!(e, TagEnd::Strong)))
            }
            Event::Start(Tag::Emphasis) => {
                *i += 1;
                Inline::Emphasis(self.collect_inlines(events, i, &|e| matches!(e, TagEnd::Emphasis)))
            }
            Event::Start(Tag::Strikethrough) => {
                *i += 1;
                Inline::Strikethrough(
                    self.collect_inlines(events, i, &|e| matches!(e, TagEnd::Strikethrough)),
                )
            }
            Event::Start(Tag::Link {
                dest_url, title, ..
            }) => {
                let dest = dest_url.to_string();
                let title = title.to_string();
                *i += 1;
                let content = self.collect_inlines(events, i, &|e| matches!(e, TagEnd::Link));
                Inline::Link {
                    dest,
                    title,
                    content,
                }
            }
            Event::Start(Tag::Image {
                dest_url, title, ..
            }) => {
                let dest = dest_url.to_string();
                let title = title.to_string();
                *i += 1;
                let alt = self.collect_inlines(events, i, &|e| matches!(e, TagEnd::Image));
                Inline::Image { dest, title, alt }
            }
            _ => return None,
        };

        Some(inline)
    }

    /// Collect table headers and rows, checking each row against the header width.
    fn collect_table(
        &mut self,
        events: &Events<'_>,
        i: &mut usize,
        alignments: Vec<Alignment>,
    ) -> Table {
        let columns = alignments.len();
        let mut header: Vec<Text> = Vec::new();
        let mut rows: Vec<Vec<Text>> = Vec::new();
        let mut in_head = false;
        let mut current_row: Vec<Text> = Vec::new();

        while *i < events.len() {
            let (ref ev, ref range) = events[*i];
            match ev {
                Event::End(TagEnd::Table) => {
                    *i += 1;
                    break;
                }
                Event::Start(Tag::TableHead) => {
                    in_head = true;
                    *i += 1;
                }
                Event::End(TagEnd::TableHead) => {
                    in_head = false;
                    header = std::mem::take(&mut current_row);
                    *i += 1;
                }
                Event::Start(Tag::TableRow) => {
                    current_row = Vec::new();
                    self.check_row_width(range.start, columns);
                    *i += 1;
                }
                Event::End(TagEnd::TableRow) => {
                    if !in_head {
                        rows.push(std::mem::take(&mut current_row));
                    }
                    *i += 1;
                }
                Event::Start(Tag::TableCell) => {
                    *i += 1;
                    let cell = self.collect_inlines(events, i, &|e| matches!(e, TagEnd::TableCell));
                    current_row.push(Text(cell));
                }
                _ => {
                    *i += 1;
                }
            }
        }

        Table {
            alignments,
            header,
            rows,
        }
    }

    /// pulldown-cmark pads short rows and drops extra cells, so the width is
    /// checked against the raw source line.
    fn check_row_width(&mut self, offset: usize, columns: usize) {
        let line = self.lines.line_number(offset);
        let line_span = self.lines.line_range(self.source, line);
        let cells = count_cells(&self.source[line_span.clone()]);
        if cells != columns {
            self.errors.push(ContentError::malformed(
                line,
                line_span,
                format!(
                    "table row has {} cells but the header has {}",
                    cells, columns
                ),
            ));
        }
    }

    /// Close sections from the stack down to the given heading level.
    fn close_sections_to_level(&mut self, new_level: u8, span_end: usize) {
        // Pop sections at the same or deeper level than the new heading
        while self
            .section_stack
            .last()
            .is_some_and(|top| top.level >= new_level)
        {
            if let Some(builder) = self.section_stack.pop() {
                self.attach(builder.into_section(span_end));
            }
        }
    }

    fn attach(&mut self, section: Section) {
        match self.section_stack.last_mut() {
            Some(parent) => parent.children.push(section),
            None => self.top_sections.push(section),
        }
    }

    fn finalize(mut self) -> Result<Document, Vec<ContentError>> {
        let end = self.source.len();

        while let Some(builder) = self.section_stack.pop() {
            self.attach(builder.into_section(end));
        }

        if !self.errors.is_empty() {
            debug!("parse failed with {} error(s)", self.errors.len());
            return Err(self.errors);
        }

        debug!(
            "parsed {} top-level section(s), title: {:?}",
            self.top_sections.len(),
            self.title
        );

        Ok(Document {
            title: self.title,
            preamble: self.preamble,
            sections: self.top_sections,
            source_id: self.file_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The first heading names the document when it is the only level-1 heading
/// and other headings follow it.
fn find_title_heading(events: &Events<'_>) -> Option<usize> {
    let headings: Vec<(usize, HeadingLevel)> = events
        .iter()
        .enumerate()
        .filter_map(|(idx, (ev, _))| match ev {
            Event::Start(Tag::Heading { level, .. }) => Some((idx, *level)),
            _ => None,
        })
        .collect();

    let (first_idx, first_level) = *headings.first()?;
    let h1_count = headings
        .iter()
        .filter(|(_, level)| *level == HeadingLevel::H1)
        .count();

    (first_level == HeadingLevel::H1 && h1_count == 1 && headings.len() > 1).then_some(first_idx)
}

fn heading_level_to_u8(level: &HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Collect heading text (all Text events until End(Heading)).
fn collect_heading_text(events: &Events<'_>, i: &mut usize) -> String {
    let mut name = String::new();
    while *i < events.len() {
        let (ref ev, _) = events[*i];
        match ev {
            Event::End(TagEnd::Heading(_)) => {
                *i += 1;
                break;
            }
            Event::Text(s) | Event::Code(s) => {
                name.push_str(s);
                *i += 1;
            }
            // Setext headings can span several lines.
            Event::SoftBreak | Event::HardBreak => {
                name.push(' ');
                *i += 1;
            }
            _ => {
                *i += 1;
            }
        }
    }
    name
}

/// Strip leading/trailing whitespace, collapse interior whitespace.
fn normalize_title(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collect all text content until a matching End tag.
fn collect_text_until(events: &Events<'_>, i: &mut usize, is_end: impl Fn(&TagEnd) -> bool) -> String {
    let mut text = String::new();
    while *i < events.len() {
        let (ref ev, _) = events[*i];
        match ev {
            Event::End(tag_end) if is_end(tag_end) => {
                *i += 1;
                break;
            }
            Event::Text(s) => {
                text.push_str(s);
                *i += 1;
            }
            _ => {
                *i += 1;
            }
        }
    }
    text
}

fn skip_until(events: &Events<'_>, i: &mut usize, is_end: impl Fn(&TagEnd) -> bool) {
    while *i < events.len() {
        let done = matches!(&events[*i].0, Event::End(tag_end) if is_end(tag_end));
        *i += 1;
        if done {
            break;
        }
    }
}

/// Append an inline, merging adjacent text runs. pulldown-cmark splits
/// text at escapes and stray brackets.
fn push_inline(inlines: &mut Vec<Inline>, inline: Inline) {
    if let Inline::Text(s) = &inline {
        if let Some(Inline::Text(prev)) = inlines.last_mut() {
            prev.push_str(s);
            return;
        }
    }
    inlines.push(inline);
}

/// Whether a fenced code block (as sliced from the source) ends with a
/// closing fence matching the opening one.
///
/// `opening_line` is the full source line of the opening fence. Its prefix
/// tells how many `>` markers each later line carries and how far the
/// block is indented inside its container; the closing fence may be
/// indented at most three spaces beyond that.
fn fence_is_closed(opening_line: &str, block: &str) -> bool {
    let Some(fence_at) = opening_line.find(['`', '~']) else {
        return false;
    };
    let opening = &opening_line[fence_at..];
    let Some(fence_char) = opening.chars().next() else {
        return false;
    };
    let fence_len = opening.chars().take_while(|&c| c == fence_char).count();

    let prefix = &opening_line[..fence_at];
    let quotes = prefix.matches('>').count();
    let indent = strip_quote_markers(prefix, quotes).chars().count();

    let mut lines = block.lines();
    lines.next();
    let Some(closing) = lines.last() else {
        return false;
    };

    let closing = strip_quote_markers(closing, quotes);
    let spaces = closing.chars().take_while(|&c| c == ' ').count();
    let closing = closing[spaces..].trim_end();
    spaces <= indent + 3
        && closing.chars().count() >= fence_len
        && closing.chars().all(|c| c == fence_char)
}

/// Remove `count` block-quote markers (`>` plus one optional space).
fn strip_quote_markers(line: &str, count: usize) -> &str {
    let mut rest = line;
    for _ in 0..count {
        let trimmed = rest.trim_start_matches(' ');
        match trimmed.strip_prefix('>') {
            Some(after) => rest = after.strip_prefix(' ').unwrap_or(after),
            None => break,
        }
    }
    rest
}

/// Drop indentation and block-quote markers in front of a line.
fn strip_container_prefix(line: &str) -> &str {
    line.trim_start_matches(|c: char| c == '>' || c.is_whitespace())
}

/// Count the cells of a raw pipe-table row, honoring `\|` escapes and
/// optional leading/trailing pipes.
fn count_cells(row: &str) -> usize {
    let row = strip_container_prefix(row).trim_end();
    let row = row.strip_prefix('|').unwrap_or(row);

    let mut pipes = Vec::new();
    let mut escaped = false;
    for (idx, c) in row.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '|' => pipes.push(idx),
            _ => {}
        }
    }

    let mut cells = pipes.len() + 1;
    if pipes.last().is_some_and(|&p| p + 1 == row.len()) {
        cells -= 1;
    }
    cells
}
