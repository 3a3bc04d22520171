use std::fmt::{self, Write as _};
use std::ops::Range;

/// A parsed reference document: an optional title, an optional preamble,
/// and the ordered top-level sections.
///
/// Documents are built once by the parser and never mutated afterwards; an
/// edited source produces a new Document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The single level-1 heading that names the whole document, if any.
    pub title: Option<String>,
    /// Blocks that appear before the first section heading.
    pub preamble: Vec<Block>,
    /// Top-level sections in source order.
    pub sections: Vec<Section>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.preamble.is_empty() && self.sections.is_empty()
    }

    /// Titles of the top-level sections, in order.
    pub fn section_titles(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.title.as_str()).collect()
    }

    /// Depth-first walk over every section. Top-level sections have depth 0.
    pub fn outline(&self) -> Outline<'_> {
        Outline {
            stack: vec![(0, self.sections.iter())],
        }
    }

    /// Find a section at any depth by its anchor.
    pub fn find(&self, anchor: &str) -> Option<&Section> {
        self.outline()
            .map(|(_, section)| section)
            .find(|section| section.anchor == anchor)
    }
}

/// Iterator returned by [`Document::outline`].
pub struct Outline<'a> {
    stack: Vec<(usize, std::slice::Iter<'a, Section>)>,
}

impl<'a> Iterator for Outline<'a> {
    type Item = (usize, &'a Section);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (depth, iter) = self.stack.last_mut()?;
            let depth = *depth;
            match iter.next() {
                Some(section) => {
                    self.stack.push((depth + 1, section.children.iter()));
                    return Some((depth, section));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// A titled section introduced by a Markdown heading.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Heading text, whitespace-normalized.
    pub title: String,
    /// URL-safe identifier derived from the title.
    pub anchor: String,
    /// Heading level: 1 = `#`, 6 = `######`.
    pub level: u8,
    /// Content between this heading and the first sub-section heading.
    pub body: Vec<Block>,
    /// Sub-sections nested under this heading.
    pub children: Vec<Section>,
    /// 1-based line of the heading.
    pub line: usize,
    /// Byte span in source for error reporting.
    pub span: Range<usize>,
    /// Source position of each `body` block, index for index.
    pub block_positions: Vec<Position>,
}

/// Where a block starts in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub span: Range<usize>,
}

impl Section {
    pub fn is_empty(&self) -> bool {
        self.body.is_empty() && self.children.is_empty()
    }
}

/// One structural unit within a section body.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Text),
    BulletList(Vec<ListItem>),
    NumberedList { start: u64, items: Vec<ListItem> },
    Table(Table),
    /// A fenced or indented code block. `code` is kept byte-for-byte.
    CodeExample {
        language: Option<String>,
        code: String,
    },
    Quote(Vec<Block>),
    Rule,
}

impl Block {
    /// Visit this block and every block nested inside it, outermost first.
    pub fn visit<'a>(&'a self, f: &mut dyn FnMut(&'a Block)) {
        f(self);
        match self {
            Block::BulletList(items) | Block::NumberedList { items, .. } => {
                for item in items {
                    for child in &item.children {
                        child.visit(f);
                    }
                }
            }
            Block::Quote(blocks) => {
                for block in blocks {
                    block.visit(f);
                }
            }
            _ => {}
        }
    }

    /// Link destinations appearing directly in this block's own text
    /// (nested blocks are reached through [`Block::visit`]).
    pub fn link_targets(&self) -> Vec<&str> {
        let mut targets = Vec::new();
        match self {
            Block::Paragraph(text) => text.collect_links(&mut targets),
            Block::BulletList(items) | Block::NumberedList { items, .. } => {
                for item in items {
                    item.text.collect_links(&mut targets);
                }
            }
            Block::Table(table) => {
                for cell in table.header.iter().chain(table.rows.iter().flatten()) {
                    cell.collect_links(&mut targets);
                }
            }
            Block::CodeExample { .. } | Block::Quote(_) | Block::Rule => {}
        }
        targets
    }
}

/// A list entry: its leading text plus any nested blocks (sub-lists, code).
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub text: Text,
    pub children: Vec<Block>,
}

/// A pipe table. Every data row has exactly `header.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub alignments: Vec<Alignment>,
    pub header: Vec<Text>,
    pub rows: Vec<Vec<Text>>,
}

impl Table {
    pub fn columns(&self) -> usize {
        self.header.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    None,
    Left,
    Center,
    Right,
}

/// A run of inline content (a paragraph, list item, or table cell).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Text(pub Vec<Inline>);

impl Text {
    pub fn plain_str(s: impl Into<String>) -> Self {
        Text(vec![Inline::Text(s.into())])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The text with all formatting removed.
    pub fn plain(&self) -> String {
        let mut out = String::new();
        for inline in &self.0 {
            inline.push_plain(&mut out);
        }
        out
    }

    fn collect_links<'a>(&'a self, out: &mut Vec<&'a str>) {
        for inline in &self.0 {
            inline.collect_links(out);
        }
    }
}

/// Inline elements that appear within a line of text.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    CodeSpan(String),
    Link {
        dest: String,
        title: String,
        content: Vec<Inline>,
    },
    Image {
        dest: String,
        title: String,
        alt: Vec<Inline>,
    },
    SoftBreak,
    HardBreak,
}

impl Inline {
    fn push_plain(&self, out: &mut String) {
        match self {
            Inline::Text(s) | Inline::CodeSpan(s) => out.push_str(s),
            Inline::Strong(children)
            | Inline::Emphasis(children)
            | Inline::Strikethrough(children)
            | Inline::Link {
                content: children, ..
            }
            | Inline::Image { alt: children, .. } => {
                for child in children {
                    child.push_plain(out);
                }
            }
            Inline::SoftBreak => out.push(' '),
            Inline::HardBreak => out.push('\n'),
        }
    }

    fn collect_links<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Inline::Link { dest, content, .. } => {
                out.push(dest);
                for child in content {
                    child.collect_links(out);
                }
            }
            Inline::Strong(children) | Inline::Emphasis(children) | Inline::Strikethrough(children) => {
                for child in children {
                    child.collect_links(out);
                }
            }
            _ => {}
        }
    }
}

// Display renders canonical inline Markdown. Parsing the output again yields
// the same inline nodes.

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_inlines(f, &self.0, true)
    }
}

impl fmt::Display for Inline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inline::Text(s) => write_escaped(f, s, false),
            Inline::Strong(children) => {
                write!(f, "**")?;
                write_inlines(f, children, false)?;
                write!(f, "**")
            }
            Inline::Emphasis(children) => {
                write!(f, "*")?;
                write_inlines(f, children, false)?;
                write!(f, "*")
            }
            Inline::Strikethrough(children) => {
                write!(f, "~~")?;
                write_inlines(f, children, false)?;
                write!(f, "~~")
            }
            Inline::CodeSpan(code) => {
                let fence = "`".repeat(longest_run(code, '`') + 1);
                let pad = code.starts_with('`')
                    || code.ends_with('`')
                    || (code.starts_with(' ') && code.ends_with(' ') && !code.trim().is_empty());
                if pad {
                    write!(f, "{fence} {code} {fence}")
                } else {
                    write!(f, "{fence}{code}{fence}")
                }
            }
            Inline::Link {
                dest,
                title,
                content,
            } => {
                write!(f, "[")?;
                write_inlines(f, content, false)?;
                write!(f, "]")?;
                write_destination(f, dest, title)
            }
            Inline::Image { dest, title, alt } => {
                write!(f, "![")?;
                write_inlines(f, alt, false)?;
                write!(f, "]")?;
                write_destination(f, dest, title)
            }
            Inline::SoftBreak => writeln!(f),
            Inline::HardBreak => writeln!(f, "\\"),
        }
    }
}

/// `at_line_start` is true when the first inline begins a line of output.
fn write_inlines(f: &mut fmt::Formatter<'_>, inlines: &[Inline], mut at_line_start: bool) -> fmt::Result {
    for inline in inlines {
        match inline {
            Inline::Text(s) => write_escaped(f, s, at_line_start)?,
            other => write!(f, "{}", other)?,
        }
        at_line_start = match inline {
            Inline::SoftBreak | Inline::HardBreak => true,
            Inline::Text(s) if s.is_empty() => at_line_start,
            _ => false,
        };
    }
    Ok(())
}

fn write_escaped(f: &mut fmt::Formatter<'_>, s: &str, at_line_start: bool) -> fmt::Result {
    let mut marker = if at_line_start { block_marker(s) } else { None };
    let mut chars = s.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        let entity = c == '&' && next.is_some_and(|n| n == '#' || n.is_ascii_alphanumeric());
        if marker == Some(idx)
            || entity
            || matches!(c, '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '~' | '#')
        {
            f.write_char('\\')?;
        }
        f.write_char(c)?;

        if c == '\n' {
            marker = block_marker(&s[idx + 1..]).map(|m| m + idx + 1);
        }
    }
    Ok(())
}

/// Byte offset of the character that would open a block construct (list
/// item, setext underline, thematic break) if `line` started a line.
fn block_marker(line: &str) -> Option<usize> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    match line.as_bytes().get(digits) {
        Some(b'-' | b'+' | b'=') if digits == 0 => Some(0),
        Some(b'.' | b')') if digits > 0 => Some(digits),
        _ => None,
    }
}

fn write_destination(f: &mut fmt::Formatter<'_>, dest: &str, title: &str) -> fmt::Result {
    write!(f, "(")?;
    if dest.contains(|c: char| c.is_whitespace() || c == '(' || c == ')') {
        write!(f, "<{}>", dest)?;
    } else {
        write!(f, "{}", dest)?;
    }
    if !title.is_empty() {
        write!(f, " \"{}\"", title.replace('"', "\\\""))?;
    }
    write!(f, ")")
}

/// Length of the longest run of `c` in `s`.
pub fn longest_run(s: &str, c: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in s.chars() {
        if ch == c {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}
