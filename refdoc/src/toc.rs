use std::collections::HashMap;

use crate::document::{Document, Section};
use crate::error::ContentError;

/// One table-of-contents line: a section title and the anchor it links to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub title: String,
    pub anchor: String,
    pub level: u8,
    /// Sub-section entries; empty unless a depth above 1 was requested.
    pub children: Vec<TocEntry>,
}

/// Index of a Document's sections, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOfContents {
    pub entries: Vec<TocEntry>,
}

impl TableOfContents {
    /// One entry per top-level section.
    pub fn generate(doc: &Document) -> Result<Self, ContentError> {
        Self::with_depth(doc, 1)
    }

    /// Entries for sections nested up to `depth` levels (1 = top-level only).
    /// Every anchor included must be unique.
    pub fn with_depth(doc: &Document, depth: usize) -> Result<Self, ContentError> {
        let mut seen = HashMap::new();
        let entries = collect_entries(&doc.sections, depth.max(1), &mut seen)?;
        Ok(TableOfContents { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether this TOC still describes `doc`: same sections in the same
    /// order with the same titles and anchors.
    pub fn is_in_sync(&self, doc: &Document) -> bool {
        entries_match(&self.entries, &doc.sections)
    }
}

fn collect_entries<'a>(
    sections: &'a [Section],
    remaining: usize,
    seen: &mut HashMap<&'a str, &'a Section>,
) -> Result<Vec<TocEntry>, ContentError> {
    let mut entries = Vec::with_capacity(sections.len());

    for section in sections {
        if let Some(first) = seen.insert(section.anchor.as_str(), section) {
            return Err(ContentError::DuplicateAnchor {
                anchor: section.anchor.clone(),
                title: section.title.clone(),
                line: section.line,
                span: section.span.clone(),
                first_title: first.title.clone(),
                first_line: first.line,
                first_span: first.span.clone(),
            });
        }

        let children = if remaining > 1 {
            collect_entries(&section.children, remaining - 1, seen)?
        } else {
            Vec::new()
        };

        entries.push(TocEntry {
            title: section.title.clone(),
            anchor: section.anchor.clone(),
            level: section.level,
            children,
        });
    }

    Ok(entries)
}

fn entries_match(entries: &[TocEntry], sections: &[Section]) -> bool {
    entries.len() == sections.len()
        && entries.iter().zip(sections).all(|(entry, section)| {
            entry.title == section.title
                && entry.anchor == section.anchor
                && (entry.children.is_empty() || entries_match(&entry.children, &section.children))
        })
}
