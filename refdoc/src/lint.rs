use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};

use crate::document::{Block, Document, Position, Section};

/// A non-fatal finding about a Document's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
    /// 1-based line of the heading or block the warning is attached to.
    pub line: usize,
    pub span: Range<usize>,
    pub notes: Vec<String>,
}

impl Warning {
    fn at(section: &Section, message: impl Into<String>) -> Self {
        Warning {
            message: message.into(),
            line: section.line,
            span: section.span.start..section.span.start,
            notes: Vec::new(),
        }
    }

    /// Points at the body block containing the problem.
    fn in_block(position: &Position, message: impl Into<String>) -> Self {
        Warning {
            message: message.into(),
            line: position.line,
            span: position.span.clone(),
            notes: Vec::new(),
        }
    }

    fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        Diagnostic::warning()
            .with_message(&self.message)
            .with_labels(vec![Label::primary(file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Check a parsed Document for content problems that do not prevent
/// rendering: dangling in-document links, empty sections, untagged code
/// examples, and repeated anchors below the top level.
pub fn lint(doc: &Document) -> Vec<Warning> {
    let anchors: HashSet<&str> = doc.outline().map(|(_, s)| s.anchor.as_str()).collect();
    let mut first_by_anchor: HashMap<&str, (usize, &Section)> = HashMap::new();
    let mut warnings = Vec::new();

    for (depth, section) in doc.outline() {
        match first_by_anchor.get(section.anchor.as_str()) {
            // Two top-level sections colliding is a hard error from the TOC.
            Some((0, _)) if depth == 0 => {}
            Some((_, first)) => warnings.push(
                Warning::at(
                    section,
                    format!(
                        "section \"{}\" repeats the anchor `#{}`",
                        section.title, section.anchor
                    ),
                )
                .with_note(format!("first used by \"{}\" on line {}", first.title, first.line)),
            ),
            None => {
                first_by_anchor.insert(section.anchor.as_str(), (depth, section));
            }
        }

        if section.is_empty() {
            warnings.push(Warning::at(
                section,
                format!("section \"{}\" has no content", section.title),
            ));
        }

        for (block, position) in section.body.iter().zip(&section.block_positions) {
            block.visit(&mut |block| {
                for target in block.link_targets() {
                    if let Some(anchor) = target.strip_prefix('#') {
                        if !anchors.contains(anchor) {
                            warnings.push(
                                Warning::in_block(
                                    position,
                                    format!(
                                        "section \"{}\" links to unknown anchor `#{}`",
                                        section.title, anchor
                                    ),
                                )
                                .with_note(
                                    "in-document links must match the anchor of some section",
                                ),
                            );
                        }
                    }
                }

                if let Block::CodeExample { language: None, .. } = block {
                    warnings.push(Warning::in_block(
                        position,
                        format!(
                            "code example in \"{}\" has no language tag",
                            section.title
                        ),
                    ));
                }
            });
        }
    }

    warnings
}
