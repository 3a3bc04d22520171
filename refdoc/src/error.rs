use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use thiserror::Error;

/// Structural content errors. Both are deterministic: the same source always
/// fails the same way, so nothing is retried and no partial Document is kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    #[error("malformed content on line {line}: {reason}")]
    MalformedContent {
        line: usize,
        reason: String,
        span: Range<usize>,
    },

    #[error(
        "duplicate anchor `#{anchor}`: \"{title}\" on line {line} collides with \"{first_title}\" on line {first_line}"
    )]
    DuplicateAnchor {
        anchor: String,
        title: String,
        line: usize,
        span: Range<usize>,
        first_title: String,
        first_line: usize,
        first_span: Range<usize>,
    },
}

impl ContentError {
    pub fn malformed(line: usize, span: Range<usize>, reason: impl Into<String>) -> Self {
        ContentError::MalformedContent {
            line,
            reason: reason.into(),
            span,
        }
    }

    /// 1-based line the error points at.
    pub fn line(&self) -> usize {
        match self {
            ContentError::MalformedContent { line, .. } => *line,
            ContentError::DuplicateAnchor { line, .. } => *line,
        }
    }

    pub fn span(&self) -> Range<usize> {
        match self {
            ContentError::MalformedContent { span, .. } => span.clone(),
            ContentError::DuplicateAnchor { span, .. } => span.clone(),
        }
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        match self {
            ContentError::MalformedContent { reason, span, .. } => Diagnostic::error()
                .with_message("malformed content")
                .with_labels(vec![
                    Label::primary(file_id, span.clone()).with_message(reason.clone()),
                ]),
            ContentError::DuplicateAnchor {
                anchor,
                span,
                first_span,
                ..
            } => Diagnostic::error()
                .with_message(format!("duplicate anchor `#{}`", anchor))
                .with_labels(vec![
                    Label::primary(file_id, span.clone()).with_message("this heading"),
                    Label::secondary(file_id, first_span.clone())
                        .with_message("has the same anchor as this one"),
                ])
                .with_notes(vec![
                    "anchors are the lowercased title with spaces turned into hyphens and punctuation removed"
                        .to_string(),
                ]),
        }
    }
}
