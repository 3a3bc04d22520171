use std::ops::Range;

use codespan_reporting::files;

/// Maps byte offsets to 1-based line numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        LineIndex {
            starts: files::line_starts(source).collect(),
        }
    }

    /// 1-based line containing `offset`.
    pub fn line_number(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }

    /// Byte range of a 1-based line, without its line terminator.
    pub fn line_range(&self, source: &str, line: usize) -> Range<usize> {
        let start = self.starts[line - 1];
        let end = self.starts.get(line).copied().unwrap_or(source.len());
        let text = &source[start..end];
        start..start + text.trim_end_matches(['\n', '\r']).len()
    }
}
