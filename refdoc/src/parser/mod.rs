mod lines;
mod structural;

pub use lines::LineIndex;

use crate::document::Document;
use crate::error::ContentError;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the source Markdown into a complete Document.
    ///
    /// Every structural error in the source is reported, not just the first.
    pub fn parse(&self) -> Result<Document, Vec<ContentError>> {
        structural::parse_document(&self.source, self.file_id)
    }
}
