pub mod anchor;
pub mod document;
pub mod error;
pub mod lint;
pub mod parser;
pub mod toc;

pub use anchor::slugify;
pub use document::{Alignment, Block, Document, Inline, ListItem, Position, Section, Table, Text};
pub use error::ContentError;
pub use lint::{Warning, lint};
pub use parser::Parser;
pub use toc::{TableOfContents, TocEntry};

/// Parse `source` and derive its top-level table of contents.
pub fn load(source: &str, file_id: usize) -> Result<(Document, TableOfContents), Vec<ContentError>> {
    let document = Parser::new(source.to_string(), file_id).parse()?;
    let toc = TableOfContents::generate(&document).map_err(|err| vec![err])?;
    Ok((document, toc))
}
