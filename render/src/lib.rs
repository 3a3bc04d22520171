//! Renderers that turn a parsed [`refdoc::Document`] back into display form.
//!
//! Every renderer is a pure function of its inputs: the same Document,
//! table of contents and options always produce byte-identical output.
//! Code examples are copied through untouched.

mod html;
mod markdown;
mod text;

use log::debug;
use refdoc::{Document, TableOfContents};

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Canonical Markdown. Parsing it again yields an equivalent Document.
    #[default]
    Markdown,
    Html,
    Text,
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub format: Format,
    /// Wrap HTML output in a complete page. Ignored by other formats.
    pub standalone: bool,
}

pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Renderer { options }
    }

    /// Render a whole document. When `toc` is given it is placed after the
    /// document title, before the preamble.
    pub fn render(&self, doc: &Document, toc: Option<&TableOfContents>) -> String {
        debug!(
            "rendering {} section(s) as {:?}",
            doc.sections.len(),
            self.options.format
        );
        match self.options.format {
            Format::Markdown => markdown::render_document(doc, toc),
            Format::Html => html::render_document(doc, toc, self.options.standalone),
            Format::Text => text::render_document(doc, toc),
        }
    }

    /// Render only the table of contents.
    pub fn render_toc(&self, toc: &TableOfContents) -> String {
        match self.options.format {
            Format::Markdown => markdown::render_toc(toc),
            Format::Html => html::render_toc(toc),
            Format::Text => text::render_toc(toc),
        }
    }
}
