//! Block-tree surface over raw markdown text.
//!
//! The parser and exporter only need to know where headings sit; they take
//! this as an injected trait so tests can drive them without a real
//! markdown engine and the production tokenizer stays swappable.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u32,
    pub text: String,
    /// 1-based source line of the heading's first line.
    pub line: usize,
}

pub trait MarkdownSurface: Send + Sync {
    /// All block-level headings of a document, in source order.
    fn headings(&self, text: &str) -> Vec<Heading>;
}

/// Production surface backed by pulldown-cmark.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonMark;

impl MarkdownSurface for CommonMark {
    fn headings(&self, text: &str) -> Vec<Heading> {
        let mut headings = Vec::new();
        let mut current: Option<(u32, usize, String)> = None;

        for (event, range) in Parser::new_ext(text, Options::empty()).into_offset_iter() {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    let line = text[..range.start].bytes().filter(|b| *b == b'\n').count() + 1;
                    current = Some((level as u32, line, String::new()));
                }
                Event::Text(content) | Event::Code(content) => {
                    if let Some((_, _, buffer)) = current.as_mut() {
                        buffer.push_str(&content);
                    }
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some((level, line, buffer)) = current.take() {
                        headings.push(Heading {
                            level,
                            text: buffer.trim().to_string(),
                            line,
                        });
                    }
                }
                _ => {}
            }
        }

        headings
    }
}
