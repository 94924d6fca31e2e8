mod store;

pub use store::{DocumentStore, SharedDocumentStore};

use skiff_syntax::{ParseResult, SourceText};

/// An open editor buffer. The text here shadows whatever is on disk
/// until the document is closed.
#[derive(Debug)]
pub struct Document {
    pub uri: String,
    pub version: i32,
    pub text: SourceText,
    parse: Option<ParseResult>,
}

impl Document {
    pub fn new(uri: String, version: i32, content: String) -> Self {
        Self {
            uri,
            version,
            text: SourceText::new(content),
            parse: None,
        }
    }

    pub fn update(&mut self, version: i32, content: String) {
        self.version = version;
        self.text = SourceText::new(content);
        self.parse = None;
    }

    /// Parse the current text, reusing the cached result if the text has
    /// not changed since the last parse.
    pub fn parse(&mut self) -> &ParseResult {
        if self.parse.is_none() {
            self.parse = Some(skiff_syntax::parse(self.text.as_str()));
        }
        match self.parse.as_ref() {
            Some(parse) => parse,
            None => unreachable!("parse cache initialized above"),
        }
    }
}
