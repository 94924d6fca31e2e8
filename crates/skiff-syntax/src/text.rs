use std::sync::Arc;

use thiserror::Error;

/// Average characters per line estimate for pre-allocation.
const ESTIMATED_CHARS_PER_LINE: usize = 60;

/// A range in the source text, represented as byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextRange {
    start: u32,
    end: u32,
}

impl TextRange {
    pub const fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub const fn empty(offset: u32) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub const fn start(self) -> u32 {
        self.start
    }

    pub const fn end(self) -> u32 {
        self.end
    }

    pub const fn len(self) -> u32 {
        self.end - self.start
    }

    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    pub const fn contains(self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }

    pub const fn contains_inclusive(self, offset: u32) -> bool {
        self.start <= offset && offset <= self.end
    }

    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start as usize..self.end as usize]
    }
}

/// A position in the source text as line and column (both 0-indexed).
///
/// Columns count UTF-16 code units, matching the protocol side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Coordinates that do not land inside the text they were applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OutOfRange {
    #[error("line {line} is past the last line of the text")]
    Line { line: u32 },
    #[error("column {column} is past the end of line {line}")]
    Column { line: u32, column: u32 },
    #[error("offset {offset} is past the end of the text (len {len})")]
    Offset { offset: u32, len: u32 },
}

/// One immutable snapshot of a file's text plus its line-start table.
///
/// LSP speaks line/UTF-16 columns while the lexer and parser speak byte
/// offsets. Conversions are only meaningful against the exact text they
/// were computed from, so the two live in one value and every offset
/// handed out by this type is tied to this snapshot.
#[derive(Debug, Clone)]
pub struct SourceText {
    text: Arc<str>,
    /// Byte offset where each line starts. First element is always 0.
    line_starts: Vec<u32>,
}

impl SourceText {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let text: Arc<str> = text.into();
        let estimated_lines = text.len() / ESTIMATED_CHARS_PER_LINE + 1;
        let mut line_starts = Vec::with_capacity(estimated_lines);
        line_starts.push(0);

        // SIMD-accelerated newline search
        let bytes = text.as_bytes();
        let mut pos = 0;
        while let Some(idx) = memchr::memchr(b'\n', &bytes[pos..]) {
            let absolute_pos = pos + idx + 1;
            line_starts.push(absolute_pos as u32);
            pos = absolute_pos;
        }

        Self { text, line_starts }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn arc(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    /// Total length of the snapshot in bytes.
    pub fn len(&self) -> u32 {
        self.text.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of lines in the snapshot.
    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    /// Convert a byte offset to a line/UTF-16-column position.
    ///
    /// `offset == len` is valid and names the end of the text.
    pub fn position(&self, offset: u32) -> Result<Position, OutOfRange> {
        if offset > self.len() {
            return Err(OutOfRange::Offset {
                offset,
                len: self.len(),
            });
        }

        let line = self
            .line_starts
            .binary_search(&offset)
            .unwrap_or_else(|next_line| next_line - 1);

        let line_start = self.line_starts[line];
        let column = self.utf16_column(line_start, offset);

        Ok(Position::new(line as u32, column))
    }

    /// Convert a line/UTF-16-column position to a byte offset.
    ///
    /// A column pointing past the line's content (the newline itself is
    /// not addressable) or into the middle of a surrogate pair is
    /// rejected rather than clamped.
    pub fn offset(&self, position: Position) -> Result<u32, OutOfRange> {
        let line = position.line as usize;
        let line_start = *self
            .line_starts
            .get(line)
            .ok_or(OutOfRange::Line {
                line: position.line,
            })? as usize;
        let line_end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.len()) as usize;
        let line_text = self.text[line_start..line_end].trim_end_matches('\n');

        let out_of_line = OutOfRange::Column {
            line: position.line,
            column: position.column,
        };

        let mut utf16_column = 0u32;
        for (byte_idx, ch) in line_text.char_indices() {
            if utf16_column == position.column {
                return Ok((line_start + byte_idx) as u32);
            }
            utf16_column += ch.len_utf16() as u32;
            if utf16_column > position.column {
                // Position is in the middle of a UTF-16 surrogate pair.
                return Err(out_of_line);
            }
        }

        if utf16_column == position.column {
            Ok((line_start + line_text.len()) as u32)
        } else {
            Err(out_of_line)
        }
    }

    /// Convert a TextRange to start/end positions.
    pub fn range_positions(&self, range: TextRange) -> Result<(Position, Position), OutOfRange> {
        Ok((self.position(range.start())?, self.position(range.end())?))
    }

    fn utf16_column(&self, line_start: u32, offset: u32) -> u32 {
        let start = line_start as usize;
        let end = offset.min(self.len()) as usize;
        let mut consumed = start;
        let mut column = 0u32;
        let line = self.text.get(start..).unwrap_or("");

        for ch in line.chars() {
            let next = consumed + ch.len_utf8();
            if next > end {
                break;
            }
            consumed = next;
            column += ch.len_utf16() as u32;
            if consumed == end {
                break;
            }
        }

        column
    }
}
