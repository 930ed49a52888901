//! Source coordinates
//!
//! Lines and characters are zero-based. A character is one Unicode scalar
//! value; conversion to UTF-16 code units happens only at the editor boundary
//! through [`LineIndex::utf16_column`].

use serde::{Deserialize, Serialize};

/// A zero-based line/character coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }

    /// The first character of the document
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.character + 1)
    }
}

/// A half-open `[start, end)` span between two positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Zero-width range at `pos`
    pub const fn point(pos: Position) -> Self {
        Self::new(pos, pos)
    }

    /// Zero-width range at the start of the document
    pub const fn zero() -> Self {
        Self::point(Position::zero())
    }

    /// Range on a single line
    pub const fn on_line(line: u32, start: u32, end: u32) -> Self {
        Self::new(Position::new(line, start), Position::new(line, end))
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `pos` falls inside this range.
    ///
    /// A position on the start line must not precede `start`, and a position
    /// on the end line must not lie past `end`. A cursor sitting right after
    /// the last character of a token still counts as inside it.
    pub fn contains(&self, pos: Position) -> bool {
        if pos.line < self.start.line || pos.line > self.end.line {
            return false;
        }
        if pos.line == self.start.line && pos.character < self.start.character {
            return false;
        }
        if pos.line == self.end.line && pos.character > self.end.character {
            return false;
        }
        true
    }

    /// Whether `other` lies entirely inside this range
    pub fn encloses(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy)]
struct LineStart {
    byte: usize,
    char: usize,
}

/// Maps character offsets to positions for one source text
#[derive(Debug, Clone)]
pub struct LineIndex {
    text: String,
    lines: Vec<LineStart>,
    total_chars: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut lines = vec![LineStart { byte: 0, char: 0 }];
        let mut chars = 0;
        for (byte, ch) in text.char_indices() {
            chars += 1;
            if ch == '\n' {
                lines.push(LineStart {
                    byte: byte + 1,
                    char: chars,
                });
            }
        }

        Self {
            text: text.to_string(),
            lines,
            total_chars: chars,
        }
    }

    /// Number of lines, counting a trailing empty line after a final newline
    pub fn line_count(&self) -> u32 {
        self.lines.len() as u32
    }

    /// Total number of characters in the text
    pub fn len_chars(&self) -> usize {
        self.total_chars
    }

    /// Convert a character offset into a position, clamping past the end
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.total_chars);
        let line = match self.lines.binary_search_by(|l| l.char.cmp(&offset)) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        Position::new(line as u32, (offset - self.lines[line].char) as u32)
    }

    /// Convert a position into a character offset
    pub fn offset(&self, pos: Position) -> Option<usize> {
        let start = self.lines.get(pos.line as usize)?;
        let len = self.line_len(pos.line) as usize;
        let character = (pos.character as usize).min(len);
        Some(start.char + character)
    }

    /// Text of a line without its line terminator
    pub fn line_text(&self, line: u32) -> Option<&str> {
        let start = self.lines.get(line as usize)?.byte;
        let end = self
            .lines
            .get(line as usize + 1)
            .map(|l| l.byte)
            .unwrap_or(self.text.len());
        Some(self.text[start..end].trim_end_matches(['\n', '\r']))
    }

    /// Length of a line in characters, excluding the terminator
    pub fn line_len(&self, line: u32) -> u32 {
        self.line_text(line)
            .map(|t| t.chars().count() as u32)
            .unwrap_or(0)
    }

    /// Column of `pos` measured in UTF-16 code units
    pub fn utf16_column(&self, pos: Position) -> u32 {
        let Some(text) = self.line_text(pos.line) else {
            return pos.character;
        };
        let (taken, units) = text
            .chars()
            .take(pos.character as usize)
            .fold((0u32, 0u32), |(n, units), c| (n + 1, units + c.len_utf16() as u32));
        // Columns past the end of the line (expected positions) count one unit each
        units + (pos.character - taken)
    }

    /// Extend `pos` to the end of the whitespace-delimited word it starts
    pub fn word_end(&self, pos: Position) -> Position {
        let Some(text) = self.line_text(pos.line) else {
            return pos;
        };
        let word = text
            .chars()
            .skip(pos.character as usize)
            .take_while(|c| !c.is_whitespace())
            .count();
        Position::new(pos.line, pos.character + word as u32)
    }
}
