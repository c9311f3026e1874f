//! Position tracking over the script text
//!
//! Keeps the byte offset and the 1-based line number in step. Lines are counted as
//! characters are consumed, so restoring a saved mark is the only way to move back.

/// A saved cursor position, plus the token count at the time it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pub offset: usize,
    pub line: usize,
    pub tokens: usize,
}

#[derive(Debug, Clone)]
pub struct SourceCursor<'a> {
    text: &'a str,
    offset: usize,
    line: usize,
}

impl<'a> SourceCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            offset: 0,
            line: 1,
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn rest(&self) -> &'a str {
        &self.text[self.offset..]
    }

    pub fn at_end(&self) -> bool {
        self.offset >= self.text.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Jump to a known position. `line` must be the line of `offset`.
    pub fn seek(&mut self, offset: usize, line: usize) {
        self.offset = offset.min(self.text.len());
        self.line = line;
    }

    /// Consume `len` bytes, counting newlines.
    pub fn advance(&mut self, len: usize) {
        let end = (self.offset + len).min(self.text.len());
        self.line += self.text[self.offset..end].matches('\n').count();
        self.offset = end;
    }

    /// Skip whitespace and `//` comments.
    pub fn skip_trivia(&mut self) {
        loop {
            let rest = self.rest();
            let ws: usize = rest
                .chars()
                .take_while(|c| c.is_whitespace())
                .map(char::len_utf8)
                .sum();
            if ws > 0 {
                self.advance(ws);
                continue;
            }
            if rest.starts_with("//") {
                let comment = rest.find('\n').unwrap_or(rest.len());
                self.advance(comment);
                continue;
            }
            break;
        }
    }

    /// Line of an offset at or after the current position.
    pub fn line_at(&self, offset: usize) -> usize {
        let end = offset.clamp(self.offset, self.text.len());
        self.line + self.text[self.offset..end].matches('\n').count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_whitespace_and_comments_counting_lines() {
        let mut cursor = SourceCursor::new("  // note\n\t// more\n  pass");
        cursor.skip_trivia();
        assert_eq!(cursor.rest(), "pass");
        assert_eq!(cursor.line(), 3);
    }

    #[test]
    fn seek_restores_position() {
        let mut cursor = SourceCursor::new("a\nb\nc");
        cursor.advance(4);
        assert_eq!(cursor.line(), 3);
        cursor.seek(2, 2);
        assert_eq!(cursor.peek(), Some('b'));
        assert_eq!(cursor.line_at(4), 3);
    }

    #[test]
    fn advance_stops_at_end() {
        let mut cursor = SourceCursor::new("ab");
        cursor.advance(10);
        assert!(cursor.at_end());
        assert_eq!(cursor.peek(), None);
    }
}
