use nom::character::complete::multispace0;

use crate::ast::SourcePosition;
use crate::error::{Message, ParserError};
use crate::parser::lexer;

/// A cursor over source text that knows where the text came from.
///
/// Raw text kept by refinable units is parsed with a cursor whose origin is
/// the position of that text in the original stylesheet, so positions of
/// refined units point into the stylesheet rather than into the fragment.
#[derive(Clone, Debug)]
pub struct Source<'a> {
    text: &'a str,
    offset: usize,
    origin: SourcePosition,
}

impl<'a> Source<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::at(text, None)
    }

    /// A cursor over `text`, which starts at `origin` in its stylesheet.
    pub fn at(text: &'a str, origin: Option<SourcePosition>) -> Self {
        Self {
            text,
            offset: 0,
            origin: origin.unwrap_or(SourcePosition::new(1, 1)),
        }
    }

    /// A cursor over `slice`, which must be part of this cursor's text.
    pub fn sub(&self, slice: &'a str) -> Source<'a> {
        Source::at(slice, Some(self.position_of(slice)))
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    /// The text not consumed yet.
    pub fn rest(&self) -> &'a str {
        &self.text[self.offset..]
    }

    pub fn is_empty(&self) -> bool {
        self.offset >= self.text.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Skip `bytes` bytes.
    pub fn advance(&mut self, bytes: usize) {
        self.offset = (self.offset + bytes).min(self.text.len());
    }

    /// Move to `rest`, a suffix of the remaining text, typically what a nom
    /// parser left over.
    pub fn advance_to(&mut self, rest: &'a str) {
        if let Some(offset) = self.offset_of(rest) {
            self.offset = offset.max(self.offset);
        }
    }

    /// Consume `expected` if it comes next.
    pub fn eat(&mut self, expected: char) -> bool {
        if self.rest().starts_with(expected) {
            self.advance(expected.len_utf8());
            true
        } else {
            false
        }
    }

    pub fn position(&self) -> SourcePosition {
        self.position_at(self.offset)
    }

    /// Position of `slice`, a sub-slice of this cursor's text.
    pub fn position_of(&self, slice: &str) -> SourcePosition {
        self.position_at(self.offset_of(slice).unwrap_or(self.offset))
    }

    /// Skip whitespace and comments. Returns whether anything was skipped.
    pub fn skip_whitespace(&mut self) -> Result<bool, ParserError> {
        let start = self.offset;
        loop {
            if let Ok((rest, _)) = multispace0::<&str, nom::error::Error<&str>>(self.rest()) {
                self.advance_to(rest);
            }
            if !self.rest().starts_with("/*") {
                break;
            }
            match lexer::comment(self.rest()) {
                Ok((rest, _)) => self.advance_to(rest),
                Err(_) => return Err(self.error(Message::UnclosedComment)),
            }
        }
        Ok(self.offset > start)
    }

    /// Fail unless only whitespace and comments are left.
    pub fn expect_consumed(&mut self) -> Result<(), ParserError> {
        self.skip_whitespace()?;
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.error(Message::UnparsableRemainder(self.rest().trim_end().to_string())))
        }
    }

    /// An error at the current position.
    pub fn error(&self, message: Message) -> ParserError {
        ParserError::new(self.position(), message)
    }

    fn offset_of(&self, slice: &str) -> Option<usize> {
        let start = self.text.as_ptr() as usize;
        let at = slice.as_ptr() as usize;
        (at >= start && at + slice.len() <= start + self.text.len()).then(|| at - start)
    }

    fn position_at(&self, offset: usize) -> SourcePosition {
        let before = &self.text[..offset.min(self.text.len())];
        match before.rfind('\n') {
            Some(newline) => SourcePosition::new(
                self.origin.line + before.matches('\n').count() as u32,
                before[newline + 1..].chars().count() as u32 + 1,
            ),
            None => SourcePosition::new(
                self.origin.line,
                self.origin.column + before.chars().count() as u32,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_follow_lines() {
        let mut source = Source::new("a {\n  color: red;\n}");
        source.advance(6);
        assert_eq!(source.position(), SourcePosition::new(2, 3));
    }

    #[test]
    fn sub_cursors_keep_the_origin() {
        let source = Source::new("a {\n  color: red;\n}");
        let value = &source.text()[13..16];
        assert_eq!(value, "red");
        let sub = source.sub(value);
        assert_eq!(sub.position(), SourcePosition::new(2, 10));
    }

    #[test]
    fn skip_whitespace_skips_comments() {
        let mut source = Source::new("  /* one */ /* two */ x");
        assert!(source.skip_whitespace().unwrap());
        assert_eq!(source.rest(), "x");
    }

    #[test]
    fn unclosed_comment_is_an_error() {
        let mut source = Source::new(" /* open");
        let error = source.skip_whitespace().unwrap_err();
        assert_eq!(error.message, Message::UnclosedComment);
    }

    #[test]
    fn leftovers_are_reported() {
        let mut source = Source::new("a }  ");
        source.advance(1);
        let error = source.expect_consumed().unwrap_err();
        assert_eq!(error.message, Message::UnparsableRemainder("}".to_string()));
        assert_eq!(error.position, SourcePosition::new(1, 3));
    }
}
