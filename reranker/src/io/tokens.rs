use std::io::BufRead;
use std::str::FromStr;

use failure::Error;

use crate::io::{PTBFormat, ReadTree};
use crate::Tree;

const CONTEXT_LEN: usize = 1000;

/// Reader for whitespace separated tokens and bracketed trees.
///
/// Trees may span several lines. Errors report the line number and the input that follows the
/// failure.
pub struct TokenReader<R> {
    read: R,
    buffer: String,
    pos: usize,
    line_no: usize,
}

impl<R> TokenReader<R>
where
    R: BufRead,
{
    /// Constructs a new token reader.
    pub fn new(read: R) -> Self {
        TokenReader {
            read,
            buffer: String::new(),
            pos: 0,
            line_no: 0,
        }
    }

    /// Get the number of the line currently read.
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Get the remainder of the current line followed by further input.
    ///
    /// Collects at most 1000 characters.
    pub fn context(&mut self) -> String {
        let mut context = self.buffer[self.pos..].to_string();
        while context.len() < CONTEXT_LEN {
            let mut line = String::new();
            match self.read.read_line(&mut line) {
                Ok(n) if n > 0 => context.push_str(&line),
                _ => break,
            }
        }
        context.chars().take(CONTEXT_LEN).collect()
    }

    /// Build an error for malformed input.
    pub fn malformed(&mut self, message: impl AsRef<str>) -> Error {
        let line_no = self.line_no;
        let context = self.context();
        format_err!(
            "{} at line {}, remaining input:\n{}",
            message.as_ref(),
            line_no,
            context
        )
    }

    fn read_line(&mut self) -> Result<bool, Error> {
        self.buffer.clear();
        self.pos = 0;
        let n = self.read.read_line(&mut self.buffer)?;
        if n > 0 {
            self.line_no += 1;
        }
        Ok(n > 0)
    }

    // Moves to the next non-whitespace character, returns false at the end of input.
    fn skip_whitespace(&mut self) -> Result<bool, Error> {
        Ok(self.skip_blank()?.is_some())
    }

    /// Skip whitespace and peek at the next character.
    ///
    /// Returns the number of line breaks skipped and the next character, `None` at the end of
    /// input.
    pub fn skip_blank(&mut self) -> Result<Option<(usize, char)>, Error> {
        let mut newlines = 0;
        loop {
            let rest = &self.buffer[self.pos..];
            let trimmed = rest.trim_start();
            newlines += rest[..rest.len() - trimmed.len()]
                .chars()
                .filter(|&c| c == '\n')
                .count();
            self.pos += rest.len() - trimmed.len();
            if let Some(c) = trimmed.chars().next() {
                return Ok(Some((newlines, c)));
            }
            if !self.read_line()? {
                return Ok(None);
            }
        }
    }

    /// Read the remainder of the current line, `None` at the end of input.
    ///
    /// If the current line is exhausted, the next line is read. The line break is consumed
    /// but not returned.
    pub fn next_line(&mut self) -> Result<Option<String>, Error> {
        if self.pos >= self.buffer.len() && !self.read_line()? {
            return Ok(None);
        }
        let line = self.buffer[self.pos..]
            .trim_end_matches(|c| c == '\n' || c == '\r')
            .to_string();
        self.pos = self.buffer.len();
        Ok(Some(line))
    }

    /// Read the next whitespace delimited token, `None` at the end of input.
    pub fn next_token(&mut self) -> Result<Option<String>, Error> {
        if !self.skip_whitespace()? {
            return Ok(None);
        }
        let rest = &self.buffer[self.pos..];
        let len = rest.find(char::is_whitespace).unwrap_or_else(|| rest.len());
        let token = rest[..len].to_string();
        self.pos += len;
        Ok(Some(token))
    }

    /// Read a token and parse it, failing at the end of input.
    pub fn parse_token<T>(&mut self, what: &str) -> Result<T, Error>
    where
        T: FromStr,
    {
        match self.next_token()? {
            Some(token) => match token.parse() {
                Ok(value) => Ok(value),
                Err(_) => Err(self.malformed(format!("Expected {}, found '{}'", what, token))),
            },
            None => Err(format_err!("Expected {}, found end of input", what)),
        }
    }

    /// Read the next tree, `None` at the end of input.
    ///
    /// A tree is either a bracketed tree, possibly spanning several lines, or a bare token.
    pub fn next_tree(&mut self) -> Result<Option<Tree>, Error> {
        if !self.skip_whitespace()? {
            return Ok(None);
        }
        if !self.buffer[self.pos..].starts_with('(') {
            return match self.next_token()? {
                Some(token) => Ok(Some(Tree::new(token))),
                None => Ok(None),
            };
        }

        let mut text = String::new();
        let mut depth = 0usize;
        let mut in_quotes = false;
        let mut escaped = false;
        loop {
            let rest = &self.buffer[self.pos..];
            let mut end = None;
            for (idx, c) in rest.char_indices() {
                if escaped {
                    escaped = false;
                    continue;
                }
                match c {
                    '\\' => escaped = true,
                    '"' => in_quotes = !in_quotes,
                    '(' if !in_quotes => depth += 1,
                    ')' if !in_quotes => {
                        depth -= 1;
                        if depth == 0 {
                            end = Some(idx + 1);
                            break;
                        }
                    }
                    _ => (),
                }
            }
            match end {
                Some(end) => {
                    text.push_str(&rest[..end]);
                    self.pos += end;
                    break;
                }
                None => {
                    text.push_str(rest);
                    if !self.read_line()? {
                        return Err(format_err!(
                            "Unexpected end of input in tree at line {}:\n{}",
                            self.line_no,
                            text
                        ));
                    }
                }
            }
        }

        match PTBFormat::Plain.string_to_tree(&text) {
            Ok(tree) => Ok(Some(tree)),
            Err(err) => Err(self.malformed(format!("Malformed tree ({}): {}", err, text))),
        }
    }

    /// Read the next tree, failing at the end of input.
    pub fn expect_tree(&mut self) -> Result<Tree, Error> {
        self.next_tree()?
            .ok_or_else(|| format_err!("Expected a tree, found end of input"))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::io::{PTBFormat, TokenReader, WriteTree};
    use crate::Navigate;

    #[test]
    fn tokens_and_trees() {
        let input = "2\n1 sent.0\n  -12.5 (S1 (NP (DT the)\n (NN dog)))\n-13.25\n(S1 (NP (NN dog)))\n";
        let mut reader = TokenReader::new(Cursor::new(input));
        assert_eq!(reader.parse_token::<usize>("count").unwrap(), 2);
        assert_eq!(reader.parse_token::<usize>("count").unwrap(), 1);
        assert_eq!(reader.next_token().unwrap().unwrap(), "sent.0");
        assert_eq!(reader.parse_token::<f64>("log prob").unwrap(), -12.5);
        let tree = reader.expect_tree().unwrap();
        assert_eq!(
            PTBFormat::Plain.tree_to_string(&tree),
            "(S1 (NP (DT the) (NN dog)))"
        );
        assert_eq!(reader.line_no(), 4);
        assert_eq!(reader.parse_token::<f64>("log prob").unwrap(), -13.25);
        assert!(reader.next_tree().unwrap().is_some());
        assert!(reader.next_tree().unwrap().is_none());
        assert!(reader.next_token().unwrap().is_none());
    }

    #[test]
    fn lines_and_blanks() {
        let input = "-1.5\t(S1 (NN a))\n\n\n-2\t(S1 (NN b))\n";
        let mut reader = TokenReader::new(Cursor::new(input));
        assert_eq!(reader.skip_blank().unwrap(), Some((0, '-')));
        assert_eq!(reader.next_line().unwrap().unwrap(), "-1.5\t(S1 (NN a))");
        assert_eq!(reader.next_line().unwrap().unwrap(), "");
        assert_eq!(reader.skip_blank().unwrap(), Some((1, '-')));
        assert_eq!(reader.parse_token::<f64>("log prob").unwrap(), -2.);
        assert_eq!(reader.next_line().unwrap().unwrap(), "\t(S1 (NN b))");
        assert_eq!(reader.skip_blank().unwrap(), None);
        assert_eq!(reader.next_line().unwrap(), None);
    }

    #[test]
    fn quoted_parens() {
        let input = "(S1 (NP (NN \":-)\")))";
        let mut reader = TokenReader::new(Cursor::new(input));
        let tree = reader.expect_tree().unwrap();
        assert_eq!(tree.terminals(true), vec![":-)"]);
    }

    #[test]
    fn malformed_input() {
        let mut reader = TokenReader::new(Cursor::new("x (S1 (NP (DT))) rest"));
        assert!(reader.parse_token::<usize>("count").is_err());
        let mut reader = TokenReader::new(Cursor::new("(S1 (NP (DT))) rest"));
        let err = reader.next_tree().unwrap_err();
        assert!(err.to_string().contains("rest"));
        let mut reader = TokenReader::new(Cursor::new("(S1 (NP (DT the)"));
        assert!(reader.next_tree().is_err());
    }
}
