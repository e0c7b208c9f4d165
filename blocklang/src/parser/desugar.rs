use std::ops::Range;

use crate::parser::MAX_PARSE_DEPTH;
use crate::synthetic::{SYNTHETIC_PREFIX_WIDTH, fresh_temporary};

/// Source text after every bare expression statement has been given a
/// synthetic temporary: `x + 1;` becomes `temp1f3c… = x + 1;`.
pub(crate) struct Desugared {
    pub text: String,
    /// Offsets into `text` where inserted text begins, ascending.
    insertions: Vec<usize>,
    /// Source ranges of the rewritten statements, ascending, without the `;`.
    statements: Vec<Range<usize>>,
}

impl Desugared {
    /// Map an offset in the desugared text back to the original source.
    /// Offsets inside inserted text map to the start of the statement.
    pub fn original_offset(&self, offset: usize) -> usize {
        let mut shift = 0;
        for &at in &self.insertions {
            if offset >= at + SYNTHETIC_PREFIX_WIDTH {
                shift += SYNTHETIC_PREFIX_WIDTH;
            } else if offset >= at {
                return at - shift;
            } else {
                break;
            }
        }
        offset - shift
    }

    pub fn original_span(&self, span: Range<usize>) -> Range<usize> {
        self.original_offset(span.start)..self.original_offset(span.end)
    }

    /// Start of the rewritten statement containing source offset `offset`.
    pub fn synthetic_statement(&self, offset: usize) -> Option<usize> {
        let after = self.statements.partition_point(|range| range.start <= offset);
        after
            .checked_sub(1)
            .map(|i| &self.statements[i])
            .filter(|range| range.contains(&offset))
            .map(|range| range.start)
    }
}

pub(crate) fn desugar(source: &str) -> Desugared {
    let mut scanner = Scanner {
        bytes: source.as_bytes(),
        pos: 0,
        depth: 0,
        statements: Vec::new(),
    };
    scanner.block(false);
    let statements = scanner.statements;

    let mut text = String::with_capacity(source.len() + statements.len() * SYNTHETIC_PREFIX_WIDTH);
    let mut insertions = Vec::with_capacity(statements.len());
    let mut last = 0;
    for statement in &statements {
        text.push_str(&source[last..statement.start]);
        insertions.push(text.len());
        text.push_str(&fresh_temporary());
        text.push_str(" = ");
        last = statement.start;
    }
    text.push_str(&source[last..]);

    Desugared {
        text,
        insertions,
        statements,
    }
}

// ---------------------------------------------------------------------------
// Statement scanner
// ---------------------------------------------------------------------------

/// Finds every statement that lacks a top-level `=`, at the top level and
/// inside braced function bodies. Only structure characters are inspected;
/// everything else is left to the parser.
struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Function bodies entered.
    depth: usize,
    statements: Vec<Range<usize>>,
}

impl Scanner<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn block(&mut self, in_body: bool) {
        loop {
            while matches!(self.peek(), Some(b) if b == b';' || b.is_ascii_whitespace()) {
                self.pos += 1;
            }
            match self.peek() {
                None => return,
                Some(b'}') if in_body => return,
                _ => {}
            }
            if self.at_keyword(b"def") {
                self.function(in_body);
            } else {
                let start = self.pos;
                if !self.statement(in_body) {
                    self.statements.push(start..self.pos);
                }
            }
        }
    }

    fn at_keyword(&self, keyword: &[u8]) -> bool {
        self.bytes[self.pos..].starts_with(keyword)
            && !matches!(
                self.bytes.get(self.pos + keyword.len()),
                Some(b) if b.is_ascii_alphanumeric() || *b == b'_'
            )
    }

    fn function(&mut self, in_body: bool) {
        self.pos += 3;
        let mut depth = 0u32;
        while let Some(b) = self.peek() {
            match b {
                b'"' => {
                    self.skip_string();
                    continue;
                }
                b'(' => depth += 1,
                b')' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.pos += 1;
                        break;
                    }
                }
                b';' | b'{' | b'=' if depth == 0 => break,
                _ => {}
            }
            self.pos += 1;
        }
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        if self.peek() == Some(b'{') {
            self.pos += 1;
            if self.depth < MAX_PARSE_DEPTH {
                self.depth += 1;
                self.block(true);
                self.depth -= 1;
            } else {
                // the parser rejects this body; don't recurse into it
                self.skip_body();
            }
            if self.peek() == Some(b'}') {
                self.pos += 1;
            }
        } else {
            self.statement(in_body);
        }
    }

    /// Advance to the end of the current statement. Returns whether it
    /// contains an assignment `=` outside any brackets.
    fn statement(&mut self, in_body: bool) -> bool {
        let mut depth = 0u32;
        let mut assigns = false;
        while let Some(b) = self.peek() {
            match b {
                b'"' => {
                    self.skip_string();
                    continue;
                }
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => {
                    if depth > 0 {
                        depth -= 1;
                    } else if b == b'}' && in_body {
                        return assigns;
                    }
                }
                b';' if depth == 0 => return assigns,
                b'=' if depth == 0 => {
                    if self.bytes.get(self.pos + 1) == Some(&b'=') {
                        self.pos += 2;
                        continue;
                    }
                    let prev = self.pos.checked_sub(1).map(|i| self.bytes[i]);
                    if !matches!(prev, Some(b'!' | b'<' | b'>')) {
                        assigns = true;
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        assigns
    }

    /// Advance to the `}` closing the current body.
    fn skip_body(&mut self) {
        let mut depth = 0u32;
        while let Some(b) = self.peek() {
            match b {
                b'"' => {
                    self.skip_string();
                    continue;
                }
                b'{' => depth += 1,
                b'}' if depth == 0 => return,
                b'}' => depth -= 1,
                _ => {}
            }
            self.pos += 1;
        }
    }

    fn skip_string(&mut self) {
        self.pos += 1;
        while let Some(b) = self.peek() {
            self.pos += 1;
            if b == b'"' {
                break;
            }
        }
    }
}
