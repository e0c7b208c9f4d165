use std::ops::Range;

use crate::ast::{Assignment, FunctionDef, Identifier, Node};
use crate::operators;
use crate::parser::MAX_PARSE_DEPTH;
use crate::parser::desugar::Desugared;
use crate::parser::error::ParseError;
use crate::synthetic::SYNTHETIC_PREFIX_WIDTH;

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    // Literals
    Number(f64),
    Str(String),
    True,
    False,
    Null,

    // Identifiers & keywords
    Ident(String),
    Def,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,       // =
    EqEq,     // ==
    BangEq,   // !=
    Gt,
    Lt,
    GtEq,
    LtEq,
    AmpAmp,   // &&
    PipePipe, // ||
    Bang,     // !
    Question, // ?
    Colon,    // :
    Comma,
    Dot,
    DotDot, // ..
    Semicolon,

    // Grouping
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(n) => format!("number `{}`", n),
        Token::Str(_) => "string literal".to_string(),
        Token::True => "`true`".to_string(),
        Token::False => "`false`".to_string(),
        Token::Null => "`null`".to_string(),
        Token::Ident(name) => format!("identifier `{}`", name),
        Token::Def => "`def`".to_string(),
        other => {
            let text = match other {
                Token::Plus => "+",
                Token::Minus => "-",
                Token::Star => "*",
                Token::Slash => "/",
                Token::Percent => "%",
                Token::Eq => "=",
                Token::EqEq => "==",
                Token::BangEq => "!=",
                Token::Gt => ">",
                Token::Lt => "<",
                Token::GtEq => ">=",
                Token::LtEq => "<=",
                Token::AmpAmp => "&&",
                Token::PipePipe => "||",
                Token::Bang => "!",
                Token::Question => "?",
                Token::Colon => ":",
                Token::Comma => ",",
                Token::Dot => ".",
                Token::DotDot => "..",
                Token::Semicolon => ";",
                Token::LParen => "(",
                Token::RParen => ")",
                Token::LBracket => "[",
                Token::RBracket => "]",
                Token::LBrace => "{",
                Token::RBrace => "}",
                _ => "token",
            };
            format!("`{}`", text)
        }
    }
}

pub(crate) type Spanned = (Token, Range<usize>);

// ---------------------------------------------------------------------------
// Line index: desugared byte offset → 1-based source (line, column)
// ---------------------------------------------------------------------------

pub(crate) struct LineIndex<'a> {
    source: &'a str,
    starts: Vec<usize>,
    desugared: &'a Desugared,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str, desugared: &'a Desugared) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        LineIndex {
            source,
            starts,
            desugared,
        }
    }

    /// Source position of an offset into the desugared text. Columns count
    /// characters, not bytes.
    ///
    /// On the first line of a rewritten statement, columns include the width
    /// of that statement's own `temp… = ` prefix, as if it had been typed.
    /// Prefixes inserted ahead of other statements are never counted.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let original = self.desugared.original_offset(offset);
        let (line, column) = self.locate(original);
        match self.desugared.synthetic_statement(original) {
            Some(start) if self.locate(start).0 == line => (line, column + SYNTHETIC_PREFIX_WIDTH),
            _ => (line, column),
        }
    }

    fn locate(&self, offset: usize) -> (usize, usize) {
        let line = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let column = self.source[self.starts[line]..offset].chars().count() + 1;
        (line + 1, column)
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

pub(crate) fn tokenize(text: &str, file_id: usize) -> (Vec<Spanned>, Vec<ParseError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let single = |token: Token| (token, start..start + c.len_utf8());
        match c {
            c if c.is_whitespace() => {}

            // String literal
            '"' => {
                let mut value = String::new();
                let mut end = None;
                for (i, ch) in chars.by_ref() {
                    if ch == '"' {
                        end = Some(i + 1);
                        break;
                    }
                    value.push(ch);
                }
                match end {
                    Some(end) => tokens.push((Token::Str(value), start..end)),
                    None => errors.push(ParseError::error(
                        "unterminated string literal",
                        start..text.len(),
                        file_id,
                    )),
                }
            }

            // Numbers; a `.` only continues the number when a digit follows,
            // so `1..5` lexes as a range
            '0'..='9' => {
                let mut end = start + 1;
                while let Some(&(i, ch)) = chars.peek() {
                    let fraction = ch == '.'
                        && text[i + 1..].starts_with(|d: char| d.is_ascii_digit())
                        && !text[start..i].contains('.');
                    if ch.is_ascii_digit() || fraction {
                        chars.next();
                        end = i + 1;
                    } else {
                        break;
                    }
                }
                match text[start..end].parse::<f64>() {
                    Ok(n) => tokens.push((Token::Number(n), start..end)),
                    Err(_) => errors.push(ParseError::error("invalid number", start..end, file_id)),
                }
            }

            // Identifiers and keywords
            c if c.is_alphabetic() || c == '_' => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, ch)) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        chars.next();
                        end = i + ch.len_utf8();
                    } else {
                        break;
                    }
                }
                let token = match &text[start..end] {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    "def" => Token::Def,
                    ident => Token::Ident(ident.to_string()),
                };
                tokens.push((token, start..end));
            }

            // Two-character operators
            '=' | '!' | '>' | '<' | '&' | '|' | '.' => {
                let next = chars.peek().map(|&(_, ch)| ch);
                let double = match (c, next) {
                    ('=', Some('=')) => Some(Token::EqEq),
                    ('!', Some('=')) => Some(Token::BangEq),
                    ('>', Some('=')) => Some(Token::GtEq),
                    ('<', Some('=')) => Some(Token::LtEq),
                    ('&', Some('&')) => Some(Token::AmpAmp),
                    ('|', Some('|')) => Some(Token::PipePipe),
                    ('.', Some('.')) => Some(Token::DotDot),
                    _ => None,
                };
                if let Some(token) = double {
                    chars.next();
                    tokens.push((token, start..start + 2));
                    continue;
                }
                match c {
                    '=' => tokens.push(single(Token::Eq)),
                    '!' => tokens.push(single(Token::Bang)),
                    '>' => tokens.push(single(Token::Gt)),
                    '<' => tokens.push(single(Token::Lt)),
                    '.' => tokens.push(single(Token::Dot)),
                    _ => errors.push(ParseError::error(
                        format!("unexpected character `{}`", c),
                        start..start + 1,
                        file_id,
                    ).with_note(format!("did you mean `{}{}`?", c, c))),
                }
            }

            // Single-character operators
            '+' => tokens.push(single(Token::Plus)),
            '-' => tokens.push(single(Token::Minus)),
            '*' => tokens.push(single(Token::Star)),
            '/' => tokens.push(single(Token::Slash)),
            '%' => tokens.push(single(Token::Percent)),
            '?' => tokens.push(single(Token::Question)),
            ':' => tokens.push(single(Token::Colon)),
            ',' => tokens.push(single(Token::Comma)),
            ';' => tokens.push(single(Token::Semicolon)),
            '(' => tokens.push(single(Token::LParen)),
            ')' => tokens.push(single(Token::RParen)),
            '[' => tokens.push(single(Token::LBracket)),
            ']' => tokens.push(single(Token::RBracket)),
            '{' => tokens.push(single(Token::LBrace)),
            '}' => tokens.push(single(Token::RBrace)),

            _ => errors.push(ParseError::error(
                format!("unexpected character `{}`", c),
                start..start + c.len_utf8(),
                file_id,
            )),
        }
    }

    (tokens, errors)
}

// ---------------------------------------------------------------------------
// Pratt parser
// ---------------------------------------------------------------------------

pub(crate) struct StatementParser<'a> {
    tokens: Vec<Spanned>,
    pos: usize,
    lines: &'a LineIndex<'a>,
    file_id: usize,
    text_len: usize,
    /// Current nesting, see [`MAX_PARSE_DEPTH`].
    depth: usize,
}

// Binding powers (precedence). Higher = tighter binding.
// Left bp, right bp. For left-assoc: right = left + 1. For right-assoc: right = left.
const BP_CONDITIONAL: u8 = 2; // ? :
const BP_RANGE: u8 = 3; // ..
const BP_OR: u8 = 4; // ||
const BP_AND: u8 = 6; // &&
const BP_EQUALITY: u8 = 8; // == !=
const BP_COMPARISON: u8 = 10; // < > <= >=
const BP_ADDITIVE: u8 = 12; // + -
const BP_MULTIPLICATIVE: u8 = 14; // * / %
const BP_UNARY: u8 = 16; // ! -

impl<'a> StatementParser<'a> {
    pub fn new(tokens: Vec<Spanned>, lines: &'a LineIndex<'a>, file_id: usize, text_len: usize) -> Self {
        StatementParser {
            tokens,
            pos: 0,
            lines,
            file_id,
            text_len,
            depth: 0,
        }
    }

    /// Parse every statement, recovering at the next top-level `;` after an
    /// error so that all errors of the block are reported together.
    pub fn parse_statements(&mut self) -> (Vec<Node>, Vec<ParseError>) {
        let mut nodes = Vec::new();
        let mut errors = Vec::new();

        loop {
            while self.eat(&Token::Semicolon) {}
            if self.at_end() {
                break;
            }
            let start = self.pos;
            match self.parse_statement() {
                Ok(node) => nodes.push(node),
                Err(error) => {
                    errors.push(error);
                    self.recover(start);
                }
            }
        }

        (nodes, errors)
    }

    fn recover(&mut self, start: usize) {
        self.pos = start;
        let mut depth = 0u32;
        while let Some((token, _)) = self.advance() {
            match token {
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => depth = depth.saturating_sub(1),
                Token::Semicolon if depth == 0 => break,
                _ => {}
            }
        }
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current_span(&self) -> Range<usize> {
        match self.tokens.get(self.pos) {
            Some((_, span)) => span.clone(),
            None => self.text_len..self.text_len,
        }
    }

    /// Line of the most recently consumed token.
    fn previous_line(&self) -> usize {
        let offset = self
            .pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |(_, span)| span.start);
        self.lines.position(offset).0
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::error(message, self.current_span(), self.file_id)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => self.error(format!("expected {}, found {}", expected, describe(token))),
            None => self.error(format!("expected {}, found end of input", expected)),
        }
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, ParseError>) -> Result<T, ParseError> {
        if self.depth >= MAX_PARSE_DEPTH {
            return Err(self.too_deep());
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn check_depth(&self, depth: usize) -> Result<(), ParseError> {
        if depth > MAX_PARSE_DEPTH {
            Err(self.too_deep())
        } else {
            Ok(())
        }
    }

    fn too_deep(&self) -> ParseError {
        self.error("nesting too deep")
            .with_note(format!("at most {} levels of nesting are supported", MAX_PARSE_DEPTH))
    }

    fn expect(&mut self, token: &Token, expected: &str) -> Result<(), ParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Range<usize>), ParseError> {
        match self.peek() {
            Some(Token::Ident(_)) => match self.advance() {
                Some((Token::Ident(name), span)) => Ok((name, span)),
                _ => Err(self.unexpected("identifier")),
            },
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// A statement ends at `;`, at the end of input, or before the `}` that
    /// closes a function body.
    fn expect_terminator(&mut self) -> Result<(), ParseError> {
        if self.at_end() || self.eat(&Token::Semicolon) || self.peek() == Some(&Token::RBrace) {
            Ok(())
        } else {
            Err(self.unexpected("`;`"))
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Node, ParseError> {
        if self.peek() == Some(&Token::Def) {
            return self.parse_function();
        }
        let expr = self.parse_expr(0)?;
        let node = if self.peek() == Some(&Token::Eq) {
            self.finish_assignment(expr)?
        } else {
            expr
        };
        self.expect_terminator()?;
        Ok(node)
    }

    fn finish_assignment(&mut self, target: Node) -> Result<Node, ParseError> {
        self.nested(|parser| parser.assignment_link(target))
    }

    fn assignment_link(&mut self, target: Node) -> Result<Node, ParseError> {
        let target = match target {
            Node::Identifier(id) if id.index.is_none() => id,
            other => {
                return Err(self
                    .error(format!("cannot assign to {}", other.shape()))
                    .with_note("only plain names can be assigned"));
            }
        };
        self.pos += 1; // `=`
        let value = self.parse_expr(0)?;
        let value = if self.peek() == Some(&Token::Eq) {
            self.finish_assignment(value)?
        } else {
            value
        };
        Ok(Node::Assignment(Assignment {
            start_line: target.line,
            target,
            value: Box::new(value),
            end_line: self.previous_line(),
        }))
    }

    fn parse_function(&mut self) -> Result<Node, ParseError> {
        self.nested(Self::parse_definition)
    }

    fn parse_definition(&mut self) -> Result<Node, ParseError> {
        let def_span = self.current_span();
        self.pos += 1; // `def`
        let start_line = self.lines.position(def_span.start).0;
        let (name, _) = self.expect_ident()?;

        self.expect(&Token::LParen, "`(`")?;
        let mut params = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                params.push(self.expect_ident()?.0);
                if self.eat(&Token::Comma) {
                    continue;
                }
                self.expect(&Token::RParen, "`,` or `)`")?;
                break;
            }
        }
        let signature_end = self.previous_line();

        if self.eat(&Token::LBrace) {
            let mut body = Vec::new();
            loop {
                while self.eat(&Token::Semicolon) {}
                match self.peek() {
                    Some(Token::RBrace) => break,
                    None => {
                        return Err(ParseError::error("unclosed function body", self.current_span(), self.file_id)
                            .with_related(def_span, "function defined here")
                            .with_note("add a closing `}`"));
                    }
                    _ => body.push(self.parse_statement()?),
                }
            }
            self.pos += 1; // `}`
            let body_end = self.previous_line();
            self.eat(&Token::Semicolon);
            Ok(Node::FunctionDef(FunctionDef {
                name,
                params,
                body,
                start_line,
                end_line: signature_end,
                body_end_line: Some(body_end),
            }))
        } else if self.peek() == Some(&Token::Eq) {
            let (line, column) = self.lines.position(self.current_span().start);
            self.pos += 1; // `=`
            let value = self.parse_expr(0)?;
            let end_line = self.previous_line();
            self.expect_terminator()?;
            let result = Node::Assignment(Assignment {
                target: Identifier::new("return", line, column),
                value: Box::new(value),
                start_line: line,
                end_line,
            });
            Ok(Node::FunctionDef(FunctionDef {
                name,
                params,
                body: vec![result],
                start_line,
                end_line,
                body_end_line: None,
            }))
        } else {
            Err(self.unexpected("`{` or `=` after the function signature"))
        }
    }

    // ------------------------------------------------------------------
    // Pratt parser core
    // ------------------------------------------------------------------

    fn parse_expr(&mut self, min_bp: u8) -> Result<Node, ParseError> {
        self.nested(|parser| parser.parse_binary(min_bp))
    }

    /// Operators fold iteratively into the left operand, so the tree depth is
    /// tracked here as well as the recursion depth.
    fn parse_binary(&mut self, min_bp: u8) -> Result<Node, ParseError> {
        let mut left = self.parse_prefix()?;
        let mut depth = left.depth();
        self.check_depth(depth)?;

        loop {
            let Some(token) = self.peek() else { break };
            let Some((l_bp, r_bp)) = infix_bp(token) else { break };
            if l_bp < min_bp {
                break;
            }

            let Some((op, _)) = self.advance() else { break };
            left = match op {
                Token::Question => {
                    let true_branch = self.parse_expr(0)?;
                    self.expect(&Token::Colon, "`:` in conditional")?;
                    let false_branch = self.parse_expr(r_bp)?;
                    depth = depth.max(true_branch.depth()).max(false_branch.depth()) + 1;
                    Node::Conditional {
                        condition: Box::new(left),
                        true_branch: Box::new(true_branch),
                        false_branch: Box::new(false_branch),
                    }
                }
                Token::DotDot => {
                    let end = self.parse_expr(r_bp)?;
                    let step = if self.eat(&Token::DotDot) {
                        Some(Box::new(self.parse_expr(r_bp)?))
                    } else {
                        None
                    };
                    depth = depth.max(end.depth()).max(step.as_ref().map_or(0, |step| step.depth())) + 1;
                    Node::Range {
                        start: Box::new(left),
                        end: Box::new(end),
                        step,
                    }
                }
                op => {
                    let name = operator_function(&op).ok_or_else(|| self.error("unexpected infix operator"))?;
                    let right = self.parse_expr(r_bp)?;
                    depth = depth.max(right.depth()) + 1;
                    Node::Call {
                        name: name.to_string(),
                        args: vec![left, right],
                    }
                }
            };
            self.check_depth(depth)?;
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Node, ParseError> {
        let primary = match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                let operand = self.parse_expr(BP_UNARY)?;
                return Ok(Node::Call {
                    name: operators::NEG.to_string(),
                    args: vec![operand],
                });
            }
            Some(Token::Bang) => {
                self.pos += 1;
                let operand = self.parse_expr(BP_UNARY)?;
                return Ok(Node::Call {
                    name: operators::NOT.to_string(),
                    args: vec![operand],
                });
            }
            _ => self.parse_primary()?,
        };
        self.parse_postfix(primary)
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let Some((token, span)) = self.advance() else {
            return Err(self.error("unexpected end of expression"));
        };

        match token {
            Token::Number(n) => Ok(Node::Number(n)),
            Token::Str(s) => Ok(Node::String(s)),
            Token::True => Ok(Node::Boolean(true)),
            Token::False => Ok(Node::Boolean(false)),
            Token::Null => Ok(Node::Null),

            Token::Ident(name) => {
                if self.eat(&Token::LParen) {
                    let args = self.parse_arguments(&Token::RParen, "`)`")?;
                    Ok(Node::Call { name, args })
                } else {
                    let (line, column) = self.lines.position(span.start);
                    Ok(Node::Identifier(Identifier::new(name, line, column)))
                }
            }

            Token::LParen => {
                let expr = self.parse_expr(0)?;
                self.expect(&Token::RParen, "`)`")
                    .map_err(|e| e.with_related(span, "unclosed `(`"))?;
                Ok(expr)
            }

            Token::LBrace => Ok(Node::List(self.parse_arguments(&Token::RBrace, "`}`")?)),
            Token::LBracket => Ok(Node::List(self.parse_arguments(&Token::RBracket, "`]`")?)),

            other => Err(ParseError::error(
                format!("unexpected {}", describe(&other)),
                span,
                self.file_id,
            )),
        }
    }

    /// Indexing and dotted calls bind tighter than any operator.
    fn parse_postfix(&mut self, mut node: Node) -> Result<Node, ParseError> {
        let mut depth = node.depth();
        self.check_depth(depth)?;
        loop {
            if self.eat(&Token::LBracket) {
                let index = self.parse_expr(0)?;
                self.expect(&Token::RBracket, "`]`")?;
                depth = depth.max(index.depth()) + 1;
                node = match node {
                    Node::Identifier(mut id) if id.index.is_none() => {
                        id.index = Some(Box::new(index));
                        Node::Identifier(id)
                    }
                    base => Node::Index {
                        base: Box::new(base),
                        index: Box::new(index),
                    },
                };
            } else if self.eat(&Token::Dot) {
                let (name, _) = self.expect_ident()?;
                let args = if self.eat(&Token::LParen) {
                    self.parse_arguments(&Token::RParen, "`)`")?
                } else {
                    Vec::new()
                };
                let call = Node::Call { name, args };
                depth = depth.max(call.depth()) + 1;
                node = Node::DotCall {
                    target: Box::new(node),
                    call: Box::new(call),
                };
            } else {
                return Ok(node);
            }
            self.check_depth(depth)?;
        }
    }

    /// Comma-separated expressions up to and including `close`.
    fn parse_arguments(&mut self, close: &Token, expected: &str) -> Result<Vec<Node>, ParseError> {
        let mut args = Vec::new();
        if self.eat(close) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr(0)?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(close, expected)?;
            return Ok(args);
        }
    }
}

/// Infix binding powers: returns (left_bp, right_bp) or None if not infix.
fn infix_bp(token: &Token) -> Option<(u8, u8)> {
    match token {
        Token::Question => Some((BP_CONDITIONAL, BP_CONDITIONAL)),
        Token::DotDot => Some((BP_RANGE, BP_RANGE + 1)),
        Token::PipePipe => Some((BP_OR, BP_OR + 1)),
        Token::AmpAmp => Some((BP_AND, BP_AND + 1)),
        Token::EqEq | Token::BangEq => Some((BP_EQUALITY, BP_EQUALITY + 1)),
        Token::Gt | Token::Lt | Token::GtEq | Token::LtEq => Some((BP_COMPARISON, BP_COMPARISON + 1)),
        Token::Plus | Token::Minus => Some((BP_ADDITIVE, BP_ADDITIVE + 1)),
        Token::Star | Token::Slash | Token::Percent => Some((BP_MULTIPLICATIVE, BP_MULTIPLICATIVE + 1)),
        _ => None,
    }
}

fn operator_function(token: &Token) -> Option<&'static str> {
    let name = match token {
        Token::Plus => operators::ADD,
        Token::Minus => operators::SUB,
        Token::Star => operators::MUL,
        Token::Slash => operators::DIV,
        Token::Percent => operators::MOD,
        Token::EqEq => operators::EQ,
        Token::BangEq => operators::NE,
        Token::Gt => operators::GT,
        Token::Lt => operators::LT,
        Token::GtEq => operators::GE,
        Token::LtEq => operators::LE,
        Token::AmpAmp => operators::AND,
        Token::PipePipe => operators::OR,
        _ => return None,
    };
    Some(name)
}
