mod desugar;
pub mod error;
mod expression;

pub use error::ParseError;

use crate::ParsedBlock;
use crate::free::free_identifiers;
use crate::parser::desugar::desugar;
use crate::parser::expression::{LineIndex, StatementParser, tokenize};

/// Deepest nesting the parser accepts, counting nested expressions, links of
/// an assignment chain and enclosing function definitions. Expressions it
/// returns are never deeper than this.
pub const MAX_PARSE_DEPTH: usize = 128;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the block's source into top-level statements and its free
    /// identifiers. Bare expression statements come back as assignments to a
    /// synthetic temporary.
    pub fn parse(&self) -> Result<ParsedBlock, Vec<ParseError>> {
        let desugared = desugar(&self.source);

        let (tokens, lex_errors) = tokenize(&desugared.text, self.file_id);
        let mut errors = if lex_errors.is_empty() {
            let lines = LineIndex::new(&self.source, &desugared);
            let mut parser = StatementParser::new(tokens, &lines, self.file_id, desugared.text.len());
            let (nodes, errors) = parser.parse_statements();
            if errors.is_empty() {
                let free_identifiers = free_identifiers(&nodes);
                return Ok(ParsedBlock {
                    nodes,
                    free_identifiers,
                    source_id: self.file_id,
                });
            }
            errors
        } else {
            lex_errors
        };

        for error in &mut errors {
            error.map_spans(|span| desugared.original_span(span));
        }
        Err(errors)
    }
}
