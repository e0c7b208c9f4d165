pub mod ast;
pub mod free;
pub mod operators;
pub mod parser;
pub mod synthetic;

pub use ast::{Assignment, FunctionDef, Identifier, Node};
pub use parser::{MAX_PARSE_DEPTH, ParseError, Parser};
pub use synthetic::{SYNTHETIC_PREFIX_WIDTH, is_synthetic_temporary};

/// A parsed code block.
#[derive(Debug, Clone)]
pub struct ParsedBlock {
    /// Top-level statements, in source order.
    pub nodes: Vec<Node>,
    /// Names referenced but not defined at the top level, in first-use order.
    pub free_identifiers: Vec<String>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}
