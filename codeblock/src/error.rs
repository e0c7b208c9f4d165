use thiserror::Error;

/// Everything that can go wrong while turning a block's text into ports.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodeBlockError {
    /// The parser rejected the text. One diagnostic message per line.
    #[error("{0}")]
    Syntax(String),

    /// A top-level name is already defined by another block of the graph.
    #[error("{name} is already defined")]
    Redefinition { name: String },

    /// A top-level node is neither an assignment nor a function definition.
    /// The grammar and the analyzer disagree; editing the text cannot fix it.
    #[error("unsupported top-level statement: {shape}")]
    Structural { shape: &'static str },

    /// Function definitions or expressions nest past `limit` levels.
    #[error("nested deeper than {limit} levels")]
    TooDeep { limit: usize },

    /// Code generation was handed the wrong number of input values.
    #[error("expected {expected} input values, got {supplied}")]
    MissingInputs { expected: usize, supplied: usize },
}

impl CodeBlockError {
    /// Errors the user can fix by editing the block's text.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CodeBlockError::Syntax(_) | CodeBlockError::Redefinition { .. }
        )
    }
}
