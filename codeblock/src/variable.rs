use blocklang::Identifier;

/// One occurrence of a variable name in the block's source.
///
/// Rows and columns are 1-based. Synthetic references carry no column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRef {
    name: String,
    row: usize,
    start_column: Option<usize>,
}

impl VariableRef {
    pub fn from_identifier(identifier: &Identifier) -> Self {
        VariableRef {
            name: identifier.name.clone(),
            row: identifier.line,
            start_column: Some(identifier.column),
        }
    }

    /// A name with only a line number, for text the user never typed.
    pub fn synthetic(name: impl Into<String>, row: usize) -> Self {
        VariableRef {
            name: name.into(),
            row,
            start_column: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn start_column(&self) -> Option<usize> {
        self.start_column
    }

    pub fn end_column(&self) -> Option<usize> {
        self.start_column.map(|column| column + self.name.chars().count())
    }

    /// Copy of this reference moved `width` columns to the left.
    pub(crate) fn shifted_back(&self, width: usize) -> Self {
        VariableRef {
            name: self.name.clone(),
            row: self.row,
            start_column: self.start_column.map(|column| column.saturating_sub(width).max(1)),
        }
    }
}
