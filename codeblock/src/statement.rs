use crate::variable::VariableRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// A user-written assignment: `a = b + 1;`
    Expression,
    /// A bare number or string: `5;`
    Literal,
    /// A bare list literal: `{1, 2};`
    Collection,
    /// A bare name: `a;`
    AssignmentVar,
    FuncDeclaration,
    /// Any other bare expression: `a + 1;`
    None,
}

/// The analysis of one top-level (or function-body) statement.
///
/// Only [`StatementKind::FuncDeclaration`] statements have sub-statements, and
/// they define and reference nothing themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub(crate) kind: StatementKind,
    pub(crate) start_line: usize,
    pub(crate) end_line: usize,
    pub(crate) defined_variables: Vec<VariableRef>,
    pub(crate) referenced_variables: Vec<VariableRef>,
    pub(crate) sub_statements: Vec<Statement>,
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn start_line(&self) -> usize {
        self.start_line
    }

    pub fn end_line(&self) -> usize {
        self.end_line
    }

    /// Defined variables in left-to-right order, unique by name.
    pub fn defined_variables(&self) -> &[VariableRef] {
        &self.defined_variables
    }

    pub fn referenced_variables(&self) -> &[VariableRef] {
        &self.referenced_variables
    }

    pub fn sub_statements(&self) -> &[Statement] {
        &self.sub_statements
    }

    pub fn first_defined(&self) -> Option<&VariableRef> {
        self.defined_variables.first()
    }

    pub fn defines(&self, name: &str) -> bool {
        self.defined_variables.iter().any(|v| v.name() == name)
    }
}
