use blocklang::{
    Assignment, FunctionDef, Identifier, MAX_PARSE_DEPTH, Node, SYNTHETIC_PREFIX_WIDTH, is_synthetic_temporary,
};

use crate::error::CodeBlockError;
use crate::statement::{Statement, StatementKind};
use crate::variable::VariableRef;

/// Function definitions may nest at most this deep.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Analyze one top-level AST node.
///
/// Only assignments and function definitions are valid here; the parser wraps
/// every other statement in an assignment to a synthetic temporary, so any
/// other shape is a [`CodeBlockError::Structural`] error.
pub fn analyze(node: &Node) -> Result<Statement, CodeBlockError> {
    analyze_at(node, 0)
}

fn analyze_at(node: &Node, depth: usize) -> Result<Statement, CodeBlockError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(CodeBlockError::TooDeep {
            limit: MAX_NESTING_DEPTH,
        });
    }
    match node {
        Node::Assignment(assignment) => analyze_assignment(assignment),
        Node::FunctionDef(function) => analyze_function(function, depth),
        other => Err(CodeBlockError::Structural {
            shape: other.shape(),
        }),
    }
}

fn analyze_assignment(assignment: &Assignment) -> Result<Statement, CodeBlockError> {
    // a = b = rhs: every target is defined, rhs is what remains
    let mut defined = Vec::new();
    let mut current = assignment;
    let rhs = loop {
        define(&mut defined, &current.target);
        match current.value.as_ref() {
            Node::Assignment(inner) => current = inner,
            rhs => break rhs,
        }
    };

    let kind = classify(&defined[0], rhs);
    let mut referenced = Vec::new();
    collect_references(rhs, 1, &mut referenced)?;

    let mut statement = Statement {
        kind,
        start_line: assignment.start_line,
        end_line: assignment.end_line,
        defined_variables: defined,
        referenced_variables: referenced,
        sub_statements: Vec::new(),
    };
    correct_columns(&mut statement);
    Ok(statement)
}

fn analyze_function(function: &FunctionDef, depth: usize) -> Result<Statement, CodeBlockError> {
    let sub_statements = function
        .body
        .iter()
        .map(|node| analyze_at(node, depth + 1))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Statement {
        kind: StatementKind::FuncDeclaration,
        start_line: function.start_line,
        end_line: function.body_end_line.unwrap_or(function.end_line),
        defined_variables: Vec::new(),
        referenced_variables: Vec::new(),
        sub_statements,
    })
}

fn define(defined: &mut Vec<VariableRef>, target: &Identifier) {
    if defined.iter().any(|v| v.name() == target.name) {
        return;
    }
    let variable = if is_synthetic_temporary(&target.name) {
        VariableRef::synthetic(target.name.clone(), target.line)
    } else {
        VariableRef::from_identifier(target)
    };
    defined.push(variable);
}

fn classify(first: &VariableRef, rhs: &Node) -> StatementKind {
    if !is_synthetic_temporary(first.name()) {
        return StatementKind::Expression;
    }
    match rhs {
        Node::Identifier(_) => StatementKind::AssignmentVar,
        Node::List(_) => StatementKind::Collection,
        Node::Number(_) | Node::String(_) => StatementKind::Literal,
        _ => StatementKind::None,
    }
}

/// Expressions from the parser are at most [`MAX_PARSE_DEPTH`] deep; deeper
/// hand-built trees are rejected rather than walked.
fn collect_references(node: &Node, depth: usize, referenced: &mut Vec<VariableRef>) -> Result<(), CodeBlockError> {
    if depth > MAX_PARSE_DEPTH {
        return Err(CodeBlockError::TooDeep {
            limit: MAX_PARSE_DEPTH,
        });
    }
    let depth = depth + 1;
    match node {
        Node::Number(_) | Node::String(_) | Node::Boolean(_) | Node::Null => {}
        Node::Identifier(identifier) => {
            referenced.push(VariableRef::from_identifier(identifier));
            if let Some(index) = &identifier.index {
                collect_references(index, depth, referenced)?;
            }
        }
        Node::List(items) => {
            for item in items {
                collect_references(item, depth, referenced)?;
            }
        }
        Node::Index { base, index } => {
            collect_references(base, depth, referenced)?;
            collect_references(index, depth, referenced)?;
        }
        Node::Call { args, .. } => {
            for arg in args {
                collect_references(arg, depth, referenced)?;
            }
        }
        // the target of a dotted call is not visited
        Node::DotCall { call, .. } => collect_references(call, depth, referenced)?,
        Node::Conditional {
            condition,
            true_branch,
            false_branch,
        } => {
            collect_references(condition, depth, referenced)?;
            collect_references(true_branch, depth, referenced)?;
            collect_references(false_branch, depth, referenced)?;
        }
        Node::Range { start, end, step } => {
            collect_references(start, depth, referenced)?;
            collect_references(end, depth, referenced)?;
            if let Some(step) = step {
                collect_references(step, depth, referenced)?;
            }
        }
        Node::Assignment(assignment) => collect_references(&assignment.value, depth, referenced)?,
        Node::FunctionDef(_) => {}
    }
    Ok(())
}

/// Undo the column shift the parser's `temp… = ` insertion put on the
/// statement's first line.
fn correct_columns(statement: &mut Statement) {
    if statement.kind == StatementKind::Expression {
        return;
    }
    let line = statement.start_line;
    for variable in &mut statement.referenced_variables {
        if variable.row() == line {
            *variable = variable.shifted_back(SYNTHETIC_PREFIX_WIDTH);
        }
    }
}
